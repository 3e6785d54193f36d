#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative map state for Castaway.
//!
//! A [`Map`] is two stacked [`Grid`] planes of equal size. Generation stages
//! never edit the plane they are reading: they build a complete replacement
//! [`Grid`] and hand it to [`Map::replace_layer`], which swaps it in whole.

pub mod persist;

use castaway_core::{CellCoord, Layer, Tile, LAYER_COUNT};

/// Offsets of the eight neighbours of a cell, in bitmask order.
///
/// Index `i` of this table corresponds to bit `i` of a neighbour mask:
/// north-west, north, north-east, west, east, south-west, south, south-east.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// A single width × height plane of tiles stored row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Creates a plane filled with empty tiles.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Tile::EMPTY)
    }

    /// Creates a plane where every cell holds `tile`.
    #[must_use]
    pub fn filled(width: u32, height: u32, tile: Tile) -> Self {
        let capacity = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(usize::MAX);
        Self {
            width,
            height,
            tiles: vec![tile; capacity],
        }
    }

    /// Wraps row-major tiles, returning `None` when the length does not match.
    #[must_use]
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Option<Self> {
        let expected = u64::from(width) * u64::from(height);
        (tiles.len() as u64 == expected).then_some(Self {
            width,
            height,
            tiles,
        })
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Tile at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics when the coordinate lies outside the plane; callers guard first.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Tile {
        self.tiles[self.index(x, y)]
    }

    /// Overwrites the tile at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics when the coordinate lies outside the plane; callers guard first.
    pub fn set(&mut self, x: u32, y: u32, tile: Tile) {
        let index = self.index(x, y);
        self.tiles[index] = tile;
    }

    /// Tile at a signed coordinate, or `None` outside the plane.
    #[must_use]
    pub fn get_checked(&self, x: i64, y: i64) -> Option<Tile> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        (x < self.width && y < self.height).then(|| self.get(x, y))
    }

    /// In-bounds neighbours of `(x, y)` as `(bit, tile)` pairs in [`NEIGHBOR_OFFSETS`] order.
    ///
    /// Cells beyond the edge are skipped rather than reported, so no wraparound
    /// and no implicit land or water is ever introduced.
    pub fn neighbors(&self, x: u32, y: u32) -> impl Iterator<Item = (usize, Tile)> + '_ {
        NEIGHBOR_OFFSETS
            .iter()
            .enumerate()
            .filter_map(move |(bit, (dx, dy))| {
                self.get_checked(i64::from(x) + i64::from(*dx), i64::from(y) + i64::from(*dy))
                    .map(|tile| (bit, tile))
            })
    }

    /// Row-major tile storage.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Iterator over rows, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        // `max(1)` keeps `chunks` valid for zero-width planes, which hold no tiles anyway.
        self.tiles.chunks(self.width.max(1) as usize)
    }

    /// Iterator over every cell coordinate with its tile, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, Tile)> + '_ {
        let width = self.width.max(1);
        self.tiles.iter().enumerate().map(move |(index, tile)| {
            let index = index as u32;
            (CellCoord::new(index % width, index / width), *tile)
        })
    }

    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "cell ({x}, {y}) outside {}x{} grid",
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }
}

/// Two-layer tile map with fixed dimensions.
///
/// The map owns its storage; dropping it releases both layers exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Map {
    width: u32,
    height: u32,
    layers: [Grid; LAYER_COUNT],
}

impl Map {
    /// Allocates a map whose layers are filled with empty tiles.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: [Grid::new(width, height), Grid::new(width, height)],
        }
    }

    /// Assembles a map from existing planes, returning `None` if their sizes differ.
    #[must_use]
    pub fn from_layers(ground: Grid, decoration: Grid) -> Option<Self> {
        if ground.width() != decoration.width() || ground.height() != decoration.height() {
            return None;
        }

        Some(Self {
            width: ground.width(),
            height: ground.height(),
            layers: [ground, decoration],
        })
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Read access to a whole plane.
    #[must_use]
    pub fn layer(&self, layer: Layer) -> &Grid {
        &self.layers[layer.index()]
    }

    /// Tile at `(x, y)` on `layer`. The coordinate must lie inside the map.
    #[must_use]
    pub fn tile_at(&self, layer: Layer, x: u32, y: u32) -> Tile {
        self.layer(layer).get(x, y)
    }

    /// Writes a single tile on `layer`. The coordinate must lie inside the map.
    pub fn set_tile(&mut self, layer: Layer, x: u32, y: u32, tile: Tile) {
        self.layers[layer.index()].set(x, y, tile);
    }

    /// Substitutes a complete plane, returning the one it replaced.
    ///
    /// # Panics
    ///
    /// Panics when `grid` does not match the map dimensions.
    pub fn replace_layer(&mut self, layer: Layer, grid: Grid) -> Grid {
        assert!(
            grid.width() == self.width && grid.height() == self.height,
            "replacement {}x{} plane does not fit {}x{} map",
            grid.width(),
            grid.height(),
            self.width,
            self.height
        );
        std::mem::replace(&mut self.layers[layer.index()], grid)
    }

    /// Bounds-checked collision query on one layer.
    ///
    /// Coordinates outside the map always collide so entities stay inside it.
    #[must_use]
    pub fn collidable_at(&self, layer: Layer, x: i64, y: i64) -> bool {
        self.layer(layer)
            .get_checked(x, y)
            .map_or(true, Tile::is_collidable)
    }

    /// Reports whether any layer blocks movement into `(x, y)`.
    #[must_use]
    pub fn collides_at(&self, x: i64, y: i64) -> bool {
        Layer::ALL
            .iter()
            .any(|layer| self.collidable_at(*layer, x, y))
    }
}

/// Query functions that provide read-only summaries of a map.
pub mod query {
    use castaway_core::{CellCoord, Layer, Sprite, Tile};

    use super::Map;

    /// Number of cells on `layer` showing `sprite`, whatever their orientation.
    #[must_use]
    pub fn count_showing(map: &Map, layer: Layer, sprite: Sprite) -> usize {
        map.layer(layer)
            .tiles()
            .iter()
            .filter(|tile| tile.shows(sprite))
            .count()
    }

    /// Cells whose ground shows `sprite` and whose decoration is empty.
    #[must_use]
    pub fn open_cells(map: &Map, ground: Sprite) -> Vec<CellCoord> {
        map.layer(Layer::Ground)
            .cells()
            .filter(|(cell, tile)| {
                tile.shows(ground)
                    && map
                        .tile_at(Layer::Decoration, cell.column(), cell.row())
                        .is_empty()
            })
            .map(|(cell, _)| cell)
            .collect()
    }

    /// Number of neighbours of `(x, y)` on `layer` whose sprite matches `tile`.
    #[must_use]
    pub fn matching_neighbors(map: &Map, layer: Layer, x: u32, y: u32, tile: Tile) -> usize {
        map.layer(layer)
            .neighbors(x, y)
            .filter(|(_, neighbor)| neighbor.same_sprite(tile))
            .count()
    }
}
