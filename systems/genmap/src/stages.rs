//! Map transformations performed by the individual generation stages.
//!
//! Stages that read the ground layer while rewriting it (seeding excepted)
//! build a complete replacement [`Grid`] and swap it in, so every cell of a
//! pass sees the previous generation. Decoration stages write in place: later
//! cells of a pass are meant to see features placed earlier in the same pass.

use castaway_core::{CellCoord, FlipAxis, Layer, Tile};
use castaway_world::{query, Grid, Map};
use rand::Rng;

use crate::{
    catalog::{self, DEEP_WATER, FLOOR, FLOOR_TILE, VARIANTS, WATER_TILE},
    edges, GenerationTuning,
};

/// Land neighbours above which a cell becomes land; below it, water.
const SMOOTHING_PIVOT: u32 = 4;
/// Flowers of the first variant needed around a gravestone.
const GRAVESTONE_FLOWERS: usize = 2;
/// Flowers of the second variant needed around a gravestone.
const GRAVESTONE_ALT_FLOWERS: usize = 3;

/// Fills the ground with random land and water and clears the decorations.
///
/// Draws one `f64` per cell in row-major order.
pub fn seed_terrain<R>(map: &mut Map, land_probability: f64, rng: &mut R)
where
    R: Rng + ?Sized,
{
    let (width, height) = (map.width(), map.height());
    for y in 0..height {
        for x in 0..width {
            let tile = if rng.gen::<f64>() < land_probability {
                FLOOR_TILE
            } else {
                WATER_TILE
            };
            map.set_tile(Layer::Ground, x, y, tile);
        }
    }
    let _ = map.replace_layer(Layer::Decoration, Grid::new(width, height));
}

/// Runs one cellular-automaton pass over the ground.
///
/// Cells within `border_width` of any edge become water. Elsewhere a cell
/// with more than four land neighbours becomes land, fewer than four becomes
/// water, and exactly four keeps its value. Neighbours beyond the map edge are
/// not counted.
pub fn smooth_terrain(map: &mut Map, border_width: u32) {
    let ground = map.layer(Layer::Ground);
    let (width, height) = (ground.width(), ground.height());
    let mut next = Grid::new(width, height);

    for (cell, tile) in ground.cells() {
        let (x, y) = (cell.column(), cell.row());
        let in_border = x < border_width
            || y < border_width
            || x >= width.saturating_sub(border_width)
            || y >= height.saturating_sub(border_width);
        let land = edges::neighbor_mask(ground, x, y).count_ones();

        let smoothed = if in_border || land < SMOOTHING_PIVOT {
            WATER_TILE
        } else if land > SMOOTHING_PIVOT {
            FLOOR_TILE
        } else {
            tile
        };
        next.set(x, y, smoothed);
    }

    let _ = map.replace_layer(Layer::Ground, next);
}

/// Replaces water cells with the shoreline tile matching their land mask and
/// land cells with floor.
pub fn apply_edges(map: &mut Map) {
    let ground = map.layer(Layer::Ground);
    let mut next = Grid::new(ground.width(), ground.height());

    for (cell, tile) in ground.cells() {
        let (x, y) = (cell.column(), cell.row());
        let shaped = if catalog::is_land(tile) {
            FLOOR_TILE
        } else {
            catalog::shore_tile(edges::classify(edges::neighbor_mask(ground, x, y)))
        };
        next.set(x, y, shaped);
    }

    let _ = map.replace_layer(Layer::Ground, next);
}

/// Trees owed to a map with `floor_cells` open floor cells.
#[must_use]
pub fn tree_target(floor_cells: usize, density: f64) -> u32 {
    (floor_cells as f64 * density).max(0.0).floor() as u32
}

/// Trees planted in one step while `remaining` are still owed.
///
/// Always at least one and never more than `remaining`, so planting finishes.
#[must_use]
pub fn tree_batch(remaining: u32, density: f64) -> u32 {
    if remaining == 0 {
        return 0;
    }
    let batch = (f64::from(remaining) * density).ceil();
    (batch.max(0.0) as u32).clamp(1, remaining)
}

/// Outcome of a planting step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Planting {
    /// Trees actually placed.
    pub planted: u32,
    /// Whether sampling ran out of attempts before every tree found a spot.
    pub exhausted: bool,
}

/// Plants up to `count` two-cell trees at random spots.
///
/// A spot is valid when its ground is floor, it is not on the top row, and
/// both it and the cell above carry no decoration. Each tree gets at most
/// `attempts` random draws; the first tree that finds no spot ends the step.
pub fn plant_trees<R>(map: &mut Map, count: u32, attempts: u32, rng: &mut R) -> Planting
where
    R: Rng + ?Sized,
{
    let mut planted = 0;
    for _ in 0..count {
        let Some(spot) = find_tree_spot(map, attempts, rng) else {
            return Planting {
                planted,
                exhausted: true,
            };
        };

        let variant = rng.gen_range(0..VARIANTS);
        let (x, y) = (spot.column(), spot.row());
        map.set_tile(Layer::Decoration, x, y, catalog::tree_trunk(variant));
        map.set_tile(Layer::Decoration, x, y - 1, catalog::tree_canopy(variant));
        planted += 1;
    }

    Planting {
        planted,
        exhausted: false,
    }
}

fn find_tree_spot<R>(map: &Map, attempts: u32, rng: &mut R) -> Option<CellCoord>
where
    R: Rng + ?Sized,
{
    if map.width() == 0 || map.height() == 0 {
        return None;
    }

    (0..attempts)
        .map(|_| (rng.gen_range(0..map.width()), rng.gen_range(0..map.height())))
        .find(|&(x, y)| {
            y >= 1
                && map.tile_at(Layer::Ground, x, y).shows(FLOOR)
                && map.tile_at(Layer::Decoration, x, y).is_empty()
                && map.tile_at(Layer::Decoration, x, y - 1).is_empty()
        })
        .map(|(x, y)| CellCoord::new(x, y))
}

/// Runs one pass of flower, gravestone and rock scattering, returning how
/// many decorations were placed.
///
/// Only cells without decoration are visited. Floor may grow a flower or,
/// among enough flowers, a gravestone that never touches a gravestone of the
/// other variant. Deep water may grow a lone rock or, next to a lone rock, a
/// rock cluster. Every placed tile is mirrored horizontally half the time.
pub fn scatter_features<R>(map: &mut Map, tuning: &GenerationTuning, rng: &mut R) -> u32
where
    R: Rng + ?Sized,
{
    let mut placed = 0;
    for y in 0..map.height() {
        for x in 0..map.width() {
            if !map.tile_at(Layer::Decoration, x, y).is_empty() {
                continue;
            }

            let ground = map.tile_at(Layer::Ground, x, y);
            let feature = if ground.shows(FLOOR) {
                floor_feature(map, x, y, tuning, rng)
            } else if ground.shows(DEEP_WATER) {
                water_feature(map, x, y, tuning, rng)
            } else {
                None
            };

            if let Some(tile) = feature {
                let tile = if rng.gen::<bool>() {
                    tile.with_flip(FlipAxis::Horizontal)
                } else {
                    tile
                };
                map.set_tile(Layer::Decoration, x, y, tile);
                placed += 1;
            }
        }
    }
    placed
}

fn floor_feature<R>(map: &Map, x: u32, y: u32, tuning: &GenerationTuning, rng: &mut R) -> Option<Tile>
where
    R: Rng + ?Sized,
{
    let variant = rng.gen_range(0..VARIANTS);
    if rng.gen::<f64>() < tuning.flower_rate {
        return Some(catalog::flower(variant));
    }

    let among_flowers = || {
        neighbors_showing(map, x, y, catalog::flower(0)) > GRAVESTONE_FLOWERS
            || neighbors_showing(map, x, y, catalog::flower(1)) > GRAVESTONE_ALT_FLOWERS
    };
    if rng.gen::<f64>() < tuning.gravestone_rate && among_flowers() {
        let rival = catalog::gravestone(VARIANTS - 1 - variant);
        return (neighbors_showing(map, x, y, rival) == 0).then(|| catalog::gravestone(variant));
    }

    None
}

fn water_feature<R>(map: &Map, x: u32, y: u32, tuning: &GenerationTuning, rng: &mut R) -> Option<Tile>
where
    R: Rng + ?Sized,
{
    let variant = rng.gen_range(0..VARIANTS);
    if rng.gen::<f64>() < tuning.single_rock_rate {
        return Some(catalog::single_rock(variant));
    }

    let near_rock = || {
        (0..VARIANTS).any(|other| neighbors_showing(map, x, y, catalog::single_rock(other)) > 0)
    };
    if rng.gen::<f64>() < tuning.rock_cluster_rate && near_rock() {
        return Some(catalog::rock_cluster(variant));
    }

    None
}

fn neighbors_showing(map: &Map, x: u32, y: u32, tile: Tile) -> usize {
    query::matching_neighbors(map, Layer::Decoration, x, y, tile)
}

/// Cells a spawner may occupy: floor without decoration.
#[must_use]
pub fn spawner_candidates(map: &Map) -> Vec<CellCoord> {
    query::open_cells(map, FLOOR)
}
