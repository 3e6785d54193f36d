use castaway_core::{Layer, Tile};
use castaway_system_genmap::catalog::{self, VARIANTS};
use castaway_world::{query, Map};

/// Renders a down-sampled character picture of `map` at most `max_columns` wide.
///
/// Terminal cells are about twice as tall as they are wide, so rows are
/// sampled at twice the column stride.
pub(crate) fn render(map: &Map, max_columns: u32) -> String {
    let stride = map.width().div_ceil(max_columns.max(1)).max(1);
    let mut picture = String::new();

    for y in (0..map.height()).step_by(stride as usize * 2) {
        for x in (0..map.width()).step_by(stride as usize) {
            picture.push(glyph(map, x, y));
        }
        picture.push('\n');
    }
    picture
}

/// Share of ground cells that are land.
pub(crate) fn land_ratio(map: &Map) -> f64 {
    let cells = u64::from(map.width()) * u64::from(map.height());
    if cells == 0 {
        return 0.0;
    }
    query::count_showing(map, Layer::Ground, catalog::FLOOR) as f64 / cells as f64
}

fn glyph(map: &Map, x: u32, y: u32) -> char {
    let decoration = map.tile_at(Layer::Decoration, x, y);
    if !decoration.is_empty() {
        return decoration_glyph(decoration);
    }

    let ground = map.tile_at(Layer::Ground, x, y);
    if ground.is_empty() {
        ' '
    } else if catalog::is_land(ground) {
        '.'
    } else if ground.shows(catalog::DEEP_WATER) {
        '~'
    } else {
        ','
    }
}

fn decoration_glyph(tile: Tile) -> char {
    let is_any = |make: fn(u8) -> Tile| (0..VARIANTS).any(|variant| tile.same_sprite(make(variant)));
    if is_any(catalog::tree_trunk) || is_any(catalog::tree_canopy) {
        'T'
    } else if is_any(catalog::flower) {
        '*'
    } else if is_any(catalog::gravestone) {
        '+'
    } else {
        '^'
    }
}
