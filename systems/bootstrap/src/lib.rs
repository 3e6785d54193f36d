#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure bootstrap system that prepares a new Castaway island.

use castaway_core::{CellCoord, Layer, Sprite, WELCOME_BANNER};
use castaway_world::Map;
use rand::Rng;

/// Cells along the shorter screen axis of a freshly generated map.
pub const MAP_BASE_SIZE: u32 = 300;

/// Random draws spent looking for a start cell before scanning the map.
const START_ATTEMPTS: usize = 1_024;

/// Produces the values needed before the first generation step.
#[derive(Debug, Default)]
pub struct Bootstrap;

impl Bootstrap {
    /// Banner shown when the experience starts.
    #[must_use]
    pub fn welcome_banner(&self) -> &'static str {
        WELCOME_BANNER
    }

    /// Map size for a screen of the provided size.
    ///
    /// The shorter screen axis maps to [`MAP_BASE_SIZE`] cells and the longer
    /// one keeps the screen's aspect ratio, rounded down. Zero-sized screens
    /// are treated as one pixel wide.
    #[must_use]
    pub fn map_dimensions(&self, screen_width: u32, screen_height: u32) -> (u32, u32) {
        let width = screen_width.max(1);
        let height = screen_height.max(1);
        if width < height {
            let scaled = f64::from(height) / f64::from(width) * f64::from(MAP_BASE_SIZE);
            (MAP_BASE_SIZE, scaled as u32)
        } else {
            let scaled = f64::from(width) / f64::from(height) * f64::from(MAP_BASE_SIZE);
            (scaled as u32, MAP_BASE_SIZE)
        }
    }

    /// Picks the cell the player starts on: ground showing `floor` that
    /// nothing blocks.
    ///
    /// Random cells are tried first so the start varies between islands; when
    /// they all miss, the first suitable cell in row-major order is used.
    /// Returns `None` when the map has no such cell.
    pub fn player_start<R>(&self, map: &Map, floor: Sprite, rng: &mut R) -> Option<CellCoord>
    where
        R: Rng + ?Sized,
    {
        let walkable = |x: u32, y: u32| {
            map.tile_at(Layer::Ground, x, y).shows(floor)
                && !map.collides_at(i64::from(x), i64::from(y))
        };

        if map.width() > 0 && map.height() > 0 {
            for _ in 0..START_ATTEMPTS {
                let x = rng.gen_range(0..map.width());
                let y = rng.gen_range(0..map.height());
                if walkable(x, y) {
                    return Some(CellCoord::new(x, y));
                }
            }
        }

        map.layer(Layer::Ground)
            .cells()
            .map(|(cell, _)| cell)
            .find(|cell| walkable(cell.column(), cell.row()))
    }
}
