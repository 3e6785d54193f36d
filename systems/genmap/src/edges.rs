//! Shoreline classification.
//!
//! Every water cell is described by an 8-bit mask of its land neighbours, bit
//! `i` standing for [`castaway_world::NEIGHBOR_OFFSETS`]`[i]`:
//!
//! ```text
//!   0 1 2
//!   3 . 4
//!   5 6 7
//! ```
//!
//! Neighbours beyond the map edge are never land. A rule matches a mask when
//! every `must` bit is set and no bit outside `allowed` is set. Rules are tried
//! in table order and the first match wins; a mask with no land around it is
//! deep water.

use castaway_core::Sprite;
use castaway_world::Grid;

use crate::catalog::{self, DEEP_WATER};

/// One `(must, allowed) -> sprite` shoreline rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeRule {
    /// Bits that have to be set.
    pub must: u8,
    /// Bits that may be set.
    pub allowed: u8,
    /// Tile drawn when the rule matches.
    pub sprite: Sprite,
}

impl EdgeRule {
    const fn new(must: u8, allowed: u8, x: u8, y: u8) -> Self {
        Self {
            must,
            allowed,
            sprite: Sprite::new(x, y),
        }
    }

    /// Reports whether `mask` satisfies the rule.
    #[must_use]
    pub const fn matches(&self, mask: u8) -> bool {
        mask & self.must == self.must && mask & !self.allowed == 0
    }
}

/// Shoreline rules in evaluation order.
pub const EDGE_RULES: [EdgeRule; 46] = [
    // sides
    EdgeRule::new(0x02, 0x07, 9, 0),
    EdgeRule::new(0x10, 0x94, 10, 1),
    EdgeRule::new(0x40, 0xE0, 9, 2),
    EdgeRule::new(0x08, 0x29, 8, 1),
    // opposite sides
    EdgeRule::new(0x42, 0xE7, 4, 4),
    EdgeRule::new(0x18, 0xBD, 5, 4),
    // all sides
    EdgeRule::new(0x5A, 0xFF, 6, 4),
    // three sides
    EdgeRule::new(0x1A, 0xBF, 6, 0),
    EdgeRule::new(0x58, 0xFD, 7, 0),
    EdgeRule::new(0x4A, 0xEF, 6, 1),
    EdgeRule::new(0x52, 0xF7, 7, 1),
    // side with the far corner
    EdgeRule::new(0x22, 0x27, 0, 1),
    EdgeRule::new(0x82, 0x87, 1, 1),
    EdgeRule::new(0x41, 0xE1, 0, 0),
    EdgeRule::new(0x44, 0xE4, 1, 0),
    EdgeRule::new(0x0C, 0x2D, 3, 1),
    EdgeRule::new(0x88, 0xA9, 3, 0),
    EdgeRule::new(0x11, 0x95, 2, 1),
    EdgeRule::new(0x30, 0xB4, 2, 0),
    // side with both far corners
    EdgeRule::new(0xA2, 0xA7, 5, 3),
    EdgeRule::new(0x31, 0xB5, 4, 2),
    EdgeRule::new(0x45, 0xE5, 4, 3),
    EdgeRule::new(0x8C, 0xAD, 5, 2),
    // two adjacent sides
    EdgeRule::new(0x0A, 0x2F, 8, 0),
    EdgeRule::new(0x12, 0x97, 10, 0),
    EdgeRule::new(0x50, 0xF4, 10, 2),
    EdgeRule::new(0x48, 0xE9, 8, 2),
    // two adjacent sides with the opposite corner
    EdgeRule::new(0x8A, 0xAF, 6, 2),
    EdgeRule::new(0x32, 0xB7, 7, 2),
    EdgeRule::new(0x51, 0xF5, 7, 3),
    EdgeRule::new(0x4C, 0xED, 6, 3),
    // single corner
    EdgeRule::new(0x80, 0x80, 8, 3),
    EdgeRule::new(0x20, 0x20, 9, 3),
    EdgeRule::new(0x04, 0x04, 8, 4),
    EdgeRule::new(0x01, 0x01, 9, 4),
    // two corners on one side
    EdgeRule::new(0x84, 0x84, 3, 3),
    EdgeRule::new(0x21, 0x21, 2, 3),
    EdgeRule::new(0x05, 0x05, 3, 4),
    EdgeRule::new(0xA0, 0xA0, 2, 4),
    // opposite corners
    EdgeRule::new(0x81, 0x81, 3, 2),
    EdgeRule::new(0x24, 0x24, 2, 2),
    // three corners
    EdgeRule::new(0x85, 0x85, 5, 0),
    EdgeRule::new(0x25, 0x25, 4, 0),
    EdgeRule::new(0xA4, 0xA4, 5, 1),
    EdgeRule::new(0xA1, 0xA1, 4, 1),
    // four corners
    EdgeRule::new(0xA5, 0xA5, 7, 4),
];

/// Shoreline sprite for a water cell with the provided land mask.
#[must_use]
pub fn classify(mask: u8) -> Sprite {
    EDGE_RULES
        .iter()
        .find(|rule| rule.matches(mask))
        .map_or(DEEP_WATER, |rule| rule.sprite)
}

/// Land mask of the cell at `(x, y)`.
#[must_use]
pub fn neighbor_mask(grid: &Grid, x: u32, y: u32) -> u8 {
    grid.neighbors(x, y)
        .filter(|(_, tile)| catalog::is_land(*tile))
        .fold(0, |mask, (bit, _)| mask | 1 << bit)
}
