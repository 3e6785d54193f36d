//! Atlas positions of every tile the generator places.
//!
//! Ground tiles: deep water, the shoreline set in [`crate::edges`], and floor.
//! Decorations come in two variants (`0` or `1`) that differ only in art.

use castaway_core::{Rotation, Sprite, Tile};

/// Walkable island surface.
pub const FLOOR: Sprite = Sprite::new(11, 2);
/// Open water with no land next to it.
pub const DEEP_WATER: Sprite = Sprite::new(9, 1);

/// Ground tile for land.
pub const FLOOR_TILE: Tile = Tile::from_sprite(11, 2);
/// Ground tile for water. Entities cannot swim.
pub const WATER_TILE: Tile = Tile::from_sprite(9, 1).with_collision();

/// Number of art variants for each decoration.
pub const VARIANTS: u8 = 2;

/// Shoreline tile showing `sprite`.
#[must_use]
pub const fn shore_tile(sprite: Sprite) -> Tile {
    Tile::new(sprite, Rotation::Deg0).with_collision()
}

/// Lower half of a tree, standing on the planted cell.
#[must_use]
pub const fn tree_trunk(variant: u8) -> Tile {
    Tile::from_sprite(variant, 4).with_collision()
}

/// Upper half of a tree, drawn one cell above the trunk. Entities walk behind it.
#[must_use]
pub const fn tree_canopy(variant: u8) -> Tile {
    Tile::from_sprite(variant, 3)
}

/// Flower tile.
#[must_use]
pub const fn flower(variant: u8) -> Tile {
    Tile::from_sprite(11, variant)
}

/// Gravestone tile.
#[must_use]
pub const fn gravestone(variant: u8) -> Tile {
    Tile::from_sprite(variant, 2).with_collision()
}

/// Rock standing alone in deep water.
#[must_use]
pub const fn single_rock(variant: u8) -> Tile {
    Tile::from_sprite(10 + variant, 3 + variant).with_collision()
}

/// Rock cluster that grows next to lone rocks.
#[must_use]
pub const fn rock_cluster(variant: u8) -> Tile {
    Tile::from_sprite(11 - variant, 3 + variant).with_collision()
}

/// Reports whether a ground tile counts as land.
#[must_use]
pub const fn is_land(tile: Tile) -> bool {
    tile.shows(FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorations_do_not_collide_with_each_other() {
        let mut sprites = Vec::new();
        for variant in 0..VARIANTS {
            for tile in [
                tree_trunk(variant),
                tree_canopy(variant),
                flower(variant),
                gravestone(variant),
                single_rock(variant),
                rock_cluster(variant),
            ] {
                sprites.push(tile.sprite());
            }
        }
        let total = sprites.len();
        sprites.sort();
        sprites.dedup();
        assert_eq!(sprites.len(), total);
    }

    #[test]
    fn only_flowers_canopies_and_floor_are_walkable() {
        assert!(!FLOOR_TILE.is_collidable());
        assert!(WATER_TILE.is_collidable());
        for variant in 0..VARIANTS {
            assert!(!flower(variant).is_collidable());
            assert!(!tree_canopy(variant).is_collidable());
            assert!(tree_trunk(variant).is_collidable());
            assert!(gravestone(variant).is_collidable());
            assert!(single_rock(variant).is_collidable());
            assert!(rock_cluster(variant).is_collidable());
        }
    }

    #[test]
    fn land_test_ignores_flags() {
        assert!(is_land(FLOOR_TILE));
        assert!(is_land(FLOOR_TILE.with_collision()));
        assert!(!is_land(WATER_TILE));
        assert!(!is_land(Tile::EMPTY));
    }
}
