//! Packed tile codec shared by the map model, the generator and the save file.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PRESENT_BIT: u32 = 1 << 31;
const FLIP_VERTICAL_BIT: u32 = 1 << 30;
const FLIP_HORIZONTAL_BIT: u32 = 1 << 29;
const COLLIDABLE_BIT: u32 = 1 << 28;
const ROTATION_SHIFT: u32 = 26;
const ROTATION_MASK: u32 = 0b11;
const SPRITE_Y_SHIFT: u32 = 8;
const SPRITE_MASK: u32 = 0xFF;
const RESERVED_MASK: u32 = 0x03FF_0000;

/// Location of a sprite inside the tileset atlas, measured in atlas cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sprite {
    x: u8,
    y: u8,
}

impl Sprite {
    /// Creates a sprite reference from atlas column and row.
    #[must_use]
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Atlas column of the sprite.
    #[must_use]
    pub const fn x(&self) -> u8 {
        self.x
    }

    /// Atlas row of the sprite.
    #[must_use]
    pub const fn y(&self) -> u8 {
        self.y
    }
}

/// Clockwise rotation applied to a sprite when it is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    /// Sprite drawn as authored.
    #[default]
    Deg0,
    /// Quarter turn clockwise.
    Deg90,
    /// Half turn.
    Deg180,
    /// Three quarter turns clockwise.
    Deg270,
}

impl Rotation {
    /// Rotation angle in degrees.
    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// Resolves a rotation from an angle in degrees, if it is a multiple of 90.
    #[must_use]
    pub const fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees % 360 {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    const fn quarter_turns(self) -> u32 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }

    const fn from_quarter_turns(turns: u32) -> Self {
        match turns & ROTATION_MASK {
            0 => Self::Deg0,
            1 => Self::Deg90,
            2 => Self::Deg180,
            _ => Self::Deg270,
        }
    }
}

/// Axis along which a sprite may be mirrored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlipAxis {
    /// Mirror left to right.
    Horizontal,
    /// Mirror top to bottom.
    Vertical,
}

impl FlipAxis {
    const fn bit(self) -> u32 {
        match self {
            Self::Horizontal => FLIP_HORIZONTAL_BIT,
            Self::Vertical => FLIP_VERTICAL_BIT,
        }
    }
}

/// A single map cell packed into 32 bits.
///
/// Layout, most significant bit first: present (31), vertical flip (30),
/// horizontal flip (29), collidable (28), quarter-turn rotation (26..=27),
/// reserved (16..=25, always zero), sprite row (8..=15), sprite column (0..=7).
/// An empty tile is always the all-zero word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub struct Tile(u32);

impl Tile {
    /// Cell with no sprite.
    pub const EMPTY: Tile = Tile(0);

    /// Creates a non-empty tile showing `sprite` with the provided rotation.
    #[must_use]
    pub const fn new(sprite: Sprite, rotation: Rotation) -> Self {
        Self(
            PRESENT_BIT
                | rotation.quarter_turns() << ROTATION_SHIFT
                | (sprite.y as u32) << SPRITE_Y_SHIFT
                | sprite.x as u32,
        )
    }

    /// Creates an unrotated tile from atlas coordinates.
    #[must_use]
    pub const fn from_sprite(x: u8, y: u8) -> Self {
        Self::new(Sprite::new(x, y), Rotation::Deg0)
    }

    /// Reports whether the cell carries no sprite.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 & PRESENT_BIT == 0
    }

    /// Atlas sprite shown by the tile, absent for empty tiles.
    #[must_use]
    pub const fn sprite(self) -> Option<Sprite> {
        if self.is_empty() {
            None
        } else {
            Some(Sprite::new(
                (self.0 & SPRITE_MASK) as u8,
                ((self.0 >> SPRITE_Y_SHIFT) & SPRITE_MASK) as u8,
            ))
        }
    }

    /// Rotation applied when drawing the tile.
    #[must_use]
    pub const fn rotation(self) -> Rotation {
        Rotation::from_quarter_turns(self.0 >> ROTATION_SHIFT)
    }

    /// Reports whether the tile is mirrored along `axis`.
    #[must_use]
    pub const fn is_flipped(self, axis: FlipAxis) -> bool {
        self.0 & axis.bit() != 0
    }

    /// Reports whether entities are blocked by this tile.
    #[must_use]
    pub const fn is_collidable(self) -> bool {
        self.0 & COLLIDABLE_BIT != 0
    }

    /// Returns a copy mirrored along `axis`. Empty tiles stay empty.
    #[must_use]
    pub const fn with_flip(self, axis: FlipAxis) -> Self {
        if self.is_empty() {
            self
        } else {
            Self(self.0 | axis.bit())
        }
    }

    /// Returns a copy that blocks entity movement. Empty tiles stay empty.
    #[must_use]
    pub const fn with_collision(self) -> Self {
        if self.is_empty() {
            self
        } else {
            Self(self.0 | COLLIDABLE_BIT)
        }
    }

    /// Returns a copy drawn with a different rotation.
    #[must_use]
    pub const fn with_rotation(self, rotation: Rotation) -> Self {
        if self.is_empty() {
            self
        } else {
            Self((self.0 & !(ROTATION_MASK << ROTATION_SHIFT)) | rotation.quarter_turns() << ROTATION_SHIFT)
        }
    }

    /// Compares terrain identity only: rotation, flips and collision are ignored.
    ///
    /// Two empty tiles match each other; an empty tile never matches a
    /// non-empty one.
    #[must_use]
    pub const fn same_sprite(self, other: Tile) -> bool {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => true,
            (false, false) => {
                self.0 & (SPRITE_MASK | SPRITE_MASK << SPRITE_Y_SHIFT)
                    == other.0 & (SPRITE_MASK | SPRITE_MASK << SPRITE_Y_SHIFT)
            }
            _ => false,
        }
    }

    /// Reports whether the tile shows `sprite`, regardless of orientation.
    #[must_use]
    pub const fn shows(self, sprite: Sprite) -> bool {
        self.same_sprite(Self::new(sprite, Rotation::Deg0))
    }

    /// Raw on-disk encoding.
    #[must_use]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Decodes a raw word, rejecting reserved bits and non-canonical empty words.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Option<Self> {
        if bits & PRESENT_BIT == 0 {
            if bits == 0 {
                Some(Self::EMPTY)
            } else {
                None
            }
        } else if bits & RESERVED_MASK != 0 {
            None
        } else {
            Some(Self(bits))
        }
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sprite() {
            None => write!(f, "Tile::EMPTY"),
            Some(sprite) => f
                .debug_struct("Tile")
                .field("x", &sprite.x())
                .field("y", &sprite.y())
                .field("rotation", &self.rotation())
                .field("flip_h", &self.is_flipped(FlipAxis::Horizontal))
                .field("flip_v", &self.is_flipped(FlipAxis::Vertical))
                .field("collidable", &self.is_collidable())
                .finish(),
        }
    }
}

impl From<Tile> for u32 {
    fn from(tile: Tile) -> Self {
        tile.to_bits()
    }
}

/// Raised when a raw word does not encode a valid tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("invalid tile encoding {0:#010x}")]
pub struct InvalidTileBits(pub u32);

impl TryFrom<u32> for Tile {
    type Error = InvalidTileBits;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        Tile::from_bits(bits).ok_or(InvalidTileBits(bits))
    }
}
