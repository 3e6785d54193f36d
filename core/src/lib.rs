#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Castaway engine.
//!
//! This crate defines the values that flow between the map model, the
//! generation and spawning systems, and the adapters that drive them. The
//! generator mutates a map and reports what it did as [`GenerationEvent`]
//! values; adapters consume those events for logging and progress display and
//! never reach into generator internals.

mod tile;

use serde::{Deserialize, Serialize};

pub use tile::{FlipAxis, InvalidTileBits, Rotation, Sprite, Tile};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Castaway.";

/// Number of stacked tile layers in every map.
pub const LAYER_COUNT: usize = 2;

/// Identifies one of the stacked tile planes of a map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    /// Terrain: water, shoreline edges and floor.
    Ground,
    /// Props placed on top of the terrain: trees, rocks, flowers, gravestones.
    Decoration,
}

impl Layer {
    /// Every layer in drawing order.
    pub const ALL: [Layer; LAYER_COUNT] = [Layer::Ground, Layer::Decoration];

    /// Zero-based storage index of the layer.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Ground => 0,
            Self::Decoration => 1,
        }
    }

    /// Resolves a layer from its storage index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Ground),
            1 => Some(Self::Decoration),
            _ => None,
        }
    }
}

/// Location of a single map cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Squared Euclidean distance between the centres of two cells.
    #[must_use]
    pub fn squared_distance(self, other: CellCoord) -> u64 {
        let dx = u64::from(self.column().abs_diff(other.column()));
        let dy = u64::from(self.row().abs_diff(other.row()));
        dx * dx + dy * dy
    }
}

/// Discrete phases of island generation, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenerationStage {
    /// Random land/water noise.
    Seed,
    /// Cellular-automaton smoothing passes.
    Smooth,
    /// Shoreline tile selection from neighbour bitmasks.
    Edges,
    /// Tree planting on floor tiles.
    Trees,
    /// Flowers, rocks and gravestones.
    Features,
    /// Enemy spawner placement.
    Spawners,
    /// Generation finished; the map is ready for gameplay.
    Complete,
}

impl GenerationStage {
    /// Every stage in execution order.
    pub const ALL: [GenerationStage; 7] = [
        GenerationStage::Seed,
        GenerationStage::Smooth,
        GenerationStage::Edges,
        GenerationStage::Trees,
        GenerationStage::Features,
        GenerationStage::Spawners,
        GenerationStage::Complete,
    ];

    /// Stage that follows this one. `Complete` is terminal.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Seed => Self::Smooth,
            Self::Smooth => Self::Edges,
            Self::Edges => Self::Trees,
            Self::Trees => Self::Features,
            Self::Features => Self::Spawners,
            Self::Spawners | Self::Complete => Self::Complete,
        }
    }

    /// Stable lower-case label, used for logging and RNG stream derivation.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Smooth => "smooth",
            Self::Edges => "edges",
            Self::Trees => "trees",
            Self::Features => "features",
            Self::Spawners => "spawners",
            Self::Complete => "complete",
        }
    }
}

/// Result of a single call into the generation driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageStatus {
    /// The call arrived before the minimum inter-step delay elapsed; nothing ran.
    Throttled,
    /// A step ran and the current stage has more work to do.
    InProgress,
    /// A step ran and finished the current stage; another stage follows.
    StageComplete,
    /// Every stage has finished.
    AllComplete,
}

/// Notifications emitted by the generator while it advances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationEvent {
    /// A stage ran its first step.
    StageStarted {
        /// Stage that started.
        stage: GenerationStage,
    },
    /// A stage ran its final step.
    StageFinished {
        /// Stage that finished.
        stage: GenerationStage,
    },
    /// Trees were planted during a step.
    TreesPlanted {
        /// Trees placed during the step.
        planted: u32,
        /// Trees still owed to the target count.
        remaining: u32,
    },
    /// Rejection sampling hit its attempt cap before finding a valid cell.
    PlacementExhausted {
        /// Stage whose placement gave up.
        stage: GenerationStage,
        /// Items placed before giving up.
        placed: u32,
        /// Items the stage intended to place.
        requested: u32,
    },
    /// Spawners were accepted during a step.
    SpawnersPlaced {
        /// Spawners accepted during the step.
        accepted: u32,
        /// Spawners accepted over the whole run.
        total: u32,
    },
    /// The whole pipeline finished.
    GenerationComplete,
}

/// Default smallest number of entities a spawner releases at once.
pub const SPAWNER_DEFAULT_MIN_ENTITIES: u32 = 3;
/// Default largest number of entities a spawner releases at once.
pub const SPAWNER_DEFAULT_MAX_ENTITIES: u32 = 8;
/// Default radius, in tiles, around a spawner where entities appear.
pub const SPAWNER_DEFAULT_RADIUS: u32 = 3;

/// Enemy spawner placed on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Spawner {
    /// Cell the spawner is anchored to.
    pub position: CellCoord,
    /// Smallest group released when triggered.
    pub min_entities: u32,
    /// Largest group released when triggered.
    pub max_entities: u32,
    /// Radius in tiles of the disk where entities appear and where the player triggers it.
    pub spawn_radius: u32,
    /// Entities released by this spawner that are still alive. Not persisted.
    #[serde(skip)]
    pub spawned: u32,
}

impl Spawner {
    /// Creates a spawner at `position` with the default group size and radius.
    #[must_use]
    pub const fn at(position: CellCoord) -> Self {
        Self {
            position,
            min_entities: SPAWNER_DEFAULT_MIN_ENTITIES,
            max_entities: SPAWNER_DEFAULT_MAX_ENTITIES,
            spawn_radius: SPAWNER_DEFAULT_RADIUS,
            spawned: 0,
        }
    }
}

/// Persisted player state the generator is responsible for seeding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerRecord {
    /// Cell the player occupies when gameplay starts.
    pub position: CellCoord,
}
