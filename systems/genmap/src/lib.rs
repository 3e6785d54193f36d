#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Staged island generator.
//!
//! [`Generator`] owns the map while it is being built and advances it one
//! step per call to [`Generator::advance`]. Calls that arrive sooner than the
//! configured step delay after the previous step are ignored, so a caller can
//! poll every frame and still watch the island take shape.
//!
//! Each stage draws from its own random stream derived from the run seed and
//! the stage label, which keeps a run reproducible per seed.

pub mod catalog;
pub mod edges;
pub mod stages;
mod tuning;

use std::time::Duration;

use castaway_core::{GenerationEvent, GenerationStage, Layer, Spawner, StageStatus};
use castaway_system_spawning::SpawnAllocator;
use castaway_world::{query, Map};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub use tuning::GenerationTuning;

/// Driver that walks a map through every generation stage.
#[derive(Debug)]
pub struct Generator {
    map: Map,
    spawners: Vec<Spawner>,
    tuning: GenerationTuning,
    seed: u64,
    stage: GenerationStage,
    /// Steps left in the current stage, `None` until its first step ran.
    remaining: Option<u32>,
    rng: ChaCha8Rng,
    allocator: Option<SpawnAllocator>,
    last_step: Option<Duration>,
}

impl Generator {
    /// Prepares a fresh run over `map` starting at the seeding stage.
    #[must_use]
    pub fn new(map: Map, tuning: GenerationTuning, seed: u64) -> Self {
        Self {
            map,
            spawners: Vec::new(),
            tuning,
            seed,
            stage: GenerationStage::Seed,
            remaining: None,
            rng: stage_rng(seed, GenerationStage::Seed),
            allocator: None,
            last_step: None,
        }
    }

    /// Wraps a map that finished generating earlier. Every call to
    /// [`Generator::advance`] reports [`StageStatus::AllComplete`] and the map
    /// is left untouched.
    #[must_use]
    pub fn resume(map: Map, spawners: Vec<Spawner>) -> Self {
        let mut generator = Self::new(map, GenerationTuning::default(), 0);
        generator.spawners = spawners;
        generator.stage = GenerationStage::Complete;
        generator
    }

    /// Runs at most one generation step.
    ///
    /// `now` is a monotonic timestamp supplied by the caller. The first call
    /// always runs; later calls run only when more than the step delay has
    /// passed since the previous step. Events describing the step are appended
    /// to `out`.
    pub fn advance(&mut self, now: Duration, out: &mut Vec<GenerationEvent>) -> StageStatus {
        if self.stage == GenerationStage::Complete {
            return StageStatus::AllComplete;
        }

        if let Some(last) = self.last_step {
            if now.saturating_sub(last) <= self.tuning.step_delay() {
                return StageStatus::Throttled;
            }
        }
        self.last_step = Some(now);

        let stage = self.stage;
        if !self.step(out) {
            return StageStatus::InProgress;
        }

        debug!(stage = stage.label(), "stage_finished");
        out.push(GenerationEvent::StageFinished { stage });
        self.stage = stage.next();
        self.remaining = None;

        if self.stage == GenerationStage::Complete {
            info!(
                width = self.map.width(),
                height = self.map.height(),
                spawners = self.spawners.len(),
                "generation_complete"
            );
            out.push(GenerationEvent::GenerationComplete);
            StageStatus::AllComplete
        } else {
            StageStatus::StageComplete
        }
    }

    /// Stage that the next step belongs to.
    #[must_use]
    pub fn stage(&self) -> GenerationStage {
        self.stage
    }

    /// Reports whether every stage has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stage == GenerationStage::Complete
    }

    /// Map in its current state. Partially generated maps are fully sized.
    #[must_use]
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Spawners accepted so far.
    #[must_use]
    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    /// Tuning used by the run.
    #[must_use]
    pub fn tuning(&self) -> &GenerationTuning {
        &self.tuning
    }

    /// Hands the map and spawners back to the caller.
    #[must_use]
    pub fn into_parts(self) -> (Map, Vec<Spawner>) {
        (self.map, self.spawners)
    }

    /// Runs one step of the current stage, returning whether the stage finished.
    fn step(&mut self, out: &mut Vec<GenerationEvent>) -> bool {
        let stage = self.stage;
        let first = self.remaining.is_none();
        let remaining = match self.remaining {
            Some(remaining) => remaining,
            None => self.begin(stage, out),
        };

        let remaining = if remaining == 0 {
            0
        } else {
            match stage {
                GenerationStage::Seed => {
                    stages::seed_terrain(&mut self.map, self.tuning.land_probability, &mut self.rng);
                    remaining - 1
                }
                GenerationStage::Smooth => {
                    stages::smooth_terrain(&mut self.map, self.tuning.border_width);
                    remaining - 1
                }
                GenerationStage::Edges => {
                    if first {
                        stages::apply_edges(&mut self.map);
                    }
                    remaining - 1
                }
                GenerationStage::Trees => self.plant_trees(remaining, out),
                GenerationStage::Features => {
                    let placed =
                        stages::scatter_features(&mut self.map, &self.tuning, &mut self.rng);
                    debug!(placed, pass = remaining, "features_scattered");
                    remaining - 1
                }
                GenerationStage::Spawners => self.place_spawners(out),
                GenerationStage::Complete => 0,
            }
        };

        self.remaining = Some(remaining);
        remaining == 0
    }

    /// Prepares the random stream and the step count of a stage.
    fn begin(&mut self, stage: GenerationStage, out: &mut Vec<GenerationEvent>) -> u32 {
        self.rng = stage_rng(self.seed, stage);

        let steps = match stage {
            GenerationStage::Seed => 1,
            GenerationStage::Smooth => self.tuning.smoothing_passes,
            GenerationStage::Edges => self.tuning.edge_display_steps.max(1),
            GenerationStage::Trees => {
                let floor = query::count_showing(&self.map, Layer::Ground, catalog::FLOOR);
                stages::tree_target(floor, self.tuning.tree_density)
            }
            GenerationStage::Features => self.tuning.feature_passes,
            GenerationStage::Spawners => {
                let candidates = stages::spawner_candidates(&self.map);
                self.allocator = Some(SpawnAllocator::new(
                    candidates,
                    self.tuning.spawner_separation,
                ));
                1
            }
            GenerationStage::Complete => 0,
        };

        debug!(stage = stage.label(), steps, "stage_started");
        out.push(GenerationEvent::StageStarted { stage });
        steps
    }

    fn plant_trees(&mut self, remaining: u32, out: &mut Vec<GenerationEvent>) -> u32 {
        let requested = stages::tree_batch(remaining, self.tuning.tree_density);
        let planting = stages::plant_trees(
            &mut self.map,
            requested,
            self.tuning.placement_attempts,
            &mut self.rng,
        );

        let left = if planting.exhausted {
            warn!(
                stage = GenerationStage::Trees.label(),
                placed = planting.planted,
                requested,
                "placement_exhausted"
            );
            out.push(GenerationEvent::PlacementExhausted {
                stage: GenerationStage::Trees,
                placed: planting.planted,
                requested,
            });
            0
        } else {
            remaining.saturating_sub(planting.planted)
        };

        out.push(GenerationEvent::TreesPlanted {
            planted: planting.planted,
            remaining: left,
        });
        left
    }

    fn place_spawners(&mut self, out: &mut Vec<GenerationEvent>) -> u32 {
        let Some(allocator) = self.allocator.as_mut() else {
            return 0;
        };

        let before = allocator.accepted().len();
        let accepted = allocator.allocate(self.tuning.spawners_per_step as usize, &mut self.rng);
        self.spawners
            .extend(allocator.accepted()[before..].iter().copied().map(Spawner::at));
        let exhausted = allocator.is_exhausted();

        out.push(GenerationEvent::SpawnersPlaced {
            accepted: accepted as u32,
            total: self.spawners.len() as u32,
        });

        if accepted == 0 || exhausted {
            self.allocator = None;
            0
        } else {
            1
        }
    }
}

/// Random stream dedicated to one stage of the run seeded with `seed`.
#[must_use]
pub fn stage_rng(seed: u64, stage: GenerationStage) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_labeled_seed(seed, stage.label()))
}

fn derive_labeled_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
