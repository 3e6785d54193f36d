#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spawner placement and runtime spawner triggering.
//!
//! [`SpawnAllocator`] picks spawner cells during map generation so that no two
//! spawners sit closer than a minimum distance. [`Spawning`] runs during play:
//! it wakes spawners the player walks near and requests entities around them.

use castaway_core::{CellCoord, Spawner};
use glam::Vec2;
use rand::Rng;
use tracing::debug;

/// Radius of the circle around the player that wakes spawners up.
pub const PLAYER_TRIGGER_RADIUS: f32 = 5.0;

/// Attempts spent finding a free position for a single spawned entity.
const POSITION_ATTEMPTS: usize = 64;

/// Draws spawner positions from a candidate pool under a minimum-separation rule.
///
/// A candidate is accepted iff its squared distance to every previously
/// accepted position is at least `min_distance²`. Every draw removes the
/// candidate from the pool whether it is accepted or not, so the allocator
/// performs at most as many draws as there were candidates.
#[derive(Clone, Debug)]
pub struct SpawnAllocator {
    candidates: Vec<CellCoord>,
    accepted: Vec<CellCoord>,
    min_distance_squared: u64,
}

impl SpawnAllocator {
    /// Creates an allocator over `candidates` with the provided separation radius.
    #[must_use]
    pub fn new(candidates: Vec<CellCoord>, min_distance: u32) -> Self {
        let min_distance = u64::from(min_distance);
        Self {
            candidates,
            accepted: Vec::new(),
            min_distance_squared: min_distance * min_distance,
        }
    }

    /// Accepts up to `limit` new positions, returning how many were accepted.
    ///
    /// Stops early once the pool is empty.
    pub fn allocate<R>(&mut self, limit: usize, rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
    {
        let mut accepted = 0;
        while accepted < limit && !self.candidates.is_empty() {
            let index = rng.gen_range(0..self.candidates.len());
            let candidate = self.candidates.swap_remove(index);
            if self.admits(candidate) {
                self.accepted.push(candidate);
                accepted += 1;
            }
        }
        accepted
    }

    /// Reports whether `candidate` keeps its distance from every accepted position.
    #[must_use]
    pub fn admits(&self, candidate: CellCoord) -> bool {
        self.accepted
            .iter()
            .all(|placed| placed.squared_distance(candidate) >= self.min_distance_squared)
    }

    /// Positions accepted so far, in acceptance order.
    #[must_use]
    pub fn accepted(&self) -> &[CellCoord] {
        &self.accepted
    }

    /// Candidates not yet drawn.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.candidates.len()
    }

    /// Reports whether the candidate pool has been used up.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Request to create one entity on behalf of a spawner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRequest {
    /// Index of the requesting spawner in the spawner list.
    pub spawner: usize,
    /// World position, in tile units, where the entity appears.
    pub position: Vec2,
}

/// Runtime system that releases entities from spawners near the player.
#[derive(Debug, Default)]
pub struct Spawning;

impl Spawning {
    /// Wakes idle spawners whose circle overlaps the player's trigger circle.
    ///
    /// Each woken spawner rolls a group size in `[min_entities, max_entities]`
    /// and requests that many entities at distinct positions inside its radius.
    /// Spawners that still have live entities stay quiet.
    pub fn handle<R>(
        &mut self,
        player: Vec2,
        spawners: &mut [Spawner],
        rng: &mut R,
        out: &mut Vec<SpawnRequest>,
    ) where
        R: Rng + ?Sized,
    {
        for (index, spawner) in spawners.iter_mut().enumerate() {
            if spawner.spawned > 0 || !triggers(player, spawner) {
                continue;
            }

            let low = spawner.min_entities.min(spawner.max_entities);
            let high = spawner.min_entities.max(spawner.max_entities);
            let group = rng.gen_range(low..=high);

            let center = cell_center(spawner.position);
            let radius = spawner.spawn_radius as f32;
            let first = out.len();
            for _ in 0..group {
                let Some(position) = free_position(center, radius, &out[first..], rng) else {
                    break;
                };
                out.push(SpawnRequest {
                    spawner: index,
                    position,
                });
            }

            spawner.spawned = (out.len() - first) as u32;
            debug!(
                spawner = index,
                requested = group,
                spawned = spawner.spawned,
                "spawner_triggered"
            );
        }
    }

    /// Records that one entity released by `spawner` has been removed from play.
    pub fn entity_removed(&mut self, spawners: &mut [Spawner], spawner: usize) {
        if let Some(spawner) = spawners.get_mut(spawner) {
            spawner.spawned = spawner.spawned.saturating_sub(1);
        }
    }
}

fn triggers(player: Vec2, spawner: &Spawner) -> bool {
    let reach = PLAYER_TRIGGER_RADIUS + spawner.spawn_radius as f32;
    player.distance_squared(cell_center(spawner.position)) <= reach * reach
}

fn cell_center(cell: CellCoord) -> Vec2 {
    Vec2::new(cell.column() as f32, cell.row() as f32)
}

/// Samples a point in the disk around `center` whose unit square overlaps none of `taken`.
fn free_position<R>(center: Vec2, radius: f32, taken: &[SpawnRequest], rng: &mut R) -> Option<Vec2>
where
    R: Rng + ?Sized,
{
    (0..POSITION_ATTEMPTS)
        .map(|_| center + unit_disk_point(rng) * radius)
        .find(|candidate| {
            taken.iter().all(|request| {
                let gap = (request.position - *candidate).abs();
                gap.x >= 1.0 || gap.y >= 1.0
            })
        })
}

fn unit_disk_point<R>(rng: &mut R) -> Vec2
where
    R: Rng + ?Sized,
{
    loop {
        let point = Vec2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
        if point.length_squared() <= 1.0 {
            return point;
        }
    }
}
