use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Every adjustable knob of the island generator.
///
/// Missing fields fall back to their defaults when deserialised, so a config
/// file only needs to name the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationTuning {
    /// Chance that a cell starts as land during seeding.
    pub land_probability: f64,
    /// Number of cellular-automaton smoothing passes.
    pub smoothing_passes: u32,
    /// Width in cells of the water frame forced around the island.
    pub border_width: u32,
    /// Steps spent on the shoreline stage; only the first one changes the map.
    pub edge_display_steps: u32,
    /// Fraction of floor cells that receive a tree, also the per-step planting rate.
    pub tree_density: f64,
    /// Number of passes scattering flowers, rocks and gravestones.
    pub feature_passes: u32,
    /// Chance that an open floor cell grows a flower.
    pub flower_rate: f64,
    /// Chance that a floor cell among flowers receives a gravestone.
    pub gravestone_rate: f64,
    /// Chance that an open deep-water cell receives a lone rock.
    pub single_rock_rate: f64,
    /// Chance that a deep-water cell next to a lone rock grows a rock cluster.
    pub rock_cluster_rate: f64,
    /// Minimum distance in cells between two spawners.
    pub spawner_separation: u32,
    /// Spawners accepted at most per step.
    pub spawners_per_step: u32,
    /// Minimum wall-clock time between two generation steps, in milliseconds.
    pub step_delay_ms: u64,
    /// Random draws spent looking for a free cell before a placement gives up.
    pub placement_attempts: u32,
}

impl GenerationTuning {
    /// Minimum wall-clock time between two generation steps.
    #[must_use]
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl Default for GenerationTuning {
    fn default() -> Self {
        Self {
            land_probability: 0.55,
            smoothing_passes: 10,
            border_width: 5,
            edge_display_steps: 5,
            tree_density: 0.05,
            feature_passes: 5,
            flower_rate: 0.08,
            gravestone_rate: 0.20,
            single_rock_rate: 0.005,
            rock_cluster_rate: 0.40,
            spawner_separation: 20,
            spawners_per_step: 40,
            step_delay_ms: 100,
            placement_attempts: 4_096,
        }
    }
}
