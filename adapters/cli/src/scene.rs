use std::time::Duration;

use anyhow::{Context, Result};
use castaway_core::{GenerationEvent, GenerationStage, PlayerRecord, StageStatus};
use castaway_system_bootstrap::Bootstrap;
use castaway_system_genmap::{catalog, stage_rng, GenerationTuning, Generator};
use castaway_world::{persist::SaveFile, Map};
use tracing::{debug, info, warn};

/// Map generation scene: loads a finished island or builds a new one, and
/// writes whatever it has back to the save file when it ends.
pub(crate) struct GenmapScene {
    save: SaveFile,
    generator: Generator,
    seed: u64,
    /// Whether the map was generated in this session and still has to be saved.
    fresh: bool,
}

/// What the scene left behind in the save file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Teardown {
    /// Generation reached its final stage and the completion marker was written.
    pub(crate) completed: bool,
    /// A new map was written.
    pub(crate) saved_map: bool,
    /// Spawners in the save file.
    pub(crate) spawners: usize,
    /// Player record written during teardown, if any.
    pub(crate) player: Option<PlayerRecord>,
}

impl GenmapScene {
    /// Resumes the finished island stored in `save`, or prepares a fresh run.
    ///
    /// A saved map that cannot be decoded is reported and replaced.
    pub(crate) fn open(
        save: SaveFile,
        dimensions: (u32, u32),
        tuning: GenerationTuning,
        seed: u64,
    ) -> Result<Self> {
        if save.is_generated().context("failed to probe save file")? {
            match save.load_map() {
                Ok(Some(map)) => {
                    let spawners = match save.load_spawners() {
                        Ok(spawners) => spawners.unwrap_or_default(),
                        Err(error) => {
                            warn!(error = %error, "saved_spawners_unreadable");
                            Vec::new()
                        }
                    };
                    info!(
                        width = map.width(),
                        height = map.height(),
                        spawners = spawners.len(),
                        "island_loaded"
                    );
                    return Ok(Self {
                        save,
                        generator: Generator::resume(map, spawners),
                        seed,
                        fresh: false,
                    });
                }
                Ok(None) => debug!("saved_map_missing"),
                Err(error) => warn!(error = %error, "saved_map_corrupt"),
            }
        }

        let (width, height) = dimensions;
        info!(width, height, seed, "generation_started");
        Ok(Self {
            save,
            generator: Generator::new(Map::new(width, height), tuning, seed),
            seed,
            fresh: true,
        })
    }

    /// Forwards one frame to the generator.
    pub(crate) fn tick(&mut self, now: Duration, events: &mut Vec<GenerationEvent>) -> StageStatus {
        self.generator.advance(now, events)
    }

    /// Generator driving the scene.
    pub(crate) fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Persists the scene state.
    ///
    /// A freshly generated map and its spawners are always written, finished or
    /// not, replacing the previous island together with its completion marker
    /// and player. The marker and a new player start are only written once
    /// every stage has run, so an interrupted run is regenerated next time.
    pub(crate) fn teardown(self) -> Result<Teardown> {
        let completed = self.generator.is_complete();

        if self.fresh {
            self.save
                .replace_island(self.generator.map(), self.generator.spawners())
                .context("failed to save island")?;
        }

        let mut player = None;
        if completed {
            let saved_player = match self.save.load_player() {
                Ok(saved) => saved,
                Err(error) => {
                    warn!(error = %error, "saved_player_corrupt");
                    None
                }
            };
            if saved_player.is_none() {
                let mut rng = stage_rng(self.seed, GenerationStage::Complete);
                player = Bootstrap
                    .player_start(self.generator.map(), catalog::FLOOR, &mut rng)
                    .map(|position| PlayerRecord { position });
                match player {
                    Some(record) => self
                        .save
                        .save_player(&record)
                        .context("failed to save player")?,
                    None => warn!("island_has_no_floor"),
                }
            }

            if self.fresh {
                self.save
                    .mark_generated()
                    .context("failed to mark generation complete")?;
            }
        }

        let outcome = Teardown {
            completed,
            saved_map: self.fresh,
            spawners: self.generator.spawners().len(),
            player,
        };
        info!(
            completed,
            saved_map = outcome.saved_map,
            spawners = outcome.spawners,
            "scene_torn_down"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use castaway_core::Layer;
    use tempfile::tempdir;

    fn instant() -> GenerationTuning {
        GenerationTuning {
            step_delay_ms: 0,
            ..GenerationTuning::default()
        }
    }

    fn run(scene: &mut GenmapScene, ticks: Option<u64>) {
        let mut events = Vec::new();
        for tick in 1..=ticks.unwrap_or(100_000) {
            if scene.tick(Duration::from_millis(tick), &mut events) == StageStatus::AllComplete {
                return;
            }
        }
    }

    #[test]
    fn completed_run_writes_marker_and_player() {
        let dir = tempdir().expect("temp dir");
        let save = SaveFile::new(dir.path().join("island.sav"));
        let mut scene = GenmapScene::open(save.clone(), (48, 40), instant(), 3).expect("scene opens");
        run(&mut scene, None);
        assert!(scene.generator().is_complete());

        let outcome = scene.teardown().expect("teardown succeeds");
        assert!(outcome.completed && outcome.saved_map);
        assert!(save.is_generated().expect("probe"));
        let loaded = save.load_map().expect("readable").expect("present");
        assert_eq!((loaded.width(), loaded.height()), (48, 40));
        if let Some(player) = outcome.player {
            assert_eq!(save.load_player().expect("readable"), Some(player));
            assert!(!loaded.collides_at(
                i64::from(player.position.column()),
                i64::from(player.position.row())
            ));
        }
    }

    #[test]
    fn interrupted_run_saves_map_without_marker() {
        let dir = tempdir().expect("temp dir");
        let save = SaveFile::new(dir.path().join("island.sav"));
        let mut scene = GenmapScene::open(save.clone(), (40, 30), instant(), 8).expect("scene opens");
        run(&mut scene, Some(4));
        assert!(!scene.generator().is_complete());

        let outcome = scene.teardown().expect("teardown succeeds");
        assert!(!outcome.completed);
        assert!(save.load_map().expect("readable").is_some());
        assert!(!save.is_generated().expect("probe"));
        assert_eq!(save.load_player().expect("readable"), None);

        let reopened = GenmapScene::open(save, (40, 30), instant(), 8).expect("scene reopens");
        assert_eq!(reopened.generator().stage(), GenerationStage::Seed);
    }

    #[test]
    fn finished_island_is_resumed_untouched() {
        let dir = tempdir().expect("temp dir");
        let save = SaveFile::new(dir.path().join("island.sav"));
        let mut scene = GenmapScene::open(save.clone(), (40, 30), instant(), 21).expect("scene opens");
        run(&mut scene, None);
        let _ = scene.teardown().expect("teardown succeeds");
        let stored = save.load_map().expect("readable").expect("present");

        let mut resumed = GenmapScene::open(save.clone(), (90, 90), instant(), 99).expect("scene reopens");
        let mut events = Vec::new();
        assert_eq!(
            resumed.tick(Duration::ZERO, &mut events),
            StageStatus::AllComplete
        );
        assert!(events.is_empty());
        assert_eq!(resumed.generator().map(), &stored);

        let outcome = resumed.teardown().expect("teardown succeeds");
        assert!(!outcome.saved_map);
        assert_eq!(save.load_map().expect("readable"), Some(stored));
    }

    #[test]
    fn corrupt_map_triggers_fresh_generation() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("island.sav");
        fs::write(&path, "<Map 1 1\n<Layer 0\nnothex!!\n>Layer\n>Map\n<Generated\n>Generated\n")
            .expect("fixture written");

        let scene = GenmapScene::open(SaveFile::new(&path), (20, 20), instant(), 1).expect("scene opens");
        assert_eq!(scene.generator().stage(), GenerationStage::Seed);
        assert_eq!(scene.generator().map().layer(Layer::Ground).width(), 20);
    }

    #[test]
    fn interrupted_regeneration_clears_the_stale_marker() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("island.sav");
        fs::write(
            &path,
            "<Map 1 1\n<Layer 0\nnothex!!\n>Layer\n>Map\n<Player\nPosition 0 0\n>Player\n<Generated\n>Generated\n",
        )
        .expect("fixture written");
        let save = SaveFile::new(&path);

        let mut scene = GenmapScene::open(save.clone(), (24, 20), instant(), 4).expect("scene opens");
        run(&mut scene, Some(3));
        let outcome = scene.teardown().expect("teardown succeeds");
        assert!(!outcome.completed);
        assert!(!save.is_generated().expect("probe"));
        assert_eq!(save.load_player().expect("readable"), None);

        let reopened = GenmapScene::open(save, (24, 20), instant(), 4).expect("scene reopens");
        assert_eq!(reopened.generator().stage(), GenerationStage::Seed);
    }

    #[test]
    fn unparseable_save_is_replaced_by_the_new_island() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("island.sav");
        fs::write(&path, "<Map 2 2\n<Layer 0\n").expect("fixture written");
        let save = SaveFile::new(&path);

        let mut scene = GenmapScene::open(save.clone(), (32, 24), instant(), 6).expect("scene opens");
        run(&mut scene, None);
        let outcome = scene.teardown().expect("teardown succeeds");

        assert!(outcome.completed && outcome.saved_map);
        assert!(save.is_generated().expect("probe"));
        let loaded = save.load_map().expect("readable").expect("present");
        assert_eq!((loaded.width(), loaded.height()), (32, 24));

        let resumed = GenmapScene::open(save, (32, 24), instant(), 6).expect("scene reopens");
        assert!(resumed.generator().is_complete());
    }
}
