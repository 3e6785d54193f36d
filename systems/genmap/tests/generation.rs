use std::time::Duration;

use castaway_core::{GenerationEvent, GenerationStage, Layer, StageStatus, Tile};
use castaway_system_genmap::{
    catalog::{self, FLOOR_TILE, WATER_TILE},
    edges, stages, GenerationTuning, Generator,
};
use castaway_world::{Grid, Map};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Replays a fixed sequence of words.
struct ScriptedRng {
    script: Vec<u64>,
    cursor: usize,
}

impl ScriptedRng {
    fn new(script: Vec<u64>) -> Self {
        Self { script, cursor: 0 }
    }
}

impl RngCore for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        let value = self.script[self.cursor % self.script.len()];
        self.cursor += 1;
        value
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

fn grid_from_rows(rows: &[&str]) -> Grid {
    let tiles = rows
        .iter()
        .flat_map(|row| row.chars())
        .map(|cell| if cell == '#' { FLOOR_TILE } else { WATER_TILE })
        .collect();
    Grid::from_tiles(rows[0].len() as u32, rows.len() as u32, tiles).expect("rectangular fixture")
}

fn rows_of(map: &Map) -> Vec<String> {
    map.layer(Layer::Ground)
        .rows()
        .map(|row| {
            row.iter()
                .map(|tile| if catalog::is_land(*tile) { '#' } else { '.' })
                .collect()
        })
        .collect()
}

fn map_from_rows(rows: &[&str]) -> Map {
    let ground = grid_from_rows(rows);
    let decoration = Grid::new(ground.width(), ground.height());
    Map::from_layers(ground, decoration).expect("matching layers")
}

const SEED_FIXTURE: [&str; 10] = [
    "#..#..#..#",
    ".##....##.",
    "..######..",
    "#.#....#.#",
    "..#.##.#..",
    "..#.##.#..",
    "#.#....#.#",
    "..######..",
    ".##....##.",
    "#..#..#..#",
];

#[test]
fn seeding_follows_the_random_sequence() {
    let script = SEED_FIXTURE
        .iter()
        .flat_map(|row| row.chars())
        .map(|cell| if cell == '#' { 0 } else { u64::MAX })
        .collect();
    let mut rng = ScriptedRng::new(script);
    let mut map = Map::new(10, 10);
    map.set_tile(Layer::Decoration, 4, 4, catalog::flower(0));

    stages::seed_terrain(&mut map, 0.55, &mut rng);

    assert_eq!(rows_of(&map), SEED_FIXTURE);
    assert_eq!(rng.cursor, 100, "one draw per cell");
    assert!(map
        .layer(Layer::Ground)
        .tiles()
        .iter()
        .all(|tile| *tile == FLOOR_TILE || *tile == WATER_TILE));
    assert!(map
        .layer(Layer::Decoration)
        .tiles()
        .iter()
        .all(|tile| tile.is_empty()));
}

#[test]
fn smoothing_pass_matches_fixture() {
    let mut map = map_from_rows(&["#.#..", ".#.#.", "##.##", "...#.", "#.###"]);

    stages::smooth_terrain(&mut map, 1);

    assert_eq!(rows_of(&map), [".....", ".##..", "..#..", "..##.", "....."]);
}

#[test]
fn smoothing_leaves_a_water_border() {
    let mut map = Map::new(30, 24);
    let mut rng = ChaCha8Rng::seed_from_u64(77);
    stages::seed_terrain(&mut map, 0.55, &mut rng);
    for _ in 0..3 {
        stages::smooth_terrain(&mut map, 5);
    }

    for (cell, tile) in map.layer(Layer::Ground).cells() {
        let (x, y) = (cell.column(), cell.row());
        if x < 5 || y < 5 || x >= 25 || y >= 19 {
            assert_eq!(tile, WATER_TILE, "border cell {cell:?} is land");
        }
    }
}

#[test]
fn converged_grid_is_stable_under_smoothing() {
    let rows = [
        "........",
        "........",
        "..####..",
        "..####..",
        "..####..",
        "..####..",
        "........",
        "........",
    ];
    let mut map = map_from_rows(&rows);
    stages::smooth_terrain(&mut map, 1);
    let once = rows_of(&map);
    assert_eq!(
        once,
        [
            "........",
            "........",
            "...##...",
            "..####..",
            "..####..",
            "...##...",
            "........",
            "........",
        ]
    );
    stages::smooth_terrain(&mut map, 1);
    assert_eq!(rows_of(&map), once);
}

#[test]
fn edges_are_deterministic_and_shape_the_shore() {
    let rows = [".....", ".....", "..#..", ".....", "....."];
    let mut first = map_from_rows(&rows);
    let mut second = map_from_rows(&rows);

    stages::apply_edges(&mut first);
    stages::apply_edges(&mut second);
    assert_eq!(first, second);

    let ground = first.layer(Layer::Ground);
    assert_eq!(ground.get(2, 2), FLOOR_TILE);
    assert_eq!(ground.get(2, 1), catalog::shore_tile(edges::classify(0x40)));
    assert_eq!(ground.get(1, 2), catalog::shore_tile(edges::classify(0x10)));
    assert_eq!(ground.get(1, 1), catalog::shore_tile(edges::classify(0x80)));
    assert_eq!(ground.get(0, 0), WATER_TILE);
    assert!(ground
        .tiles()
        .iter()
        .filter(|tile| !catalog::is_land(**tile))
        .all(|tile| tile.is_collidable()));
}

fn instant_tuning() -> GenerationTuning {
    GenerationTuning {
        step_delay_ms: 0,
        ..GenerationTuning::default()
    }
}

fn run_to_completion(generator: &mut Generator, events: &mut Vec<GenerationEvent>) -> usize {
    let mut ticks = 0;
    loop {
        ticks += 1;
        assert!(ticks < 10_000, "generation did not finish");
        let now = Duration::from_millis(ticks as u64);
        if generator.advance(now, events) == StageStatus::AllComplete {
            return ticks;
        }
    }
}

#[test]
fn full_run_completes_with_valid_spawners() {
    let mut generator = Generator::new(Map::new(64, 48), instant_tuning(), 0x5eed);
    let mut events = Vec::new();
    let _ = run_to_completion(&mut generator, &mut events);

    assert!(generator.is_complete());
    let started: Vec<GenerationStage> = events
        .iter()
        .filter_map(|event| match event {
            GenerationEvent::StageStarted { stage } => Some(*stage),
            _ => None,
        })
        .collect();
    assert_eq!(started, &GenerationStage::ALL[..6]);
    assert_eq!(
        events
            .iter()
            .filter(|event| **event == GenerationEvent::GenerationComplete)
            .count(),
        1
    );

    let map = generator.map();
    for spawner in generator.spawners() {
        let (x, y) = (spawner.position.column(), spawner.position.row());
        assert_eq!(map.tile_at(Layer::Ground, x, y), FLOOR_TILE);
    }
    for (index, a) in generator.spawners().iter().enumerate() {
        for b in &generator.spawners()[index + 1..] {
            assert!(a.position.squared_distance(b.position) >= 400);
        }
    }

    let mut later = Vec::new();
    assert_eq!(
        generator.advance(Duration::from_secs(3_600), &mut later),
        StageStatus::AllComplete
    );
    assert!(later.is_empty());
}

#[test]
fn runs_are_reproducible_per_seed() {
    let build = |seed| {
        let mut generator = Generator::new(Map::new(48, 40), instant_tuning(), seed);
        let mut events = Vec::new();
        let _ = run_to_completion(&mut generator, &mut events);
        (generator.into_parts(), events)
    };

    let (first, first_events) = build(9);
    let (again, again_events) = build(9);
    let (other, _) = build(10);

    assert_eq!(first, again);
    assert_eq!(first_events, again_events);
    assert_ne!(first.0, other.0);
}

#[test]
fn steps_are_throttled_by_the_delay() {
    let tuning = GenerationTuning {
        step_delay_ms: 100,
        ..GenerationTuning::default()
    };
    let mut generator = Generator::new(Map::new(16, 16), tuning, 3);
    let mut events = Vec::new();

    assert_eq!(
        generator.advance(Duration::from_millis(5_000), &mut events),
        StageStatus::StageComplete
    );
    assert_eq!(generator.stage(), GenerationStage::Smooth);

    let before = generator.map().clone();
    for millis in [5_000, 5_050, 5_100] {
        assert_eq!(
            generator.advance(Duration::from_millis(millis), &mut events),
            StageStatus::Throttled
        );
    }
    assert_eq!(generator.map(), &before);

    assert_eq!(
        generator.advance(Duration::from_millis(5_101), &mut events),
        StageStatus::InProgress
    );
}

#[test]
fn edge_stage_changes_the_map_only_once() {
    let mut generator = Generator::new(Map::new(32, 32), instant_tuning(), 12);
    let mut events = Vec::new();
    let mut now = 0;
    while generator.stage() != GenerationStage::Edges {
        now += 1;
        let _ = generator.advance(Duration::from_millis(now), &mut events);
    }

    now += 1;
    let status = generator.advance(Duration::from_millis(now), &mut events);
    assert_eq!(status, StageStatus::InProgress);
    let shaped = generator.map().clone();

    while generator.stage() == GenerationStage::Edges {
        now += 1;
        let _ = generator.advance(Duration::from_millis(now), &mut events);
        if generator.stage() == GenerationStage::Edges {
            assert_eq!(generator.map(), &shaped);
        }
    }
    assert_eq!(generator.map(), &shaped);
}

#[test]
fn resumed_generator_reports_completion_without_touching_the_map() {
    let mut map = Map::new(6, 6);
    map.set_tile(Layer::Ground, 2, 3, Tile::from_sprite(11, 2));
    let snapshot = map.clone();
    let mut generator = Generator::resume(map, Vec::new());
    let mut events = Vec::new();

    assert_eq!(
        generator.advance(Duration::ZERO, &mut events),
        StageStatus::AllComplete
    );
    assert!(events.is_empty());
    assert_eq!(generator.map(), &snapshot);
}

#[test]
fn tree_shortage_is_reported_and_skipped() {
    let tuning = GenerationTuning {
        land_probability: 1.0,
        placement_attempts: 0,
        ..instant_tuning()
    };
    let mut generator = Generator::new(Map::new(20, 20), tuning, 5);
    let mut events = Vec::new();
    let _ = run_to_completion(&mut generator, &mut events);

    assert!(events.iter().any(|event| matches!(
        event,
        GenerationEvent::PlacementExhausted {
            stage: GenerationStage::Trees,
            placed: 0,
            ..
        }
    )));
    assert!(events.contains(&GenerationEvent::TreesPlanted {
        planted: 0,
        remaining: 0
    }));
    assert!(generator.is_complete());
}
