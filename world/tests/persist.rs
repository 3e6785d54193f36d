use std::fs;

use castaway_core::{
    CellCoord, FlipAxis, Layer, PlayerRecord, Rotation, Spawner, Sprite, Tile,
};
use castaway_world::{
    persist::{PersistError, SaveFile, GENERATED_TAG, MAP_TAG, PLAYER_TAG, SPAWNERS_TAG},
    Map,
};
use tempfile::tempdir;

fn sample_map() -> Map {
    let mut map = Map::new(4, 3);
    let water = Tile::from_sprite(9, 1).with_collision();
    let floor = Tile::from_sprite(11, 2);
    for row in 0..3 {
        for column in 0..4 {
            let tile = if column == 0 { water } else { floor };
            map.set_tile(Layer::Ground, column, row, tile);
        }
    }
    map.set_tile(
        Layer::Ground,
        3,
        2,
        Tile::new(Sprite::new(6, 4), Rotation::Deg90).with_collision(),
    );
    map.set_tile(
        Layer::Decoration,
        2,
        1,
        Tile::from_sprite(11, 0).with_flip(FlipAxis::Horizontal),
    );
    map.set_tile(Layer::Decoration, 1, 1, Tile::from_sprite(0, 4).with_collision());
    map.set_tile(Layer::Decoration, 1, 0, Tile::from_sprite(0, 3));
    map
}

#[test]
fn map_round_trips_every_tile_flag() {
    let dir = tempdir().expect("temp dir");
    let save = SaveFile::new(dir.path().join("world.sav"));
    let map = sample_map();

    save.save_map(&map).expect("map saved");
    let loaded = save.load_map().expect("map readable").expect("map present");

    assert_eq!(loaded, map);
    assert!(loaded
        .tile_at(Layer::Decoration, 2, 1)
        .is_flipped(FlipAxis::Horizontal));
    assert_eq!(loaded.tile_at(Layer::Ground, 3, 2).rotation(), Rotation::Deg90);
    assert!(loaded.tile_at(Layer::Decoration, 0, 0).is_empty());
}

#[test]
fn missing_file_reports_absent_sections() {
    let dir = tempdir().expect("temp dir");
    let save = SaveFile::new(dir.path().join("none.sav"));

    assert!(!save.exists(MAP_TAG).expect("probe succeeds"));
    assert!(save.load_map().expect("readable").is_none());
    assert!(save.load_spawners().expect("readable").is_none());
    assert!(save.load_player().expect("readable").is_none());
    assert!(!save.is_generated().expect("probe succeeds"));
}

#[test]
fn sections_are_replaced_in_place_and_preserve_siblings() {
    let dir = tempdir().expect("temp dir");
    let save = SaveFile::new(dir.path().join("world.sav"));

    let first = vec![Spawner::at(CellCoord::new(5, 5))];
    save.save_spawners(&first).expect("spawners saved");
    save.save_map(&sample_map()).expect("map saved");
    save.save_player(&PlayerRecord {
        position: CellCoord::new(2, 1),
    })
    .expect("player saved");

    let mut second = Spawner::at(CellCoord::new(30, 7));
    second.min_entities = 1;
    second.max_entities = 2;
    second.spawn_radius = 4;
    save.save_spawners(&[second]).expect("spawners replaced");

    let document = save.read().expect("document parses");
    let tags: Vec<&str> = document.sections().iter().map(|s| s.tag()).collect();
    assert_eq!(tags, [SPAWNERS_TAG, MAP_TAG, PLAYER_TAG]);

    let spawners = save.load_spawners().expect("readable").expect("present");
    assert_eq!(spawners, vec![second]);
    assert_eq!(
        save.load_player().expect("readable"),
        Some(PlayerRecord {
            position: CellCoord::new(2, 1)
        })
    );
    assert_eq!(save.load_map().expect("readable"), Some(sample_map()));
}

#[test]
fn generated_marker_requires_map() {
    let dir = tempdir().expect("temp dir");
    let save = SaveFile::new(dir.path().join("world.sav"));

    save.mark_generated().expect("marker written");
    assert!(save.exists(GENERATED_TAG).expect("probe succeeds"));
    assert!(!save.is_generated().expect("probe succeeds"));

    save.save_map(&sample_map()).expect("map saved");
    assert!(save.is_generated().expect("probe succeeds"));
}

#[test]
fn exists_ignores_unterminated_sections() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("world.sav");
    fs::write(&path, "<Map 2 2\n<Layer 0\n").expect("fixture written");

    let save = SaveFile::new(&path);
    assert!(!save.exists(MAP_TAG).expect("probe succeeds"));
    assert!(matches!(save.load_map(), Err(PersistError::Unclosed { .. })));
}

#[test]
fn corrupt_map_is_an_error_not_absence() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("world.sav");
    fs::write(
        &path,
        "<Map 1 1\n<Layer 0\nzzzzzzzz\n>Layer\n<Layer 1\n00000000\n>Layer\n>Map\n",
    )
    .expect("fixture written");

    let save = SaveFile::new(&path);
    assert!(save.exists(MAP_TAG).expect("probe succeeds"));
    assert!(matches!(
        save.load_map(),
        Err(PersistError::Malformed { .. })
    ));
}

#[test]
fn oversized_map_header_is_malformed() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("world.sav");
    fs::write(
        &path,
        "<Map 4000000000 4000000000\n<Layer 0\n00000000\n>Layer\n<Layer 1\n00000000\n>Layer\n>Map\n",
    )
    .expect("fixture written");

    assert!(matches!(
        SaveFile::new(&path).load_map(),
        Err(PersistError::Malformed { .. })
    ));
}

#[test]
fn replacing_an_island_drops_its_marker_and_player() {
    let dir = tempdir().expect("temp dir");
    let save = SaveFile::new(dir.path().join("world.sav"));
    save.save_map(&Map::new(2, 2)).expect("map saved");
    save.save_player(&PlayerRecord {
        position: CellCoord::new(1, 1),
    })
    .expect("player saved");
    save.mark_generated().expect("marker written");

    let spawners = [Spawner::at(CellCoord::new(2, 0))];
    save.replace_island(&sample_map(), &spawners)
        .expect("island replaced");

    assert!(!save.is_generated().expect("probe succeeds"));
    assert_eq!(save.load_player().expect("readable"), None);
    assert_eq!(save.load_map().expect("readable"), Some(sample_map()));
    assert_eq!(
        save.load_spawners().expect("readable"),
        Some(spawners.to_vec())
    );
}

#[test]
fn replacing_an_island_discards_an_unparseable_file() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("world.sav");
    fs::write(&path, "<Map 2 2\n<Layer 0\n").expect("fixture written");
    let save = SaveFile::new(&path);
    assert!(save.read().is_err());

    save.replace_island(&sample_map(), &[])
        .expect("island replaced");

    assert_eq!(save.load_map().expect("readable"), Some(sample_map()));
    assert_eq!(save.load_spawners().expect("readable"), Some(Vec::new()));
}

#[test]
fn remove_clears_the_file_and_tolerates_absence() {
    let dir = tempdir().expect("temp dir");
    let save = SaveFile::new(dir.path().join("world.sav"));
    save.mark_generated().expect("marker written");

    save.remove().expect("file removed");
    assert!(!save.path().exists());
    save.remove().expect("second removal is a no-op");
}

#[test]
fn write_leaves_no_temporary_file_behind() {
    let dir = tempdir().expect("temp dir");
    let save = SaveFile::new(dir.path().join("world.sav"));
    save.save_map(&sample_map()).expect("map saved");

    let names: Vec<String> = fs::read_dir(dir.path())
        .expect("dir readable")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["world.sav"]);
}
