//! JSON zone files: one map per `assets/maps/<id>.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::overworld::{
    AnimatedElement, CharacterMotion, DoorState, DoorType, EventKind, Map, MapError, MapEvent,
    MapGrid, MapId, MapProperties, MapStore, MoveStyle, Side, SideMask, SpriteRef, TeleportTarget,
    TilePos, Trigger,
};

const MAP_FILE_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("failed to read map directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read map file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid map json in {path} at {at}: {message}")]
    Parse {
        path: PathBuf,
        at: String,
        message: String,
    },
    #[error("map '{map}': {grid} row {row} has {len} cells, expected {width}")]
    RaggedRow {
        map: String,
        grid: &'static str,
        row: usize,
        len: usize,
        width: u32,
    },
    #[error("map '{map}': {source}")]
    Grid {
        map: String,
        #[source]
        source: MapError,
    },
    #[error("map id '{id}' is defined twice ({path})")]
    DuplicateId { id: String, path: PathBuf },
    #[error("map '{map}' event {index} targets unknown map '{target}'")]
    UnknownTarget {
        map: String,
        index: usize,
        target: String,
    },
    #[error("map '{map}' event {index} targets {tile}, outside map '{target}'")]
    TargetOutOfBounds {
        map: String,
        index: usize,
        target: String,
        tile: TilePos,
    },
    #[error("map '{map}' event {index} sits outside the map at {tile}")]
    EventOutOfBounds {
        map: String,
        index: usize,
        tile: TilePos,
    },
    #[error("no map files found in {0}")]
    Empty(PathBuf),
}

#[derive(Debug, Deserialize)]
struct MapFile {
    id: String,
    width: u32,
    height: u32,
    tileset: String,
    music: String,
    #[serde(default)]
    indoor: bool,
    layers: LayerFile,
    collision: Vec<Vec<u8>>,
    #[serde(default)]
    elements: Vec<ElementFile>,
    #[serde(default)]
    events: Vec<EventFile>,
}

/// Omitted `mid`/`top` layers are empty.
#[derive(Debug, Deserialize)]
struct LayerFile {
    bottom: Vec<Vec<u16>>,
    #[serde(default)]
    mid: Vec<Vec<u16>>,
    #[serde(default)]
    top: Vec<Vec<u16>>,
}

#[derive(Debug, Deserialize)]
struct ElementFile {
    id: String,
    sheet: String,
    tile: TilePos,
    frame_count: u32,
    #[serde(default = "default_ticks_per_frame")]
    ticks_per_frame: u32,
}

#[derive(Debug, Deserialize)]
struct EventFile {
    tile: TilePos,
    #[serde(default)]
    trigger: Option<Trigger>,
    #[serde(default)]
    passable: Option<bool>,
    #[serde(default)]
    sides: Option<Vec<Side>>,
    #[serde(default)]
    sprite: Option<SpriteFile>,
    #[serde(default)]
    zone_range: Option<u32>,
    #[serde(flatten)]
    kind: EventKindFile,
}

#[derive(Debug, Deserialize)]
struct SpriteFile {
    sheet: String,
    #[serde(default)]
    frame: u32,
}

#[derive(Debug, Deserialize)]
struct TargetFile {
    map: String,
    tile: TilePos,
    #[serde(default)]
    facing: Option<Side>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventKindFile {
    Teleport {
        target: TargetFile,
    },
    Door {
        target: TargetFile,
        #[serde(default)]
        door_type: DoorType,
    },
    LockedDoor {
        target: TargetFile,
        #[serde(default)]
        door_type: DoorType,
        #[serde(default)]
        locked_lines: Vec<String>,
        required_item: String,
        #[serde(default)]
        consume_item: bool,
    },
    Talking {
        dialog: Vec<String>,
    },
    Character {
        #[serde(default = "default_facing")]
        facing: Side,
        #[serde(default)]
        movement: MovementFile,
    },
    TalkingCharacter {
        #[serde(default = "default_facing")]
        facing: Side,
        #[serde(default)]
        movement: MovementFile,
        dialog: Vec<String>,
    },
    Battle {
        team: String,
    },
    Sound {
        sound: String,
        #[serde(default)]
        music: bool,
        #[serde(default)]
        toggle: bool,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
enum MovementFile {
    #[default]
    Stationary,
    Scripted {
        path: Vec<Side>,
    },
    RandomWander,
    FollowPlayer,
}

fn default_ticks_per_frame() -> u32 {
    8
}

fn default_facing() -> Side {
    Side::Down
}

impl TargetFile {
    fn into_target(self) -> TeleportTarget {
        TeleportTarget {
            map: MapId::new(self.map),
            tile: self.tile,
            facing: self.facing,
        }
    }
}

impl MovementFile {
    fn into_style(self) -> MoveStyle {
        match self {
            MovementFile::Stationary => MoveStyle::Stationary,
            MovementFile::Scripted { path } => MoveStyle::Scripted { path, cursor: 0 },
            MovementFile::RandomWander => MoveStyle::RandomWander { cooldown: 0 },
            MovementFile::FollowPlayer => MoveStyle::FollowPlayer,
        }
    }
}

impl EventFile {
    fn into_event(self) -> MapEvent {
        let tile = self.tile;
        let kind = match self.kind {
            EventKindFile::Teleport { target } => EventKind::Teleport {
                target: target.into_target(),
            },
            EventKindFile::Door { target, door_type } => {
                EventKind::Door(DoorState::new(target.into_target(), door_type))
            }
            EventKindFile::LockedDoor {
                target,
                door_type,
                locked_lines,
                required_item,
                consume_item,
            } => EventKind::LockedDoor {
                door: DoorState::new(target.into_target(), door_type),
                locked_lines,
                required_item,
                consume_item,
            },
            EventKindFile::Talking { dialog } => EventKind::Talking {
                dialog_keys: dialog,
            },
            EventKindFile::Character { facing, movement } => EventKind::Character {
                motion: CharacterMotion::new(tile, facing, movement.into_style()),
            },
            EventKindFile::TalkingCharacter {
                facing,
                movement,
                dialog,
            } => EventKind::TalkingCharacter {
                motion: CharacterMotion::new(tile, facing, movement.into_style()),
                dialog_keys: dialog,
                talking: false,
            },
            EventKindFile::Battle { team } => EventKind::Battle {
                team_id: team,
                over: true,
            },
            EventKindFile::Sound {
                sound,
                music,
                toggle,
            } => EventKind::Sound {
                sound_id: sound,
                music,
                toggle,
                playing: false,
            },
        };

        let mut event = MapEvent::new(tile, kind);
        if let Some(trigger) = self.trigger {
            event = event.with_trigger(trigger);
        }
        if let Some(passable) = self.passable {
            event = event.with_passable(passable);
        }
        if let Some(sides) = self.sides {
            event = event.with_sides(SideMask::from_sides(&sides));
        }
        if let Some(sprite) = self.sprite {
            event = event.with_sprite(SpriteRef {
                sheet: sprite.sheet,
                frame: sprite.frame,
            });
        }
        if let Some(range) = self.zone_range {
            event = event.with_zone_range(range);
        }
        event
    }
}

fn flatten_rows<T: Copy + Default>(
    map: &str,
    grid: &'static str,
    rows: Vec<Vec<T>>,
    width: u32,
    height: u32,
) -> Result<Vec<T>, MapLoadError> {
    if rows.is_empty() {
        return Ok(vec![T::default(); width as usize * height as usize]);
    }
    let mut cells = Vec::with_capacity(width as usize * height as usize);
    for (row, values) in rows.into_iter().enumerate() {
        if values.len() != width as usize {
            return Err(MapLoadError::RaggedRow {
                map: map.to_string(),
                grid,
                row,
                len: values.len(),
                width,
            });
        }
        cells.extend(values);
    }
    Ok(cells)
}

impl MapFile {
    fn into_map(self) -> Result<Map, MapLoadError> {
        let id = self.id;
        let (width, height) = (self.width, self.height);
        let layers = [
            flatten_rows(&id, "bottom layer", self.layers.bottom, width, height)?,
            flatten_rows(&id, "mid layer", self.layers.mid, width, height)?,
            flatten_rows(&id, "top layer", self.layers.top, width, height)?,
        ];
        let collision = flatten_rows(&id, "collision grid", self.collision, width, height)?;
        let grid = MapGrid::new(width, height, layers, collision).map_err(|source| {
            MapLoadError::Grid {
                map: id.clone(),
                source,
            }
        })?;

        let elements = self
            .elements
            .into_iter()
            .map(|element| AnimatedElement {
                id: element.id,
                sheet: element.sheet,
                position: element.tile.to_pixel(),
                frame_count: element.frame_count.max(1),
                ticks_per_frame: element.ticks_per_frame,
            })
            .collect();

        let events: Vec<MapEvent> = self.events.into_iter().map(EventFile::into_event).collect();
        for (index, event) in events.iter().enumerate() {
            if !grid.contains(event.tile()) {
                return Err(MapLoadError::EventOutOfBounds {
                    map: id,
                    index,
                    tile: event.tile(),
                });
            }
        }

        Ok(Map::new(
            MapId::new(id),
            grid,
            MapProperties {
                tileset: self.tileset,
                music: self.music,
                indoor: self.indoor,
            },
            elements,
            events,
        ))
    }
}

/// Parses one zone file, reporting the JSON path of the first bad field.
pub fn parse_map(path: &Path, raw: &str) -> Result<Map, MapLoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let file: MapFile = serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
        let at = error.path().to_string();
        MapLoadError::Parse {
            path: path.to_path_buf(),
            at: if at.is_empty() { ".".to_string() } else { at },
            message: error.into_inner().to_string(),
        }
    })?;
    file.into_map()
}

fn event_target(event: &MapEvent) -> Option<&TeleportTarget> {
    match event.kind() {
        EventKind::Teleport { target } => Some(target),
        EventKind::Door(door) | EventKind::LockedDoor { door, .. } => Some(&door.target),
        _ => None,
    }
}

/// Every teleport and door must lead to a tile inside a loaded map.
fn validate_targets(store: &MapStore) -> Result<(), MapLoadError> {
    for map in store.iter() {
        for (index, event) in map.events().iter().enumerate() {
            let Some(target) = event_target(event) else {
                continue;
            };
            let Some(destination) = store.get(&target.map) else {
                return Err(MapLoadError::UnknownTarget {
                    map: map.id().to_string(),
                    index,
                    target: target.map.to_string(),
                });
            };
            if !destination.grid().contains(target.tile) {
                return Err(MapLoadError::TargetOutOfBounds {
                    map: map.id().to_string(),
                    index,
                    target: target.map.to_string(),
                    tile: target.tile,
                });
            }
        }
    }
    Ok(())
}

impl MapStore {
    /// Loads every `*.json` zone file in `dir`, in file-name order.
    pub fn load_dir(dir: &Path) -> Result<Self, MapLoadError> {
        let entries = fs::read_dir(dir).map_err(|source| MapLoadError::ReadDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| MapLoadError::ReadDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some(MAP_FILE_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();
        if paths.is_empty() {
            return Err(MapLoadError::Empty(dir.to_path_buf()));
        }

        let mut store = MapStore::new();
        for path in paths {
            let raw = fs::read_to_string(&path).map_err(|source| MapLoadError::Read {
                path: path.clone(),
                source,
            })?;
            let map = parse_map(&path, &raw)?;
            if store.contains(map.id()) {
                return Err(MapLoadError::DuplicateId {
                    id: map.id().to_string(),
                    path,
                });
            }
            info!(
                map = %map.id(),
                width = map.grid().width(),
                height = map.grid().height(),
                events = map.events().len(),
                "map_loaded"
            );
            debug!(path = %path.display(), "map_file_read");
            store.insert(map);
        }
        validate_targets(&store)?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::app::overworld::{CollisionCategory, LayerSlot};

    const HOUSE: &str = r#"{
        "id": "house",
        "width": 3,
        "height": 2,
        "tileset": "tilesets/overworld",
        "music": "house_theme",
        "indoor": true,
        "layers": { "bottom": [[1, 1, 1], [1, 2, 1]] },
        "collision": [[1, 0, 1], [0, 0, 4]],
        "events": [
            {
                "type": "door",
                "tile": [1, 1],
                "door_type": "shop",
                "sprite": { "sheet": "doors/shop" },
                "target": { "map": "house", "tile": [0, 1], "facing": "down" }
            },
            {
                "type": "talking_character",
                "tile": [0, 1],
                "facing": "left",
                "movement": { "style": "scripted", "path": ["up", "down"] },
                "dialog": ["npc.hi"],
                "sprite": { "sheet": "characters/npc" }
            },
            {
                "type": "battle",
                "tile": [2, 0],
                "team": "rival",
                "trigger": "zone",
                "zone_range": 3,
                "sides": ["left", "down"]
            }
        ]
    }"#;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).expect("write map");
    }

    #[test]
    fn parses_grids_and_events() {
        let map = parse_map(Path::new("house.json"), HOUSE).expect("map");
        assert_eq!(map.id().as_str(), "house");
        assert!(map.is_indoor());
        assert_eq!(map.grid().tile(LayerSlot::Bottom, TilePos::new(1, 1)), 2);
        assert_eq!(map.grid().tile(LayerSlot::Top, TilePos::new(1, 1)), 0);
        assert_eq!(
            map.collision(TilePos::new(2, 1)),
            CollisionCategory::Ledge(Side::Down)
        );

        let events = map.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].trigger(), Trigger::GoIn);
        assert!(events[0].is_passable());
        let EventKind::Door(door) = events[0].kind() else {
            panic!("expected a door, got {}", events[0].kind().label());
        };
        assert_eq!(door.door_type, DoorType::Shop);
        assert_eq!(door.target.facing, Some(Side::Down));

        assert_eq!(events[1].trigger(), Trigger::Press);
        assert!(!events[1].is_passable());
        assert_eq!(events[1].current_frame(), Some(("characters/npc", 3)));

        assert_eq!(events[2].trigger(), Trigger::Zone);
        assert_eq!(events[2].zone_range(), 3);
        assert!(events[2].sides().allows(Side::Left));
        assert!(!events[2].sides().allows(Side::Up));
    }

    #[test]
    fn sprite_keys_cover_tilesets_and_event_sprites() {
        let mut store = MapStore::new();
        store.insert(parse_map(Path::new("house.json"), HOUSE).expect("map"));
        let keys: Vec<&str> = store.sprite_keys().into_iter().collect();
        assert_eq!(keys, ["characters/npc", "doors/shop", "tilesets/overworld"]);
    }

    #[test]
    fn parse_errors_carry_the_json_path() {
        let broken = HOUSE.replace(r#""team": "rival","#, r#""team": 7,"#);
        let err = parse_map(Path::new("house.json"), &broken).expect_err("bad team");
        match err {
            MapLoadError::Parse { at, .. } => assert!(at.starts_with("events"), "path was {at}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let broken = HOUSE.replace("[[1, 0, 1], [0, 0, 4]]", "[[1, 0, 1, 1], [0, 0]]");
        let err = parse_map(Path::new("house.json"), &broken).expect_err("ragged");
        assert!(matches!(
            err,
            MapLoadError::RaggedRow {
                grid: "collision grid",
                row: 0,
                len: 4,
                ..
            }
        ));
    }

    #[test]
    fn missing_rows_are_a_grid_mismatch() {
        let broken = HOUSE.replace("[[1, 0, 1], [0, 0, 4]]", "[[1, 0, 1]]");
        let err = parse_map(Path::new("house.json"), &broken).expect_err("short");
        assert!(matches!(
            err,
            MapLoadError::Grid {
                source: MapError::GridSizeMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn events_outside_the_map_are_rejected() {
        let broken = HOUSE.replace(r#""tile": [2, 0]"#, r#""tile": [9, 9]"#);
        let err = parse_map(Path::new("house.json"), &broken).expect_err("oob");
        assert!(matches!(err, MapLoadError::EventOutOfBounds { index: 2, .. }));
    }

    #[test]
    fn load_dir_reads_every_json_file() {
        let dir = TempDir::new().expect("tempdir");
        write(dir.path(), "house.json", HOUSE);
        write(dir.path(), "notes.txt", "not a map");
        let store = MapStore::load_dir(dir.path()).expect("store");
        assert_eq!(store.len(), 1);
        assert!(store.contains(&MapId::new("house")));
    }

    #[test]
    fn load_dir_rejects_unknown_teleport_targets() {
        let dir = TempDir::new().expect("tempdir");
        write(
            dir.path(),
            "house.json",
            &HOUSE.replace(r#""map": "house""#, r#""map": "cellar""#),
        );
        let err = MapStore::load_dir(dir.path()).expect_err("dangling target");
        assert!(matches!(
            err,
            MapLoadError::UnknownTarget { index: 0, ref target, .. } if target == "cellar"
        ));
    }

    #[test]
    fn load_dir_rejects_targets_outside_the_destination_map() {
        let dir = TempDir::new().expect("tempdir");
        write(
            dir.path(),
            "house.json",
            &HOUSE.replace(r#""tile": [0, 1], "facing""#, r#""tile": [99, 99], "facing""#),
        );
        let err = MapStore::load_dir(dir.path()).expect_err("target off the map");
        assert!(matches!(
            err,
            MapLoadError::TargetOutOfBounds { index: 0, tile, .. } if tile == TilePos::new(99, 99)
        ));
    }

    #[test]
    fn load_dir_rejects_duplicate_ids_and_empty_dirs() {
        let dir = TempDir::new().expect("tempdir");
        assert!(matches!(
            MapStore::load_dir(dir.path()),
            Err(MapLoadError::Empty(_))
        ));
        write(dir.path(), "a.json", HOUSE);
        write(dir.path(), "b.json", HOUSE);
        assert!(matches!(
            MapStore::load_dir(dir.path()),
            Err(MapLoadError::DuplicateId { .. })
        ));
    }
}
