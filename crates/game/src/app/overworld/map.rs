use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use engine::Vec2;
use thiserror::Error;

use super::events::MapEvent;
use super::geometry::{Side, TilePos, TILE_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapId(String);

impl MapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MapId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Address of an event inside the map store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventHandle {
    pub map: MapId,
    pub index: usize,
}

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.map, self.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionCategory {
    Free,
    Solid,
    Water,
    TallGrass,
    /// Can only be entered while moving in the given direction.
    Ledge(Side),
    Unknown(u8),
}

impl CollisionCategory {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Free,
            1 => Self::Solid,
            2 => Self::Water,
            3 => Self::TallGrass,
            4 => Self::Ledge(Side::Down),
            5 => Self::Ledge(Side::Left),
            6 => Self::Ledge(Side::Right),
            other => Self::Unknown(other),
        }
    }

    pub fn blocks(self, moving: Side) -> bool {
        match self {
            Self::Free | Self::TallGrass => false,
            Self::Solid | Self::Water | Self::Unknown(_) => true,
            Self::Ledge(direction) => direction != moving,
        }
    }

    /// Half-transparent tint for the debug collision overlay.
    pub fn debug_color(raw: u8) -> Option<[u8; 4]> {
        let color = match raw {
            0 => return None,
            1 => [255, 0, 0, 128],
            2 => [0, 0, 255, 128],
            3 => [255, 255, 0, 128],
            4 => [255, 0, 255, 128],
            5 => [255, 255, 255, 128],
            _ => [255, 50, 0, 128],
        };
        Some(color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSlot {
    Bottom,
    Mid,
    Top,
}

impl LayerSlot {
    pub const ALL: [LayerSlot; 3] = [LayerSlot::Bottom, LayerSlot::Mid, LayerSlot::Top];

    pub fn index(self) -> usize {
        match self {
            LayerSlot::Bottom => 0,
            LayerSlot::Mid => 1,
            LayerSlot::Top => 2,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("map dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("{grid} has {actual} cells, expected {expected} ({width}x{height})")]
    GridSizeMismatch {
        grid: &'static str,
        expected: usize,
        actual: usize,
        width: u32,
        height: u32,
    },
}

/// Tile layers and collision for one map, all of exactly `width * height` cells.
/// Layer cells hold `0` for empty or `n` for tileset frame `n - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapGrid {
    width: u32,
    height: u32,
    layers: [Vec<u16>; 3],
    collision: Vec<u8>,
}

impl MapGrid {
    pub fn new(
        width: u32,
        height: u32,
        layers: [Vec<u16>; 3],
        collision: Vec<u8>,
    ) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::EmptyDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        let named = [
            ("bottom layer", layers[0].len()),
            ("mid layer", layers[1].len()),
            ("top layer", layers[2].len()),
            ("collision grid", collision.len()),
        ];
        for (grid, actual) in named {
            if actual != expected {
                return Err(MapError::GridSizeMismatch {
                    grid,
                    expected,
                    actual,
                    width,
                    height,
                });
            }
        }
        Ok(Self {
            width,
            height,
            layers,
            collision,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(
            (self.width as i32 * TILE_SIZE) as f32,
            (self.height as i32 * TILE_SIZE) as f32,
        )
    }

    pub fn contains(&self, tile: TilePos) -> bool {
        tile.x >= 0 && tile.y >= 0 && (tile.x as u32) < self.width && (tile.y as u32) < self.height
    }

    fn cell_index(&self, tile: TilePos) -> Option<usize> {
        self.contains(tile)
            .then(|| tile.y as usize * self.width as usize + tile.x as usize)
    }

    /// Raw collision value; tiles outside the map read as free.
    pub fn collision_raw(&self, tile: TilePos) -> u8 {
        self.cell_index(tile)
            .map(|index| self.collision[index])
            .unwrap_or(0)
    }

    /// Tiles outside the map are `Free`; movement must check `contains` separately.
    pub fn collision(&self, tile: TilePos) -> CollisionCategory {
        CollisionCategory::from_raw(self.collision_raw(tile))
    }

    pub fn tile(&self, slot: LayerSlot, tile: TilePos) -> u16 {
        self.cell_index(tile)
            .map(|index| self.layers[slot.index()][index])
            .unwrap_or(0)
    }

    /// Whether a walker may enter `dest` moving in `direction`, ignoring occupants.
    pub fn is_enterable(&self, dest: TilePos, direction: Side) -> bool {
        self.contains(dest) && !self.collision(dest).blocks(direction)
    }
}

/// Looping sprite-sheet decoration drawn above the top layer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimatedElement {
    pub id: String,
    pub sheet: String,
    pub position: Vec2,
    pub frame_count: u32,
    pub ticks_per_frame: u32,
}

#[derive(Debug, Clone)]
pub struct MapProperties {
    pub tileset: String,
    pub music: String,
    pub indoor: bool,
}

/// One location: geometry, presentation metadata and the events it owns.
#[derive(Debug, Clone)]
pub struct Map {
    id: MapId,
    grid: MapGrid,
    properties: MapProperties,
    elements: Vec<AnimatedElement>,
    events: Vec<MapEvent>,
}

impl Map {
    pub fn new(
        id: MapId,
        grid: MapGrid,
        properties: MapProperties,
        elements: Vec<AnimatedElement>,
        events: Vec<MapEvent>,
    ) -> Self {
        Self {
            id,
            grid,
            properties,
            elements,
            events,
        }
    }

    pub fn id(&self) -> &MapId {
        &self.id
    }

    pub fn grid(&self) -> &MapGrid {
        &self.grid
    }

    pub fn tileset(&self) -> &str {
        &self.properties.tileset
    }

    pub fn music(&self) -> &str {
        &self.properties.music
    }

    pub fn is_indoor(&self) -> bool {
        self.properties.indoor
    }

    #[cfg(test)]
    pub fn collision(&self, tile: TilePos) -> CollisionCategory {
        self.grid.collision(tile)
    }

    pub fn elements(&self) -> &[AnimatedElement] {
        &self.elements
    }

    pub fn events(&self) -> &[MapEvent] {
        &self.events
    }

    /// Zone events fire again on the next entry, wherever the player arrives.
    pub fn rearm_zones(&mut self) {
        self.events.iter_mut().for_each(MapEvent::rearm_zone);
    }

    /// Geometry and events borrowed together so events can move against the grid.
    pub fn split_mut(&mut self) -> (&MapGrid, &mut [MapEvent]) {
        (&self.grid, &mut self.events)
    }
}

/// Arena owning every loaded map. The overworld only holds a `MapId` into it.
#[derive(Debug, Default)]
pub struct MapStore {
    maps: BTreeMap<MapId, Map>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, map: Map) -> Option<Map> {
        self.maps.insert(map.id().clone(), map)
    }

    pub fn get(&self, id: &MapId) -> Option<&Map> {
        self.maps.get(id)
    }

    pub fn get_mut(&mut self, id: &MapId) -> Option<&mut Map> {
        self.maps.get_mut(id)
    }

    pub fn contains(&self, id: &MapId) -> bool {
        self.maps.contains_key(id)
    }

    pub fn event(&self, handle: &EventHandle) -> Option<&MapEvent> {
        self.maps.get(&handle.map)?.events.get(handle.index)
    }

    pub fn event_mut(&mut self, handle: &EventHandle) -> Option<&mut MapEvent> {
        self.maps.get_mut(&handle.map)?.events.get_mut(handle.index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Map> {
        self.maps.values()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Every sprite sheet a loaded map can draw: tilesets, event sprites and elements.
    pub fn sprite_keys(&self) -> BTreeSet<&str> {
        let mut keys = BTreeSet::new();
        for map in self.maps.values() {
            keys.insert(map.tileset());
            keys.extend(
                map.events
                    .iter()
                    .filter_map(MapEvent::sprite)
                    .map(|sprite| sprite.sheet.as_str()),
            );
            keys.extend(map.elements.iter().map(|element| element.sheet.as_str()));
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_3x2(collision: Vec<u8>) -> MapGrid {
        MapGrid::new(3, 2, [vec![1; 6], vec![0; 6], vec![0; 6]], collision).expect("grid")
    }

    #[test]
    fn collision_inside_bounds_reads_the_grid() {
        let raw = vec![0, 1, 2, 3, 4, 9];
        let grid = grid_3x2(raw.clone());
        for y in 0..2 {
            for x in 0..3 {
                let tile = TilePos::new(x, y);
                let expected = CollisionCategory::from_raw(raw[(y * 3 + x) as usize]);
                assert_eq!(grid.collision(tile), expected, "tile={tile}");
            }
        }
    }

    #[test]
    fn collision_outside_bounds_is_free() {
        let grid = grid_3x2(vec![1; 6]);
        for tile in [
            TilePos::new(-1, 0),
            TilePos::new(0, -1),
            TilePos::new(3, 0),
            TilePos::new(0, 2),
            TilePos::new(100, 100),
        ] {
            assert_eq!(grid.collision(tile), CollisionCategory::Free, "tile={tile}");
            assert!(!grid.is_enterable(tile, Side::Down));
        }
    }

    #[test]
    fn grid_size_mismatch_is_rejected() {
        let err = MapGrid::new(3, 2, [vec![0; 6], vec![0; 5], vec![0; 6]], vec![0; 6])
            .expect_err("mismatch");
        assert!(matches!(
            err,
            MapError::GridSizeMismatch {
                grid: "mid layer",
                expected: 6,
                actual: 5,
                ..
            }
        ));
        assert!(MapGrid::new(0, 2, [vec![], vec![], vec![]], vec![]).is_err());
    }

    #[test]
    fn ledges_only_admit_their_direction() {
        let ledge = CollisionCategory::from_raw(4);
        assert!(!ledge.blocks(Side::Down));
        assert!(ledge.blocks(Side::Up));
        assert!(ledge.blocks(Side::Left));
        assert!(CollisionCategory::from_raw(2).blocks(Side::Down));
        assert!(!CollisionCategory::from_raw(3).blocks(Side::Up));
        assert!(CollisionCategory::from_raw(42).blocks(Side::Up));
    }

    #[test]
    fn debug_colors_skip_free_tiles() {
        assert_eq!(CollisionCategory::debug_color(0), None);
        assert_eq!(CollisionCategory::debug_color(1), Some([255, 0, 0, 128]));
        assert_eq!(CollisionCategory::debug_color(8), Some([255, 50, 0, 128]));
    }

    #[test]
    fn pixel_size_is_tiles_times_32() {
        let grid = grid_3x2(vec![0; 6]);
        assert_eq!(grid.pixel_size(), Vec2::new(96.0, 64.0));
        assert_eq!(grid.tile(LayerSlot::Bottom, TilePos::new(2, 1)), 1);
        assert_eq!(grid.tile(LayerSlot::Bottom, TilePos::new(3, 1)), 0);
    }
}
