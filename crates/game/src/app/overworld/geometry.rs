use bitflags::bitflags;
use engine::Vec2;
use serde::Deserialize;

pub const TILE_SIZE: i32 = 32;
pub const TILE_SIZE_F32: f32 = TILE_SIZE as f32;

/// Position on the tile grid. This is the authoritative coordinate for logic and collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(from = "[i32; 2]")]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl From<[i32; 2]> for TilePos {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, side: Side) -> Self {
        let (dx, dy) = side.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Top-left corner of the tile in world pixels.
    pub fn to_pixel(self) -> Vec2 {
        Vec2::new(
            (self.x * TILE_SIZE) as f32,
            (self.y * TILE_SIZE) as f32,
        )
    }

    pub fn manhattan(self, other: TilePos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl std::fmt::Display for TilePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Up,
    Down,
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Up, Side::Down, Side::Left, Side::Right];

    pub fn opposite(self) -> Side {
        match self {
            Side::Up => Side::Down,
            Side::Down => Side::Up,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Side::Up => (0, -1),
            Side::Down => (0, 1),
            Side::Left => (-1, 0),
            Side::Right => (1, 0),
        }
    }

    pub fn mask(self) -> SideMask {
        match self {
            Side::Up => SideMask::UP,
            Side::Down => SideMask::DOWN,
            Side::Left => SideMask::LEFT,
            Side::Right => SideMask::RIGHT,
        }
    }

    /// Row of a character sheet: down, left, right, up.
    pub fn sheet_row(self) -> u32 {
        match self {
            Side::Down => 0,
            Side::Left => 1,
            Side::Right => 2,
            Side::Up => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Up => "up",
            Side::Down => "down",
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

bitflags! {
    /// Sides of an event from which the player may activate it.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct SideMask: u8 {
        const UP    = 1 << 0;
        const DOWN  = 1 << 1;
        const LEFT  = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl SideMask {
    pub fn from_sides(sides: &[Side]) -> Self {
        sides
            .iter()
            .fold(SideMask::empty(), |mask, side| mask | side.mask())
    }

    pub fn allows(self, side: Side) -> bool {
        self.contains(side.mask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_is_an_involution() {
        for side in Side::ALL {
            assert_eq!(side.opposite().opposite(), side);
            assert_ne!(side.opposite(), side);
        }
    }

    #[test]
    fn step_follows_screen_axes() {
        let origin = TilePos::new(3, 3);
        assert_eq!(origin.step(Side::Up), TilePos::new(3, 2));
        assert_eq!(origin.step(Side::Down), TilePos::new(3, 4));
        assert_eq!(origin.step(Side::Left), TilePos::new(2, 3));
        assert_eq!(origin.step(Side::Right), TilePos::new(4, 3));
    }

    #[test]
    fn tile_to_pixel_uses_top_left_corner() {
        assert_eq!(TilePos::new(2, 4).to_pixel(), Vec2::new(64.0, 128.0));
    }

    #[test]
    fn side_mask_from_sides() {
        let mask = SideMask::from_sides(&[Side::Up, Side::Left]);
        assert!(mask.allows(Side::Up));
        assert!(mask.allows(Side::Left));
        assert!(!mask.allows(Side::Down));
        assert_eq!(SideMask::from_sides(&Side::ALL), SideMask::all());
    }

    #[test]
    fn tile_pos_deserializes_from_pair() {
        let tile: TilePos = serde_json::from_str("[5, 7]").expect("tile");
        assert_eq!(tile, TilePos::new(5, 7));
        let side: Side = serde_json::from_str("\"left\"").expect("side");
        assert_eq!(side, Side::Left);
    }
}
