use engine::Vec2;

use super::geometry::{Side, TilePos, TILE_SIZE_F32};
use super::movement::TileMover;

/// The user-controlled avatar. Owned by the session; the overworld borrows it per tick.
#[derive(Debug, Clone)]
pub struct PlayerEvent {
    mover: TileMover,
    sheet: String,
    locked: bool,
    anim_start_tick: u64,
}

impl PlayerEvent {
    pub fn new(tile: TilePos, facing: Side, sheet: impl Into<String>) -> Self {
        Self {
            mover: TileMover::new(tile, facing),
            sheet: sheet.into(),
            locked: false,
            anim_start_tick: 0,
        }
    }

    pub fn tile(&self) -> TilePos {
        self.mover.tile()
    }

    pub fn pixel(&self) -> Vec2 {
        self.mover.pixel()
    }

    pub fn facing(&self) -> Side {
        self.mover.facing()
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    #[cfg(test)]
    pub fn mover(&self) -> &TileMover {
        &self.mover
    }

    pub fn mover_mut(&mut self) -> &mut TileMover {
        &mut self.mover
    }

    pub fn is_moving(&self) -> bool {
        self.mover.is_moving()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    pub fn face(&mut self, side: Side) {
        self.mover.face(side);
    }

    pub fn place(&mut self, tile: TilePos, facing: Option<Side>) {
        self.mover.place(tile);
        if let Some(facing) = facing {
            self.mover.face(facing);
        }
    }

    pub fn center(&self) -> Vec2 {
        let pixel = self.pixel();
        Vec2::new(pixel.x + TILE_SIZE_F32 / 2.0, pixel.y + TILE_SIZE_F32 / 2.0)
    }

    /// Painter's-order key shared with events.
    pub fn sprite_bottom(&self) -> f32 {
        self.pixel().y + TILE_SIZE_F32
    }

    pub fn sprite_frame(&self) -> u32 {
        self.mover.sprite_frame()
    }

    pub fn anim_start_tick(&self) -> u64 {
        self.anim_start_tick
    }

    pub fn set_anim_start_tick(&mut self, tick: u64) {
        self.anim_start_tick = tick;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn place_snaps_and_optionally_turns() {
        let mut player = PlayerEvent::new(TilePos::new(1, 1), Side::Down, "characters/player");
        player.place(TilePos::new(5, 5), Some(Side::Left));
        assert_eq!(player.tile(), TilePos::new(5, 5));
        assert_eq!(player.pixel(), Vec2::new(160.0, 160.0));
        assert_eq!(player.facing(), Side::Left);

        player.place(TilePos::new(2, 3), None);
        assert_eq!(player.facing(), Side::Left);
        assert_eq!(player.center(), Vec2::new(80.0, 112.0));
        assert_eq!(player.sprite_bottom(), 128.0);
    }

    #[test]
    fn lock_flag_round_trips() {
        let mut player = PlayerEvent::new(TilePos::new(0, 0), Side::Down, "characters/player");
        assert!(!player.is_locked());
        player.lock();
        assert!(player.is_locked());
        player.unlock();
        assert!(!player.is_locked());
    }
}
