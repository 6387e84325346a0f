use engine::Vec2;
use rand::{Rng, RngCore};

use super::events::MapEvent;
use super::geometry::{Side, TilePos, TILE_SIZE};
use super::map::MapGrid;

/// Frames needed to walk one tile.
pub const STEP_FRAMES: u32 = 8;
const STEP_PIXELS: f32 = (TILE_SIZE as u32 / STEP_FRAMES) as f32;

const WANDER_COOLDOWN_MIN: u32 = 30;
const WANDER_COOLDOWN_MAX: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Idle,
    Moving { direction: Side, frame: u32 },
}

/// Tile-grid walker shared by the player and characters.
/// While moving, `tile` is already the destination and `pixel` interpolates toward it.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMover {
    tile: TilePos,
    pixel: Vec2,
    facing: Side,
    step: StepState,
    anim_parity: bool,
}

impl TileMover {
    pub fn new(tile: TilePos, facing: Side) -> Self {
        Self {
            tile,
            pixel: tile.to_pixel(),
            facing,
            step: StepState::Idle,
            anim_parity: false,
        }
    }

    pub fn tile(&self) -> TilePos {
        self.tile
    }

    pub fn pixel(&self) -> Vec2 {
        self.pixel
    }

    pub fn facing(&self) -> Side {
        self.facing
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.step, StepState::Moving { .. })
    }

    pub fn face(&mut self, side: Side) {
        self.facing = side;
    }

    /// Snaps to `tile`, cancelling any step in progress.
    pub fn place(&mut self, tile: TilePos) {
        self.tile = tile;
        self.pixel = tile.to_pixel();
        self.step = StepState::Idle;
    }

    /// Turns toward `direction` and starts a step when the destination is enterable.
    /// Returns `false` without moving when blocked or already mid-step.
    pub fn try_start_step(
        &mut self,
        direction: Side,
        grid: &MapGrid,
        occupied: impl Fn(TilePos) -> bool,
    ) -> bool {
        if self.is_moving() {
            return false;
        }
        self.facing = direction;
        let dest = self.tile.step(direction);
        if !grid.is_enterable(dest, direction) || occupied(dest) {
            return false;
        }
        self.tile = dest;
        self.step = StepState::Moving {
            direction,
            frame: 0,
        };
        self.pixel = self.interpolated(direction, 0);
        true
    }

    /// Advances a step by one frame. Returns `true` on the frame the step completes.
    pub fn advance(&mut self) -> bool {
        let StepState::Moving { direction, frame } = self.step else {
            return false;
        };
        let frame = frame + 1;
        if frame >= STEP_FRAMES {
            self.step = StepState::Idle;
            self.pixel = self.tile.to_pixel();
            self.anim_parity = !self.anim_parity;
            return true;
        }
        self.step = StepState::Moving { direction, frame };
        self.pixel = self.interpolated(direction, frame);
        false
    }

    fn interpolated(&self, direction: Side, frame: u32) -> Vec2 {
        let (dx, dy) = direction.delta();
        let remaining = (STEP_FRAMES - frame) as f32 * STEP_PIXELS;
        let target = self.tile.to_pixel();
        Vec2::new(
            target.x - dx as f32 * remaining,
            target.y - dy as f32 * remaining,
        )
    }

    /// Column in a 3-wide character sheet: 0 standing, 1 and 2 alternate feet.
    pub fn walk_column(&self) -> u32 {
        match self.step {
            StepState::Moving { frame, .. } if frame < STEP_FRAMES / 2 => {
                if self.anim_parity {
                    2
                } else {
                    1
                }
            }
            _ => 0,
        }
    }

    pub fn sprite_frame(&self) -> u32 {
        self.facing.sheet_row() * 3 + self.walk_column()
    }
}

/// Tiles held by impassable events and the player, kept current while events move.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    events: Vec<Option<TilePos>>,
    player: Option<TilePos>,
}

impl Occupancy {
    pub fn from_events(events: &[MapEvent], player: Option<TilePos>) -> Self {
        Self {
            events: events
                .iter()
                .map(|event| (!event.is_passable()).then(|| event.tile()))
                .collect(),
            player,
        }
    }

    pub fn set_event(&mut self, index: usize, tile: Option<TilePos>) {
        if let Some(slot) = self.events.get_mut(index) {
            *slot = tile;
        }
    }

    pub fn set_player(&mut self, tile: TilePos) {
        self.player = Some(tile);
    }

    pub fn blocked_for_player(&self, tile: TilePos) -> bool {
        self.events.iter().any(|held| *held == Some(tile))
    }

    pub fn blocked_for_event(&self, index: usize, tile: TilePos) -> bool {
        self.player == Some(tile)
            || self
                .events
                .iter()
                .enumerate()
                .any(|(other, held)| other != index && *held == Some(tile))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveStyle {
    Stationary,
    /// Walks the directions in order, looping. A blocked step is retried without advancing.
    Scripted { path: Vec<Side>, cursor: usize },
    RandomWander { cooldown: u32 },
    FollowPlayer,
}

pub struct MotionContext<'a> {
    pub index: usize,
    pub grid: &'a MapGrid,
    pub occupancy: &'a Occupancy,
    pub player_tile: TilePos,
    pub rng: &'a mut dyn RngCore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterMotion {
    mover: TileMover,
    style: MoveStyle,
    paused: bool,
}

impl CharacterMotion {
    pub fn new(tile: TilePos, facing: Side, style: MoveStyle) -> Self {
        Self {
            mover: TileMover::new(tile, facing),
            style,
            paused: false,
        }
    }

    pub fn mover(&self) -> &TileMover {
        &self.mover
    }

    #[cfg(test)]
    pub fn style(&self) -> &MoveStyle {
        &self.style
    }

    #[cfg(test)]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// A paused character finishes its current step but starts no new one.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn face(&mut self, side: Side) {
        self.mover.face(side);
    }

    pub fn update(&mut self, ctx: &mut MotionContext<'_>) {
        if self.mover.is_moving() {
            self.mover.advance();
            return;
        }
        if self.paused {
            return;
        }

        let index = ctx.index;
        let occupancy = ctx.occupancy;
        let occupied = |tile: TilePos| occupancy.blocked_for_event(index, tile);
        match &mut self.style {
            MoveStyle::Stationary => {}
            MoveStyle::Scripted { path, cursor } => {
                if path.is_empty() {
                    return;
                }
                let direction = path[*cursor % path.len()];
                if self.mover.try_start_step(direction, ctx.grid, occupied) {
                    *cursor = (*cursor + 1) % path.len();
                }
            }
            MoveStyle::RandomWander { cooldown } => {
                if *cooldown > 0 {
                    *cooldown -= 1;
                    return;
                }
                let direction = Side::ALL[ctx.rng.gen_range(0..Side::ALL.len())];
                self.mover.try_start_step(direction, ctx.grid, occupied);
                *cooldown = ctx.rng.gen_range(WANDER_COOLDOWN_MIN..=WANDER_COOLDOWN_MAX);
            }
            MoveStyle::FollowPlayer => {
                for direction in toward(self.mover.tile(), ctx.player_tile) {
                    if self.mover.try_start_step(direction, ctx.grid, &occupied) {
                        break;
                    }
                }
            }
        }
    }
}

/// Directions from `from` toward `to`, dominant axis first. Empty when adjacent or equal.
fn toward(from: TilePos, to: TilePos) -> Vec<Side> {
    if from.manhattan(to) <= 1 {
        return Vec::new();
    }
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let horizontal = match dx.signum() {
        1 => Some(Side::Right),
        -1 => Some(Side::Left),
        _ => None,
    };
    let vertical = match dy.signum() {
        1 => Some(Side::Down),
        -1 => Some(Side::Up),
        _ => None,
    };
    let ordered = if dx.abs() >= dy.abs() {
        [horizontal, vertical]
    } else {
        [vertical, horizontal]
    };
    ordered.into_iter().flatten().collect()
}
