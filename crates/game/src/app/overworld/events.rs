use engine::Vec2;
use rand::RngCore;
use serde::Deserialize;
use tracing::debug;

use super::context::{Inventory, Translator};
use super::geometry::{Side, SideMask, TilePos};
use super::intents::{IntentQueue, OverworldIntent, TeleportTarget};
use super::map::{EventHandle, MapGrid};
use super::movement::{CharacterMotion, MotionContext, Occupancy};

pub const DOOR_ANIM_FRAMES: u32 = 4;
pub const DOOR_TICKS_PER_FRAME: u32 = 4;
pub const LOCKED_DOOR_KEY: &str = "overworld.door.locked";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Interact while facing the event.
    Press,
    /// Step onto the event's tile.
    GoIn,
    /// Stand in line with the event, within `zone_range` tiles, on an allowed side.
    Zone,
    /// Stand on the event's tile.
    BeIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteRef {
    pub sheet: String,
    pub frame: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorType {
    #[default]
    Normal,
    Shop,
}

impl DoorType {
    pub fn sound(self) -> &'static str {
        match self {
            DoorType::Normal => "door",
            DoorType::Shop => "shop_door",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorState {
    pub target: TeleportTarget,
    pub door_type: DoorType,
    /// Ticks since the door started opening; `None` while closed.
    pub anim: Option<u32>,
}

impl DoorState {
    pub fn new(target: TeleportTarget, door_type: DoorType) -> Self {
        Self {
            target,
            door_type,
            anim: None,
        }
    }

    fn open(&mut self, intents: &mut IntentQueue) {
        self.anim = Some(0);
        intents.enqueue(OverworldIntent::PlaySound(self.door_type.sound().to_string()));
        intents.enqueue(OverworldIntent::Teleport(self.target.clone()));
    }

    fn tick(&mut self) {
        if let Some(ticks) = self.anim {
            let next = ticks + 1;
            self.anim = (next < DOOR_ANIM_FRAMES * DOOR_TICKS_PER_FRAME).then_some(next);
        }
    }

    pub fn frame(&self) -> u32 {
        self.anim
            .map(|ticks| (ticks / DOOR_TICKS_PER_FRAME).min(DOOR_ANIM_FRAMES - 1))
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Teleport {
        target: TeleportTarget,
    },
    Door(DoorState),
    LockedDoor {
        door: DoorState,
        locked_lines: Vec<String>,
        required_item: String,
        consume_item: bool,
    },
    Talking {
        dialog_keys: Vec<String>,
    },
    Character {
        motion: CharacterMotion,
    },
    TalkingCharacter {
        motion: CharacterMotion,
        dialog_keys: Vec<String>,
        talking: bool,
    },
    Battle {
        team_id: String,
        /// `true` while no battle started by this event is running.
        over: bool,
    },
    Sound {
        sound_id: String,
        music: bool,
        toggle: bool,
        playing: bool,
    },
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Teleport { .. } => "teleport",
            EventKind::Door(_) => "door",
            EventKind::LockedDoor { .. } => "locked_door",
            EventKind::Talking { .. } => "talking",
            EventKind::Character { .. } => "character",
            EventKind::TalkingCharacter { .. } => "talking_character",
            EventKind::Battle { .. } => "battle",
            EventKind::Sound { .. } => "sound",
        }
    }

    fn default_trigger(&self) -> Trigger {
        match self {
            EventKind::Teleport { .. } | EventKind::Door(_) | EventKind::Sound { .. } => {
                Trigger::GoIn
            }
            _ => Trigger::Press,
        }
    }

    fn default_passable(&self) -> bool {
        matches!(
            self,
            EventKind::Teleport { .. } | EventKind::Door(_) | EventKind::Sound { .. }
        )
    }
}

/// Per-tick inputs to `MapEvent::update`.
pub struct EventUpdateContext<'a> {
    pub tick: u64,
    pub index: usize,
    pub grid: &'a MapGrid,
    pub occupancy: &'a mut Occupancy,
    pub player_tile: TilePos,
    pub dialog_over: bool,
    pub rng: &'a mut dyn RngCore,
}

/// Inputs to `MapEvent::action`. Actions communicate only through `intents`.
pub struct ActionContext<'a> {
    pub handle: EventHandle,
    pub player_facing: Side,
    pub inventory: &'a Inventory,
    pub translator: &'a dyn Translator,
    pub intents: &'a mut IntentQueue,
}

/// An interactive entity owned by a map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapEvent {
    tile: TilePos,
    trigger: Trigger,
    passable: bool,
    sides: SideMask,
    sprite: Option<SpriteRef>,
    zone_range: u32,
    zone_armed: bool,
    last_update: Option<u64>,
    kind: EventKind,
}

impl MapEvent {
    /// Builds an event with the trigger and passability its kind normally has.
    pub fn new(tile: TilePos, kind: EventKind) -> Self {
        Self {
            tile,
            trigger: kind.default_trigger(),
            passable: kind.default_passable(),
            sides: SideMask::all(),
            sprite: None,
            zone_range: 1,
            zone_armed: true,
            last_update: None,
            kind,
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_passable(mut self, passable: bool) -> Self {
        self.passable = passable;
        self
    }

    pub fn with_sides(mut self, sides: SideMask) -> Self {
        self.sides = sides;
        self
    }

    pub fn with_sprite(mut self, sprite: SpriteRef) -> Self {
        self.sprite = Some(sprite);
        self
    }

    pub fn with_zone_range(mut self, range: u32) -> Self {
        self.zone_range = range;
        self
    }

    fn motion(&self) -> Option<&CharacterMotion> {
        match &self.kind {
            EventKind::Character { motion } | EventKind::TalkingCharacter { motion, .. } => {
                Some(motion)
            }
            _ => None,
        }
    }

    pub fn tile(&self) -> TilePos {
        self.motion()
            .map(|motion| motion.mover().tile())
            .unwrap_or(self.tile)
    }

    pub fn pixel(&self) -> Vec2 {
        self.motion()
            .map(|motion| motion.mover().pixel())
            .unwrap_or_else(|| self.tile.to_pixel())
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn is_passable(&self) -> bool {
        self.passable
    }

    pub fn sides(&self) -> SideMask {
        self.sides
    }

    #[cfg(test)]
    pub fn zone_range(&self) -> u32 {
        self.zone_range
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn sprite(&self) -> Option<&SpriteRef> {
        self.sprite.as_ref()
    }

    /// Sheet and frame to draw this tick, if the event is visible.
    pub fn current_frame(&self) -> Option<(&str, u32)> {
        let sprite = self.sprite.as_ref()?;
        let frame = match &self.kind {
            EventKind::Character { motion } | EventKind::TalkingCharacter { motion, .. } => {
                motion.mover().sprite_frame()
            }
            EventKind::Door(door) | EventKind::LockedDoor { door, .. } => {
                sprite.frame + door.frame()
            }
            _ => sprite.frame,
        };
        Some((sprite.sheet.as_str(), frame))
    }

    #[cfg(test)]
    pub fn last_update(&self) -> Option<u64> {
        self.last_update
    }

    /// Per-tick bookkeeping. A second call within the same tick is a no-op.
    /// Returns whether any work was done.
    pub fn update(&mut self, ctx: &mut EventUpdateContext<'_>) -> bool {
        if self.last_update == Some(ctx.tick) {
            return false;
        }
        self.last_update = Some(ctx.tick);

        match &mut self.kind {
            EventKind::Door(door) | EventKind::LockedDoor { door, .. } => door.tick(),
            EventKind::Character { motion } => {
                Self::update_motion(motion, ctx);
            }
            EventKind::TalkingCharacter {
                motion, talking, ..
            } => {
                if *talking && ctx.dialog_over {
                    *talking = false;
                    motion.set_paused(false);
                }
                Self::update_motion(motion, ctx);
            }
            _ => {}
        }

        if !self.passable {
            let tile = self.tile();
            ctx.occupancy.set_event(ctx.index, Some(tile));
        }
        true
    }

    fn update_motion(motion: &mut CharacterMotion, ctx: &mut EventUpdateContext<'_>) {
        let mut motion_ctx = MotionContext {
            index: ctx.index,
            grid: ctx.grid,
            occupancy: ctx.occupancy,
            player_tile: ctx.player_tile,
            rng: &mut *ctx.rng,
        };
        motion.update(&mut motion_ctx);
    }

    /// Whether a `Zone` event's area covers `player_tile`.
    pub fn zone_covers(&self, player_tile: TilePos) -> bool {
        let origin = self.tile();
        Side::ALL.into_iter().any(|side| {
            if !self.sides.allows(side) {
                return false;
            }
            let (dx, dy) = side.delta();
            (1..=self.zone_range as i32)
                .any(|k| TilePos::new(origin.x + dx * k, origin.y + dy * k) == player_tile)
        })
    }

    /// Updates the entry latch and reports whether the zone fires this tick.
    /// With `may_fire` false an armed zone stays armed for a later tick.
    pub fn poll_zone(&mut self, player_tile: TilePos, may_fire: bool) -> bool {
        if !self.zone_covers(player_tile) {
            self.zone_armed = true;
            return false;
        }
        let fires = self.zone_armed && may_fire;
        if fires {
            self.zone_armed = false;
        }
        fires
    }

    pub fn rearm_zone(&mut self) {
        self.zone_armed = true;
    }

    /// Marks a battle event as resolved. Returns `false` for other kinds.
    pub fn set_battle_over(&mut self) -> bool {
        match &mut self.kind {
            EventKind::Battle { over, .. } => {
                *over = true;
                true
            }
            _ => false,
        }
    }

    pub fn action(&mut self, ctx: &mut ActionContext<'_>) {
        debug!(
            map = %ctx.handle.map,
            index = ctx.handle.index,
            kind = self.kind.label(),
            "event_triggered"
        );
        match &mut self.kind {
            EventKind::Teleport { target } => {
                ctx.intents.enqueue(OverworldIntent::Teleport(target.clone()));
            }
            EventKind::Door(door) => door.open(ctx.intents),
            EventKind::LockedDoor {
                door,
                locked_lines,
                required_item,
                consume_item,
            } => {
                if ctx.inventory.has(required_item) {
                    door.open(ctx.intents);
                    if *consume_item {
                        ctx.intents
                            .enqueue(OverworldIntent::ConsumeItem(required_item.clone()));
                    }
                } else if locked_lines.is_empty() {
                    start_dialog(ctx, &[LOCKED_DOOR_KEY.to_string()]);
                } else {
                    start_dialog(ctx, locked_lines);
                }
            }
            EventKind::Talking { dialog_keys } => start_dialog(ctx, dialog_keys),
            EventKind::Character { .. } => {}
            EventKind::TalkingCharacter {
                motion,
                dialog_keys,
                talking,
            } => {
                if !motion.mover().is_moving() {
                    motion.face(ctx.player_facing.opposite());
                }
                motion.set_paused(true);
                *talking = true;
                start_dialog(ctx, dialog_keys);
            }
            EventKind::Battle { team_id, over } => {
                if !*over {
                    debug!(team = team_id.as_str(), "battle_event_already_running");
                    return;
                }
                *over = false;
                ctx.intents
                    .enqueue(OverworldIntent::DeclareBattle(ctx.handle.clone()));
            }
            EventKind::Sound {
                sound_id,
                music,
                toggle,
                playing,
            } => {
                let intent = match (*music, *toggle && *playing) {
                    (true, true) => OverworldIntent::RestoreMapMusic,
                    (true, false) => OverworldIntent::PlayMusic(sound_id.clone()),
                    (false, true) => OverworldIntent::StopSound(sound_id.clone()),
                    (false, false) => OverworldIntent::PlaySound(sound_id.clone()),
                };
                *playing = if *toggle { !*playing } else { true };
                ctx.intents.enqueue(intent);
            }
        }
    }
}

fn start_dialog(ctx: &mut ActionContext<'_>, keys: &[String]) {
    let lines: Vec<String> = keys.iter().map(|key| ctx.translator.resolve(key)).collect();
    if lines.is_empty() {
        return;
    }
    ctx.intents.enqueue(OverworldIntent::StartDialog(lines));
}
