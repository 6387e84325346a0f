use std::collections::BTreeMap;

use engine::{InputAction, InputSnapshot};
use rand::RngCore;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::camera::Camera;
use super::context::{Inventory, Jukebox, Translator};
use super::dialog::{Dialog, DialogConfig, DialogPhase};
use super::draw::{DrawItem, DrawList};
use super::events::{ActionContext, EventUpdateContext, MapEvent, Trigger};
use super::fade::{FadeStep, FadeTransition};
use super::geometry::{Side, TilePos, TILE_SIZE_F32};
use super::intents::{IntentQueue, OverworldIntent, TeleportTarget};
use super::map::{EventHandle, LayerSlot, Map, MapGrid, MapId, MapStore};
use super::movement::Occupancy;
use super::player::PlayerEvent;

const DEBUG_LOG_INTERVAL_TICKS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverworldError {
    #[error("battle {requested} declared while battle {declared} is still running")]
    BattleAlreadyDeclared {
        declared: EventHandle,
        requested: EventHandle,
    },
    #[error("map '{0}' is not loaded")]
    UnknownMap(MapId),
    #[error("teleport target {tile} is outside map '{map}'")]
    TargetOutOfBounds { map: MapId, tile: TilePos },
}

/// What the session should do after an overworld tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverworldCommand {
    Continue,
    EnterBattle(EventHandle),
    Paused,
}

/// Overworld view of one tick's input. Everything except `direction` is a press edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverworldInput {
    pub direction: Option<Side>,
    pub interact: bool,
    pub pause: bool,
    pub toggle_debug: bool,
    pub toggle_collisions: bool,
    pub toggle_camera_lock: bool,
    pub toggle_layers: [bool; 3],
}

impl OverworldInput {
    pub fn from_snapshot(input: &InputSnapshot) -> Self {
        let direction = [
            (InputAction::MoveUp, Side::Up),
            (InputAction::MoveDown, Side::Down),
            (InputAction::MoveLeft, Side::Left),
            (InputAction::MoveRight, Side::Right),
        ]
        .into_iter()
        .find(|(action, _)| input.is_down(*action))
        .map(|(_, side)| side);

        Self {
            direction,
            interact: input.pressed(InputAction::Interact),
            pause: input.pressed(InputAction::Pause),
            toggle_debug: input.pressed(InputAction::ToggleDebug),
            toggle_collisions: input.pressed(InputAction::ToggleCollisions),
            toggle_camera_lock: input.pressed(InputAction::ToggleCameraLock),
            toggle_layers: [
                input.pressed(InputAction::ToggleLayerBottom),
                input.pressed(InputAction::ToggleLayerMid),
                input.pressed(InputAction::ToggleLayerTop),
            ],
        }
    }

    #[cfg(test)]
    pub fn holding(side: Side) -> Self {
        Self {
            direction: Some(side),
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn interact() -> Self {
        Self {
            interact: true,
            ..Self::default()
        }
    }
}

/// Session-owned collaborators lent to the overworld for one tick.
pub struct OverworldContext<'a> {
    pub maps: &'a mut MapStore,
    pub player: &'a mut PlayerEvent,
    pub input: &'a OverworldInput,
    pub inventory: &'a mut Inventory,
    pub jukebox: &'a mut dyn Jukebox,
    pub translator: &'a dyn Translator,
    pub rng: &'a mut dyn RngCore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugFlags {
    pub enabled: bool,
    pub collisions: bool,
    pub layers: [bool; 3],
}

impl Default for DebugFlags {
    fn default() -> Self {
        Self {
            enabled: false,
            collisions: false,
            layers: [true; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ElementCounter {
    frame: u32,
    ticks: u32,
}

impl ElementCounter {
    fn advance(&mut self, frame_count: u32, ticks_per_frame: u32) {
        self.ticks += 1;
        if self.ticks < ticks_per_frame.max(1) {
            return;
        }
        self.ticks = 0;
        self.frame += 1;
        if self.frame >= frame_count {
            self.frame = 0;
        }
    }
}

pub struct Overworld {
    current: MapId,
    camera: Camera,
    dialog: Option<Dialog>,
    dialog_config: DialogConfig,
    battle: Option<EventHandle>,
    fade: FadeTransition,
    fade_started: bool,
    element_counters: BTreeMap<String, ElementCounter>,
    debug: DebugFlags,
    intents: IntentQueue,
    tick: u64,
}

impl Overworld {
    /// Opens `start` with the camera on the player and the map's music playing.
    pub fn new(
        start: MapId,
        maps: &MapStore,
        player: &PlayerEvent,
        jukebox: &mut dyn Jukebox,
        dialog_config: DialogConfig,
    ) -> Result<Self, OverworldError> {
        let map = maps
            .get(&start)
            .ok_or_else(|| OverworldError::UnknownMap(start.clone()))?;
        let mut camera = Camera::default();
        camera.reset(player.center());
        camera.update(player.center(), map.grid().pixel_size(), map.is_indoor());
        jukebox.play(map.music());
        info!(
            map = %start,
            x = player.tile().x,
            y = player.tile().y,
            "overworld_opened"
        );

        Ok(Self {
            current: start,
            camera,
            dialog: None,
            dialog_config,
            battle: None,
            fade: FadeTransition::default(),
            fade_started: false,
            element_counters: BTreeMap::new(),
            debug: DebugFlags::default(),
            intents: IntentQueue::default(),
            tick: 0,
        })
    }

    pub fn current_map(&self) -> &MapId {
        &self.current
    }

    #[cfg(test)]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[cfg(test)]
    pub fn fade(&self) -> &FadeTransition {
        &self.fade
    }

    #[cfg(test)]
    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn debug_flags(&self) -> DebugFlags {
        self.debug
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn element_frame(&self, element_id: &str) -> u32 {
        self.element_counters
            .get(element_id)
            .map_or(0, |counter| counter.frame)
    }

    pub fn update(
        &mut self,
        ctx: &mut OverworldContext<'_>,
    ) -> Result<OverworldCommand, OverworldError> {
        if self.fade_started {
            ctx.player.set_anim_start_tick(self.tick);
            self.fade_started = false;
        }

        self.tick += 1;
        self.apply_debug_toggles(ctx.input);
        if self.debug.enabled && self.tick % DEBUG_LOG_INTERVAL_TICKS == 0 {
            let pixel = ctx.player.pixel();
            debug!(
                tick = self.tick,
                map = %self.current,
                tile_x = ctx.player.tile().x,
                tile_y = ctx.player.tile().y,
                px_x = pixel.x,
                px_y = pixel.y,
                facing = ctx.player.facing().label(),
                moving = ctx.player.is_moving(),
                in_dialog = self.is_in_dialog(),
                "overworld_debug_tick"
            );
        }

        let in_dialog = self.is_in_dialog();
        if in_dialog {
            if let Some(dialog) = self.dialog.as_mut() {
                dialog.tick();
            }
        }

        let map = ctx
            .maps
            .get_mut(&self.current)
            .ok_or_else(|| OverworldError::UnknownMap(self.current.clone()))?;
        let map_music = map.music().to_string();
        if self.camera.is_locked() {
            if let Some(side) = ctx.input.direction {
                self.move_camera(side);
            }
        } else {
            self.camera
                .update(ctx.player.center(), map.grid().pixel_size(), map.is_indoor());
        }

        let (grid, events) = map.split_mut();
        let mut occupancy = Occupancy::from_events(events, Some(ctx.player.tile()));
        let player_bottom = ctx.player.sprite_bottom();
        for (index, event) in events.iter_mut().enumerate() {
            if event.pixel().y + TILE_SIZE_F32 <= player_bottom {
                event.update(&mut EventUpdateContext {
                    tick: self.tick,
                    index,
                    grid,
                    occupancy: &mut occupancy,
                    player_tile: ctx.player.tile(),
                    dialog_over: !in_dialog,
                    rng: &mut *ctx.rng,
                });
            }
        }

        let mut interact = ctx.input.interact;
        if in_dialog && interact {
            if let Some(dialog) = self.dialog.as_mut() {
                dialog.advance();
            }
            interact = false;
        }
        let direction = if self.camera.is_locked() {
            None
        } else {
            ctx.input.direction
        };
        let can_trigger = !in_dialog && !ctx.player.is_locked();
        PlayerPhase {
            map_id: &self.current,
            grid,
            events: &mut *events,
            occupancy: &mut occupancy,
            player: &mut *ctx.player,
            direction,
            interact,
            can_trigger,
            inventory: &*ctx.inventory,
            translator: ctx.translator,
            intents: &mut self.intents,
        }
        .run();

        let mut command = OverworldCommand::Continue;
        for intent in self.intents.drain_current_tick() {
            if let Some(handle) = self.apply_intent(
                intent,
                &mut *ctx.player,
                &mut *ctx.inventory,
                &mut *ctx.jukebox,
                &map_music,
            )? {
                command = OverworldCommand::EnterBattle(handle);
            }
        }

        let dialog_over = !self.is_in_dialog();
        occupancy.set_player(ctx.player.tile());
        for (index, event) in events.iter_mut().enumerate() {
            event.update(&mut EventUpdateContext {
                tick: self.tick,
                index,
                grid,
                occupancy: &mut occupancy,
                player_tile: ctx.player.tile(),
                dialog_over,
                rng: &mut *ctx.rng,
            });
        }

        for element in map.elements() {
            self.element_counters
                .entry(element.id.clone())
                .or_default()
                .advance(element.frame_count, element.ticks_per_frame);
        }

        match self.fade.tick() {
            FadeStep::Swap(target) => {
                if let Some(left) = ctx.maps.get_mut(&self.current) {
                    left.rearm_zones();
                }
                self.tp_no_anim(target, &*ctx.maps, &mut *ctx.player, &mut *ctx.jukebox)?
            }
            FadeStep::Finished => {
                ctx.player.unlock();
                debug!(map = %self.current, "teleport_finished");
            }
            FadeStep::None => {}
        }

        if ctx.input.pause && command == OverworldCommand::Continue && !self.fade.is_active() {
            command = OverworldCommand::Paused;
        }
        Ok(command)
    }

    fn apply_intent(
        &mut self,
        intent: OverworldIntent,
        player: &mut PlayerEvent,
        inventory: &mut Inventory,
        jukebox: &mut dyn Jukebox,
        map_music: &str,
    ) -> Result<Option<EventHandle>, OverworldError> {
        debug!(intent = intent.label(), "overworld_intent_applied");
        match intent {
            OverworldIntent::StartDialog(lines) => self.start_dialog(lines),
            OverworldIntent::Teleport(target) => self.tp(target, player),
            OverworldIntent::DeclareBattle(handle) => {
                self.declare_battle(handle.clone())?;
                return Ok(Some(handle));
            }
            OverworldIntent::PlayMusic(music) => jukebox.play(&music),
            OverworldIntent::RestoreMapMusic => jukebox.play(map_music),
            OverworldIntent::PlaySound(sound) => jukebox.play_sound(&sound),
            OverworldIntent::StopSound(sound) => jukebox.stop_sound(&sound),
            OverworldIntent::ConsumeItem(item) => {
                if inventory.consume(&item) {
                    info!(item = item.as_str(), left = inventory.count(&item), "item_consumed");
                } else {
                    warn!(item = item.as_str(), "item_consume_without_item");
                }
            }
        }
        Ok(None)
    }

    /// Starts a fade toward `target`; the map swap happens at full black.
    pub fn tp(&mut self, target: TeleportTarget, player: &mut PlayerEvent) {
        let (map, x, y) = (target.map.clone(), target.tile.x, target.tile.y);
        if !self.fade.start(target) {
            warn!(map = %map, "teleport_ignored_during_fade");
            return;
        }
        player.lock();
        self.fade_started = true;
        info!(map = %map, x, y, "teleport_started");
    }

    /// Swaps map and player placement immediately.
    pub fn tp_no_anim(
        &mut self,
        target: TeleportTarget,
        maps: &MapStore,
        player: &mut PlayerEvent,
        jukebox: &mut dyn Jukebox,
    ) -> Result<(), OverworldError> {
        let map = maps
            .get(&target.map)
            .ok_or_else(|| OverworldError::UnknownMap(target.map.clone()))?;
        if !map.grid().contains(target.tile) {
            return Err(OverworldError::TargetOutOfBounds {
                map: target.map,
                tile: target.tile,
            });
        }
        player.place(target.tile, target.facing);
        self.camera.reset(player.center());
        jukebox.play(map.music());
        info!(
            from = %self.current,
            to = %target.map,
            x = target.tile.x,
            y = target.tile.y,
            "map_swapped"
        );
        self.current = target.map;
        Ok(())
    }

    pub fn start_dialog(&mut self, lines: Vec<String>) {
        if self.is_in_dialog() {
            warn!(lines = lines.len(), "dialog_replaced_unfinished");
        }
        self.dialog = Some(Dialog::new(lines, self.dialog_config));
    }

    pub fn is_dialog_over(&self) -> bool {
        self.dialog.as_ref().map_or(true, Dialog::is_over)
    }

    fn is_in_dialog(&self) -> bool {
        !self.is_dialog_over()
    }

    pub fn declare_battle(&mut self, handle: EventHandle) -> Result<(), OverworldError> {
        if let Some(declared) = &self.battle {
            return Err(OverworldError::BattleAlreadyDeclared {
                declared: declared.clone(),
                requested: handle,
            });
        }
        info!(battle = %handle, "battle_declared");
        self.battle = Some(handle);
        Ok(())
    }

    /// Called by the battle resolver once the battle is over.
    pub fn end_battle(&mut self, maps: &mut MapStore) {
        let Some(handle) = self.battle.take() else {
            warn!("end_battle_without_battle");
            return;
        };
        let marked = maps
            .event_mut(&handle)
            .map(MapEvent::set_battle_over)
            .unwrap_or(false);
        if !marked {
            warn!(battle = %handle, "battle_event_missing");
        }
        info!(battle = %handle, "battle_ended");
    }

    pub fn is_in_battle(&self) -> bool {
        self.battle.is_some()
    }

    pub fn battle_declared(&self) -> Option<&EventHandle> {
        self.battle.as_ref()
    }

    pub fn set_music(&self, jukebox: &mut dyn Jukebox, music: &str) {
        jukebox.play(music);
    }

    pub fn pause(&self, jukebox: &mut dyn Jukebox) {
        jukebox.pause();
    }

    /// Resumes the current map's music.
    pub fn play(&self, jukebox: &mut dyn Jukebox, maps: &MapStore) {
        if let Some(map) = maps.get(&self.current) {
            jukebox.play(map.music());
        }
    }

    pub fn set_camera_lock(&mut self, locked: bool) {
        if locked {
            self.camera.lock();
        } else {
            self.camera.unlock();
        }
    }

    pub fn move_camera(&mut self, side: Side) {
        self.camera.move_by(side);
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug.enabled = enabled;
    }

    pub fn set_print_collisions(&mut self, enabled: bool) {
        self.debug.collisions = enabled;
    }

    pub fn set_layer_visible(&mut self, slot: LayerSlot, visible: bool) {
        self.debug.layers[slot.index()] = visible;
    }

    fn apply_debug_toggles(&mut self, input: &OverworldInput) {
        if input.toggle_debug {
            self.debug.enabled = !self.debug.enabled;
            info!(enabled = self.debug.enabled, "debug_mode_toggled");
        }
        if !self.debug.enabled {
            return;
        }
        if input.toggle_collisions {
            self.set_print_collisions(!self.debug.collisions);
        }
        for slot in LayerSlot::ALL {
            if input.toggle_layers[slot.index()] {
                self.set_layer_visible(slot, !self.debug.layers[slot.index()]);
            }
        }
        if input.toggle_camera_lock {
            let locked = !self.camera.is_locked();
            self.set_camera_lock(locked);
            info!(locked, "camera_lock_toggled");
        }
    }

    /// Read-only draw pass in painter's order.
    pub fn draw<'a>(&'a self, maps: &'a MapStore, player: &'a PlayerEvent) -> DrawList<'a> {
        let mut list = DrawList::new(self.camera.center(), self.camera.size());
        list.push(DrawItem::Clear);
        let Some(map) = maps.get(&self.current) else {
            return list;
        };
        let grid = map.grid();
        let layer = |slot: LayerSlot| {
            let visible = !self.debug.enabled || self.debug.layers[slot.index()];
            visible.then(|| DrawItem::Layer {
                slot,
                grid,
                tileset: map.tileset(),
            })
        };

        list.items.extend(layer(LayerSlot::Bottom));
        list.items.extend(layer(LayerSlot::Mid));

        let player_bottom = player.sprite_bottom();
        let sprites: Vec<(f32, DrawItem<'a>)> = map
            .events()
            .iter()
            .filter_map(|event| {
                let (sheet, frame) = event.current_frame()?;
                let position = event.pixel();
                Some((
                    position.y + TILE_SIZE_F32,
                    DrawItem::Sprite {
                        sheet,
                        frame,
                        position,
                    },
                ))
            })
            .collect();
        let (under, above): (Vec<_>, Vec<_>) = sprites
            .into_iter()
            .partition(|(bottom, _)| *bottom <= player_bottom);
        list.items.extend(under.into_iter().map(|(_, item)| item));
        list.push(DrawItem::Sprite {
            sheet: player.sheet(),
            frame: player.sprite_frame(),
            position: player.pixel(),
        });
        list.items.extend(above.into_iter().map(|(_, item)| item));

        if self.debug.enabled && self.debug.collisions {
            list.push(DrawItem::CollisionOverlay { grid });
        }
        list.items.extend(layer(LayerSlot::Top));

        for element in map.elements() {
            list.push(DrawItem::Sprite {
                sheet: &element.sheet,
                frame: self.element_frame(&element.id),
                position: element.position,
            });
        }

        if let Some(dialog) = self.dialog.as_ref().filter(|dialog| !dialog.is_over()) {
            list.push(DrawItem::DialogBox {
                text: dialog.visible_text(),
                awaiting_input: dialog.phase() == DialogPhase::LineComplete,
            });
        }
        list.push(DrawItem::FadeOverlay {
            alpha: self.fade.alpha(),
        });
        if self.debug.enabled {
            list.push(DrawItem::DebugText {
                lines: self.debug_lines(map, player),
            });
        }
        list
    }

    fn debug_lines(&self, map: &Map, player: &PlayerEvent) -> Vec<String> {
        let tile = player.tile();
        let pixel = player.pixel();
        vec![
            "Debug mode".to_string(),
            format!("Map: {} ({}x{})", map.id(), map.grid().width(), map.grid().height()),
            format!("Tick: {}", self.tick),
            match self.dialog.as_ref().filter(|dialog| !dialog.is_over()) {
                Some(dialog) => format!(
                    "Loop: Dialog ({}/{})",
                    dialog.line_index() + 1,
                    dialog.line_count()
                ),
                None => "Loop: Normal".to_string(),
            },
            format!("Position: {} - {}", tile.x, tile.y),
            format!("PxPosition: {} - {}", pixel.x, pixel.y),
            format!("Facing: {}", player.facing().label()),
            format!("Moving: {}", player.is_moving()),
            format!("Anim start: {}", player.anim_start_tick()),
        ]
    }
}

/// Player movement and trigger evaluation for one tick.
struct PlayerPhase<'a> {
    map_id: &'a MapId,
    grid: &'a MapGrid,
    events: &'a mut [MapEvent],
    occupancy: &'a mut Occupancy,
    player: &'a mut PlayerEvent,
    direction: Option<Side>,
    interact: bool,
    can_trigger: bool,
    inventory: &'a Inventory,
    translator: &'a dyn Translator,
    intents: &'a mut IntentQueue,
}

impl PlayerPhase<'_> {
    fn run(mut self) {
        if self.player.is_moving() {
            self.player.mover_mut().advance();
        }
        if !self.can_trigger {
            if let (Some(side), false) = (self.direction, self.player.is_moving()) {
                self.player.face(side);
            }
            return;
        }

        let tile = self.player.tile();
        if let Some(index) = self.area_trigger(tile) {
            self.fire(index);
        }
        if self.player.is_moving() {
            return;
        }

        if self.interact {
            let facing = self.player.facing();
            if let Some(index) = self.first_match(Trigger::Press, tile.step(facing), facing.opposite()) {
                self.fire(index);
                return;
            }
        }

        let Some(direction) = self.direction else {
            return;
        };
        let occupancy = &*self.occupancy;
        let started = self
            .player
            .mover_mut()
            .try_start_step(direction, self.grid, |dest| occupancy.blocked_for_player(dest));
        if !started {
            return;
        }
        let dest = self.player.tile();
        self.occupancy.set_player(dest);
        if let Some(index) = self.first_match(Trigger::GoIn, dest, direction.opposite()) {
            self.fire(index);
        }
    }

    /// First zone or be-in event that fires for `tile`, in map order.
    /// Every zone latch is polled, including those after the winner.
    fn area_trigger(&mut self, tile: TilePos) -> Option<usize> {
        let mut chosen = None;
        for (index, event) in self.events.iter_mut().enumerate() {
            let fires = match event.trigger() {
                Trigger::Zone => event.poll_zone(tile, chosen.is_none()),
                Trigger::BeIn => event.tile() == tile,
                Trigger::Press | Trigger::GoIn => false,
            };
            if fires && chosen.is_none() {
                chosen = Some(index);
            }
        }
        chosen
    }

    fn first_match(&self, trigger: Trigger, tile: TilePos, side: Side) -> Option<usize> {
        self.events.iter().position(|event| {
            event.trigger() == trigger && event.tile() == tile && event.sides().allows(side)
        })
    }

    fn fire(&mut self, index: usize) {
        let mut ctx = ActionContext {
            handle: EventHandle {
                map: self.map_id.clone(),
                index,
            },
            player_facing: self.player.facing(),
            inventory: self.inventory,
            translator: self.translator,
            intents: &mut *self.intents,
        };
        self.events[index].action(&mut ctx);
    }
}
