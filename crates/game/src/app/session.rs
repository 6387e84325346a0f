use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use engine::{Canvas, InputAction, InputSnapshot, Scene, SceneCommand, SpriteAtlas};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use super::overworld::{
    CollisionCategory, DialogConfig, EventHandle, EventKind, Inventory, LoggingJukebox, MapId,
    MapStore, Overworld, OverworldCommand, OverworldContext, OverworldError, OverworldInput,
    PlayerEvent, Side, TableTranslator, TilePos,
};
use super::render;

pub(crate) const LANG_ENV_VAR: &str = "OVERWORLD_LANG";
const BATTLE_MUSIC: &str = "battle";
const DEFAULT_PLAYER_SHEET: &str = "characters/player";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session config {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid session config {path} at {at}: {message}")]
    ParseConfig {
        path: PathBuf,
        at: String,
        message: String,
    },
    #[error("start map '{0}' is not loaded")]
    UnknownStartMap(String),
    #[error("start tile {tile} is outside map '{map}'")]
    StartOutOfBounds { map: String, tile: TilePos },
    #[error("start tile {tile} on map '{map}' is not walkable ({category:?})")]
    StartBlocked {
        map: String,
        tile: TilePos,
        category: CollisionCategory,
    },
    #[error(transparent)]
    Overworld(#[from] OverworldError),
}

/// Contents of `assets/session.json`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub start_map: String,
    pub start_tile: TilePos,
    pub start_facing: Side,
    pub player_sheet: String,
    pub items: BTreeMap<String, u32>,
    pub skip_dialog_reveal: bool,
    pub debug: bool,
    pub language: String,
    pub rng_seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_map: "town".to_string(),
            start_tile: TilePos::new(5, 5),
            start_facing: Side::Down,
            player_sheet: DEFAULT_PLAYER_SHEET.to_string(),
            items: BTreeMap::new(),
            skip_dialog_reveal: false,
            debug: false,
            language: "en".to_string(),
            rng_seed: None,
        }
    }
}

impl SessionConfig {
    /// A missing file is not an error: the defaults are used and a warning is logged.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        if !path.is_file() {
            warn!(path = %path.display(), "session_config_missing_using_defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path).map_err(|source| SessionError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &raw)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self, SessionError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            let at = error.path().to_string();
            SessionError::ParseConfig {
                path: path.to_path_buf(),
                at: if at.is_empty() { ".".to_string() } else { at },
                message: error.into_inner().to_string(),
            }
        })
    }

    /// `OVERWORLD_LANG` wins over the configured language.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(language) = std::env::var(LANG_ENV_VAR) {
            let language = language.trim();
            if !language.is_empty() {
                info!(language, "language_overridden_from_env");
                self.language = language.to_string();
            }
        }
    }

    fn dialog_config(&self) -> DialogConfig {
        DialogConfig {
            skip_reveal: self.skip_dialog_reveal,
        }
    }
}

/// Combat collaborator. The session starts it on a declared battle and polls it each tick.
pub trait BattleResolver {
    fn start(&mut self, handle: &EventHandle, team_id: &str);
    /// Returns true on the tick the battle is decided.
    fn update(&mut self, input: &InputSnapshot) -> bool;
    fn status_line(&self) -> String;
}

/// Stand-in resolver without combat rules: the battle is won as soon as the player interacts.
#[derive(Debug, Default)]
pub struct PlaceholderBattle {
    team: Option<String>,
    ticks: u64,
}

impl BattleResolver for PlaceholderBattle {
    fn start(&mut self, handle: &EventHandle, team_id: &str) {
        info!(battle = %handle, team = team_id, "placeholder_battle_started");
        self.team = Some(team_id.to_string());
        self.ticks = 0;
    }

    fn update(&mut self, input: &InputSnapshot) -> bool {
        self.ticks += 1;
        if !input.pressed(InputAction::Interact) {
            return false;
        }
        info!(
            team = self.team.as_deref().unwrap_or_default(),
            ticks = self.ticks,
            "placeholder_battle_won"
        );
        self.team = None;
        true
    }

    fn status_line(&self) -> String {
        match &self.team {
            Some(team) => format!("Battle against {team}"),
            None => "Battle".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Overworld,
    Battle,
    Paused,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionMode::Overworld => "overworld",
            SessionMode::Battle => "battle",
            SessionMode::Paused => "paused",
        })
    }
}

/// Long-lived game state: the overworld plus everything it borrows each tick.
pub struct GameSession {
    maps: MapStore,
    player: PlayerEvent,
    inventory: Inventory,
    overworld: Overworld,
    jukebox: LoggingJukebox,
    translator: TableTranslator,
    battle: Box<dyn BattleResolver>,
    rng: StdRng,
    mode: SessionMode,
}

impl GameSession {
    pub fn new(
        config: &SessionConfig,
        maps: MapStore,
        translator: TableTranslator,
        battle: Box<dyn BattleResolver>,
    ) -> Result<Self, SessionError> {
        let start = MapId::new(config.start_map.as_str());
        let map = maps
            .get(&start)
            .ok_or_else(|| SessionError::UnknownStartMap(config.start_map.clone()))?;
        if !map.grid().contains(config.start_tile) {
            return Err(SessionError::StartOutOfBounds {
                map: config.start_map.clone(),
                tile: config.start_tile,
            });
        }
        let category = map.grid().collision(config.start_tile);
        if Side::ALL.into_iter().all(|side| category.blocks(side)) {
            return Err(SessionError::StartBlocked {
                map: config.start_map.clone(),
                tile: config.start_tile,
                category,
            });
        }

        let player = PlayerEvent::new(
            config.start_tile,
            config.start_facing,
            config.player_sheet.as_str(),
        );
        let inventory: Inventory = config
            .items
            .iter()
            .map(|(item, count)| (item.as_str(), *count))
            .collect();
        let mut jukebox = LoggingJukebox::default();
        let mut overworld = Overworld::new(
            start,
            &maps,
            &player,
            &mut jukebox,
            config.dialog_config(),
        )?;
        overworld.set_debug_mode(config.debug);
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        info!(
            map = %config.start_map,
            maps = maps.len(),
            items = inventory.iter().count(),
            language = translator.lang(),
            "session_created"
        );
        Ok(Self {
            maps,
            player,
            inventory,
            overworld,
            jukebox,
            translator,
            battle,
            rng,
            mode: SessionMode::Overworld,
        })
    }

    #[cfg(test)]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[cfg(test)]
    pub fn overworld(&self) -> &Overworld {
        &self.overworld
    }

    #[cfg(test)]
    pub fn maps(&self) -> &MapStore {
        &self.maps
    }

    #[cfg(test)]
    pub fn player(&self) -> &PlayerEvent {
        &self.player
    }

    #[cfg(test)]
    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    #[cfg(test)]
    pub fn jukebox(&self) -> &LoggingJukebox {
        &self.jukebox
    }

    /// One fixed tick. A fatal overworld error aborts the scene.
    pub fn step(&mut self, input: &InputSnapshot) -> Result<(), SessionError> {
        match self.mode {
            SessionMode::Overworld => self.step_overworld(input)?,
            SessionMode::Battle => {
                if self.battle.update(input) {
                    self.overworld.end_battle(&mut self.maps);
                    self.overworld.play(&mut self.jukebox, &self.maps);
                    self.set_mode(SessionMode::Overworld);
                }
            }
            SessionMode::Paused => {
                if input.pressed(InputAction::Pause) {
                    self.overworld.play(&mut self.jukebox, &self.maps);
                    self.set_mode(SessionMode::Overworld);
                }
            }
        }
        Ok(())
    }

    fn step_overworld(&mut self, input: &InputSnapshot) -> Result<(), SessionError> {
        let overworld_input = OverworldInput::from_snapshot(input);
        let command = self.overworld.update(&mut OverworldContext {
            maps: &mut self.maps,
            player: &mut self.player,
            input: &overworld_input,
            inventory: &mut self.inventory,
            jukebox: &mut self.jukebox,
            translator: &self.translator,
            rng: &mut self.rng,
        })?;

        match command {
            OverworldCommand::Continue => {}
            OverworldCommand::EnterBattle(handle) => {
                let team = match self.maps.event(&handle).map(|event| event.kind()) {
                    Some(EventKind::Battle { team_id, .. }) => team_id.clone(),
                    _ => String::new(),
                };
                self.overworld.set_music(&mut self.jukebox, BATTLE_MUSIC);
                self.battle.start(&handle, &team);
                self.set_mode(SessionMode::Battle);
            }
            OverworldCommand::Paused => {
                self.overworld.pause(&mut self.jukebox);
                self.set_mode(SessionMode::Paused);
            }
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: SessionMode) {
        if self.mode != mode {
            info!(from = %self.mode, to = %mode, "session_mode_changed");
            self.mode = mode;
        }
    }
}

impl Scene for GameSession {
    fn load(&mut self) {
        self.overworld.play(&mut self.jukebox, &self.maps);
        info!(map = %self.overworld.current_map(), "session_loaded");
    }

    fn update(&mut self, _fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }
        match self.step(input) {
            Ok(()) => SceneCommand::None,
            Err(err) => {
                error!(error = %err, tick = self.overworld.tick(), "session_tick_failed");
                SceneCommand::Abort(err.to_string())
            }
        }
    }

    fn render(&self, canvas: &mut Canvas<'_>, sprites: &SpriteAtlas) {
        let list = self.overworld.draw(&self.maps, &self.player);
        render::draw_overworld(canvas, sprites, &list);
        match self.mode {
            SessionMode::Overworld => {}
            SessionMode::Paused => render::draw_banner(canvas, "Paused", "Press P to resume"),
            SessionMode::Battle => {
                render::draw_banner(canvas, &self.battle.status_line(), "Press E to win")
            }
        }
    }

    fn unload(&mut self) {
        self.overworld.pause(&mut self.jukebox);
        info!(
            ticks = self.overworld.tick(),
            map = %self.overworld.current_map(),
            "session_unloaded"
        );
    }

    fn debug_title(&self) -> Option<String> {
        let tile = self.player.tile();
        let mut title = format!(
            "{} | {} | ({}, {})",
            self.mode,
            self.overworld.current_map(),
            tile.x,
            tile.y
        );
        if let Some(battle) = self
            .overworld
            .battle_declared()
            .filter(|_| self.overworld.is_in_battle())
        {
            title.push_str(&format!(" | battle {battle}"));
        }
        if self.overworld.debug_flags().enabled {
            title.push_str(" | debug");
        }
        Some(title)
    }
}
