use engine::{
    resolve_app_paths, AppPaths, AssetError, LoopConfig, Scene, SpriteAtlas, StartupError,
    StringTable, StringTableError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::data::MapLoadError;
use super::overworld::{MapStore, TableTranslator, TILE_SIZE};
use super::session::{GameSession, PlaceholderBattle, SessionConfig, SessionError};

const SESSION_CONFIG_FILE: &str = "session.json";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
    pub(crate) sprites: SpriteAtlas,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Strings(#[from] StringTableError),
    #[error(transparent)]
    Maps(#[from] MapLoadError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Everything loaded from `assets/` before the loop starts.
struct Content {
    session_config: SessionConfig,
    session: GameSession,
    sprites: SpriteAtlas,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Overworld Startup ===");

    let paths = resolve_app_paths()?;
    info!(root = %paths.root.display(), "app_paths_resolved");
    let content = load_content(&paths, true)?;

    let config = LoopConfig {
        window_title: format!("Overworld {}", env!("CARGO_PKG_VERSION")),
        metrics_overlay_visible: content.session_config.debug,
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        config,
        scene: Box::new(content.session),
        sprites: content.sprites,
    })
}

fn load_content(paths: &AppPaths, env_overrides: bool) -> Result<Content, BootstrapError> {
    let mut session_config = SessionConfig::load(&paths.assets_dir.join(SESSION_CONFIG_FILE))?;
    if env_overrides {
        session_config.apply_env_overrides();
    }

    let strings_path = paths
        .strings_dir
        .join(format!("{}.xml", session_config.language));
    let strings = StringTable::load(&strings_path)?;
    let maps = MapStore::load_dir(&paths.maps_dir)?;

    let frame = TILE_SIZE as u32;
    let mut sprites = SpriteAtlas::new(paths.sprites_dir.clone());
    for key in maps.sprite_keys() {
        sprites.load(key, frame, frame)?;
    }
    sprites.load(&session_config.player_sheet, frame, frame)?;
    info!(sheets = sprites.len(), "sprites_preloaded");

    let session = GameSession::new(
        &session_config,
        maps,
        TableTranslator::new(strings),
        Box::new(PlaceholderBattle::default()),
    )?;

    Ok(Content {
        session_config,
        session,
        sprites,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
