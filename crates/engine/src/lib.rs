use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod assets;

pub use app::{
    run_app, text_width_px, world_to_screen_px, wrap_text, AppError, Canvas, InputAction,
    InputSnapshot, LoopConfig, LoopStats, Renderer, Scene, SceneCommand, Vec2, Viewport,
    GLYPH_ADVANCE, LINE_ADVANCE, SLOW_FRAME_ENV_VAR, TEXT_SCALE,
};
pub use assets::{
    validate_sprite_key, AssetError, SpriteAtlas, SpriteKeyError, SpriteSheet, StringTable,
    StringTableError,
};

pub const ROOT_ENV_VAR: &str = "OVERWORLD_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub maps_dir: PathBuf,
    pub sprites_dir: PathBuf,
    pub strings_dir: PathBuf,
}

impl AppPaths {
    pub fn from_root(root: PathBuf) -> Self {
        let assets_dir = root.join("assets");
        Self {
            maps_dir: assets_dir.join("maps"),
            sprites_dir: assets_dir.join("sprites"),
            strings_dir: assets_dir.join("strings"),
            assets_dir,
            root,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{var} is not valid unicode: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to locate the running executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("OVERWORLD_ROOT={path} has no assets/maps directory")]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "no directory with assets/maps found above {exe_dir} or {cwd}; \
set OVERWORLD_ROOT to the game root"
    )]
    RootNotFound { exe_dir: PathBuf, cwd: PathBuf },
}

/// Finds the game root: `OVERWORLD_ROOT` if set, otherwise the first ancestor of the
/// executable, then of the working directory, that holds `assets/maps`.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let path = canonical(Path::new(&value));
            if !has_content(&path) {
                return Err(StartupError::InvalidEnvRoot { path });
            }
            path
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe.parent().map(Path::to_path_buf).unwrap_or_default();
            let cwd = env::current_dir().unwrap_or_default();
            search_upward(&[exe_dir.as_path(), cwd.as_path()])
                .ok_or(StartupError::RootNotFound { exe_dir, cwd })?
        }
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            })
        }
    };
    Ok(AppPaths::from_root(root))
}

fn search_upward(starts: &[&Path]) -> Option<PathBuf> {
    starts
        .iter()
        .flat_map(|start| start.ancestors())
        .find(|candidate| has_content(candidate))
        .map(canonical)
}

fn has_content(path: &Path) -> bool {
    path.join("assets").join("maps").is_dir()
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
