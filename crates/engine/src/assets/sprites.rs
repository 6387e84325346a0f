use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{ImageError, ImageReader};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteKeyError {
    #[error("sprite key must not be empty")]
    Empty,
    #[error("sprite key must be relative")]
    Absolute,
    #[error("sprite key must not contain '..'")]
    ParentTraversal,
    #[error("sprite key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("invalid sprite key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: SpriteKeyError,
    },
    #[error("failed to open sprite sheet {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode sprite sheet {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ImageError,
    },
    #[error(
        "sprite sheet '{key}' is {width}x{height}, not a whole number of {frame_width}x{frame_height} frames"
    )]
    FrameGrid {
        key: String,
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
    },
}

/// Sprite keys are lowercase relative paths such as `characters/player`.
pub fn validate_sprite_key(key: &str) -> Result<(), SpriteKeyError> {
    if key.is_empty() {
        return Err(SpriteKeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(SpriteKeyError::Absolute);
    }
    if key.contains("..") {
        return Err(SpriteKeyError::ParentTraversal);
    }
    match key
        .chars()
        .find(|ch| !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-')))
    {
        Some(character) => Err(SpriteKeyError::InvalidCharacter { character }),
        None => Ok(()),
    }
}

/// RGBA image cut into a row-major grid of equally sized frames.
#[derive(Debug, Clone)]
pub struct SpriteSheet {
    width: u32,
    height: u32,
    frame_width: u32,
    frame_height: u32,
    rgba: Vec<u8>,
}

impl SpriteSheet {
    /// Returns `None` when the buffer or frame grid does not match the dimensions.
    pub fn from_rgba(
        width: u32,
        height: u32,
        frame_width: u32,
        frame_height: u32,
        rgba: Vec<u8>,
    ) -> Option<Self> {
        if frame_width == 0
            || frame_height == 0
            || width % frame_width != 0
            || height % frame_height != 0
            || rgba.len() != width as usize * height as usize * 4
        {
            return None;
        }
        Some(Self {
            width,
            height,
            frame_width,
            frame_height,
            rgba,
        })
    }

    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    pub fn columns(&self) -> u32 {
        self.width / self.frame_width
    }

    pub fn frame_count(&self) -> u32 {
        self.columns() * (self.height / self.frame_height)
    }

    pub fn frame_origin(&self, frame_index: u32) -> Option<(u32, u32)> {
        if frame_index >= self.frame_count() {
            return None;
        }
        let columns = self.columns();
        Some((
            (frame_index % columns) * self.frame_width,
            (frame_index / columns) * self.frame_height,
        ))
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let mut color = [0u8; 4];
        color.copy_from_slice(&self.rgba[offset..offset + 4]);
        Some(color)
    }
}

/// Sprite sheets loaded synchronously from `<root>/<key>.png`, keyed by sprite key.
#[derive(Debug)]
pub struct SpriteAtlas {
    root: PathBuf,
    sheets: HashMap<String, SpriteSheet>,
}

impl SpriteAtlas {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sheets: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&SpriteSheet> {
        self.sheets.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, sheet: SpriteSheet) {
        self.sheets.insert(key.into(), sheet);
    }

    /// Loads a sheet once; later calls with the same key are no-ops.
    pub fn load(&mut self, key: &str, frame_width: u32, frame_height: u32) -> Result<(), AssetError> {
        if self.sheets.contains_key(key) {
            debug!(sprite_key = key, "sprite_sheet_already_loaded");
            return Ok(());
        }
        validate_sprite_key(key).map_err(|source| AssetError::InvalidKey {
            key: key.to_string(),
            source,
        })?;

        let path = self.root.join(format!("{key}.png"));
        let reader = ImageReader::open(&path).map_err(|source| AssetError::Open {
            path: path.clone(),
            source,
        })?;
        let decoded = reader.decode().map_err(|source| AssetError::Decode {
            path: path.clone(),
            source,
        })?;
        let image = decoded.to_rgba8();
        let (width, height) = (image.width(), image.height());
        let sheet = SpriteSheet::from_rgba(width, height, frame_width, frame_height, image.into_raw())
            .ok_or_else(|| AssetError::FrameGrid {
                key: key.to_string(),
                width,
                height,
                frame_width,
                frame_height,
            })?;

        info!(
            sprite_key = key,
            path = %path.display(),
            frames = sheet.frame_count(),
            "sprite_sheet_loaded"
        );
        self.sheets.insert(key.to_string(), sheet);
        Ok(())
    }
}
