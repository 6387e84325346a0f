mod sprites;
mod strings;

pub use sprites::{validate_sprite_key, AssetError, SpriteAtlas, SpriteKeyError, SpriteSheet};
pub use strings::{StringTable, StringTableError};
