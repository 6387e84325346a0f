mod camera;
mod context;
mod dialog;
mod draw;
mod events;
mod fade;
mod geometry;
mod intents;
mod map;
mod movement;
mod player;
mod world;


pub(crate) use context::{Inventory, LoggingJukebox, TableTranslator};
pub(crate) use dialog::DialogConfig;
pub(crate) use draw::{DrawItem, DrawList};
pub(crate) use events::{DoorState, DoorType, EventKind, MapEvent, SpriteRef, Trigger};
pub(crate) use geometry::{Side, SideMask, TilePos, TILE_SIZE};
pub(crate) use intents::TeleportTarget;
pub(crate) use map::{
    AnimatedElement, CollisionCategory, EventHandle, LayerSlot, Map, MapError, MapGrid, MapId,
    MapProperties, MapStore,
};
pub(crate) use movement::{CharacterMotion, MoveStyle};
pub(crate) use player::PlayerEvent;
pub(crate) use world::{
    Overworld, OverworldCommand, OverworldContext, OverworldError, OverworldInput,
};
