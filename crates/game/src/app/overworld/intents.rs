use super::geometry::{Side, TilePos};
use super::map::{EventHandle, MapId};

/// Destination of a teleport or door. `facing: None` keeps the current facing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeleportTarget {
    pub map: MapId,
    pub tile: TilePos,
    pub facing: Option<Side>,
}

/// Requests emitted by event actions and applied by the overworld after the trigger phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverworldIntent {
    StartDialog(Vec<String>),
    Teleport(TeleportTarget),
    DeclareBattle(EventHandle),
    PlayMusic(String),
    RestoreMapMusic,
    PlaySound(String),
    StopSound(String),
    ConsumeItem(String),
}

impl OverworldIntent {
    pub fn label(&self) -> &'static str {
        match self {
            Self::StartDialog(_) => "start_dialog",
            Self::Teleport(_) => "teleport",
            Self::DeclareBattle(_) => "declare_battle",
            Self::PlayMusic(_) => "play_music",
            Self::RestoreMapMusic => "restore_map_music",
            Self::PlaySound(_) => "play_sound",
            Self::StopSound(_) => "stop_sound",
            Self::ConsumeItem(_) => "consume_item",
        }
    }
}

#[derive(Debug, Default)]
pub struct IntentQueue {
    intents: Vec<OverworldIntent>,
}

impl IntentQueue {
    pub fn enqueue(&mut self, intent: OverworldIntent) {
        self.intents.push(intent);
    }

    pub fn drain_current_tick(&mut self) -> Vec<OverworldIntent> {
        std::mem::take(&mut self.intents)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.intents.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}
