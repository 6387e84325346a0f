use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use engine::StringTable;
use tracing::{debug, info, warn};

/// Audio collaborator. Playing the track that is already playing must not restart it.
pub trait Jukebox {
    fn play(&mut self, music: &str);
    fn pause(&mut self);
    fn play_sound(&mut self, sound: &str);
    fn stop_sound(&mut self, sound: &str);
}

/// Tracks what would be audible and logs every change. There is no audio device behind it.
#[derive(Debug, Default)]
pub struct LoggingJukebox {
    current: Option<String>,
    paused: bool,
    sounds: BTreeSet<String>,
    track_switches: u32,
}

impl LoggingJukebox {
    #[cfg(test)]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    #[cfg(test)]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[cfg(test)]
    pub fn is_sound_playing(&self, sound: &str) -> bool {
        self.sounds.contains(sound)
    }

    #[cfg(test)]
    pub fn track_switches(&self) -> u32 {
        self.track_switches
    }
}

impl Jukebox for LoggingJukebox {
    fn play(&mut self, music: &str) {
        if self.current.as_deref() == Some(music) {
            if self.paused {
                self.paused = false;
                info!(music, "music_resumed");
            }
            return;
        }
        self.current = Some(music.to_string());
        self.paused = false;
        self.track_switches = self.track_switches.saturating_add(1);
        info!(music, "music_started");
    }

    fn pause(&mut self) {
        if self.current.is_some() && !self.paused {
            self.paused = true;
            info!(music = self.current.as_deref().unwrap_or_default(), "music_paused");
        }
    }

    fn play_sound(&mut self, sound: &str) {
        self.sounds.insert(sound.to_string());
        debug!(sound, "sound_played");
    }

    fn stop_sound(&mut self, sound: &str) {
        if self.sounds.remove(sound) {
            debug!(sound, "sound_stopped");
        }
    }
}

/// Localization collaborator, consulted when a dialog is triggered.
pub trait Translator {
    fn resolve(&self, key: &str) -> String;
}

/// Resolves keys through a loaded string table. Unknown keys come back verbatim.
#[derive(Debug)]
pub struct TableTranslator {
    table: StringTable,
    warned: RefCell<HashSet<String>>,
}

impl TableTranslator {
    pub fn new(table: StringTable) -> Self {
        Self {
            table,
            warned: RefCell::new(HashSet::new()),
        }
    }

    pub fn lang(&self) -> &str {
        self.table.lang()
    }
}

impl Translator for TableTranslator {
    fn resolve(&self, key: &str) -> String {
        if let Some(text) = self.table.get(key) {
            return text.to_string();
        }
        if self.warned.borrow_mut().insert(key.to_string()) {
            warn!(key, lang = self.table.lang(), "translation_key_missing");
        }
        key.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    items: BTreeMap<String, u32>,
}

impl Inventory {
    pub fn has(&self, item: &str) -> bool {
        self.count(item) > 0
    }

    pub fn count(&self, item: &str) -> u32 {
        self.items.get(item).copied().unwrap_or(0)
    }

    pub fn add(&mut self, item: &str, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.items.entry(item.to_string()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Removes one unit. Returns `false` when none was held.
    pub fn consume(&mut self, item: &str) -> bool {
        match self.items.get_mut(item) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.items.remove(item);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.items.iter().map(|(item, count)| (item.as_str(), *count))
    }
}

impl<'a> FromIterator<(&'a str, u32)> for Inventory {
    fn from_iter<T: IntoIterator<Item = (&'a str, u32)>>(iter: T) -> Self {
        let mut inventory = Inventory::default();
        for (item, count) in iter {
            inventory.add(item, count);
        }
        inventory
    }
}
