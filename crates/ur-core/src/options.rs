//! Player-facing option flags and where they are kept.
//!
//! Options are stored as one JSON blob under [`OPTIONS_KEY`]. They are loaded
//! once at startup and saved on every change.

use crate::game::GameError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Storage key for the options blob
pub const OPTIONS_KEY: &str = "ur.options";

/// Flags read by the conditional states of the turn machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOptions {
    /// Pass the turn automatically when a roll has no legal moves
    #[serde(default)]
    pub autopass: bool,
    /// Throw the dice automatically at the start of each turn
    #[serde(default)]
    pub autoroll: bool,
}

impl GameOptions {
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        serde_json::from_str(json).map_err(|e| GameError::InvalidOptions(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, GameError> {
        serde_json::to_string(self).map_err(|e| GameError::InvalidOptions(e.to_string()))
    }

    /// Apply a checkbox change by option name.
    pub fn set(&mut self, name: &str, checked: bool) -> Result<(), GameError> {
        match name {
            "autopass" => self.autopass = checked,
            "autoroll" => self.autoroll = checked,
            _ => return Err(GameError::UnknownOption(name.to_string())),
        }
        Ok(())
    }

    /// Read options from `store`, falling back to defaults when absent or unreadable.
    pub fn load<S: OptionStore + ?Sized>(store: &S) -> Self {
        match store.load(OPTIONS_KEY) {
            Some(json) => Self::from_json(&json).unwrap_or_else(|e| {
                warn!("Ignoring stored options: {}", e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn save<S: OptionStore + ?Sized>(&self, store: &mut S) -> Result<(), GameError> {
        store.save(OPTIONS_KEY, &self.to_json()?)
    }
}

/// Key-value storage for persisted options
pub trait OptionStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), GameError>;
}

/// In-memory store, for tests and hosts that persist elsewhere
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `options`
    pub fn with_options(options: GameOptions) -> Result<Self, GameError> {
        let mut store = Self::new();
        options.save(&mut store)?;
        Ok(store)
    }
}

impl OptionStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), GameError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
