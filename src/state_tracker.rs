use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GamePhase {
    #[default]
    Unknown,
    TitleScreen,
    MainMenu,
    Overworld,
    Battle,
    Dialog,
    Menu,
    Inventory,
}

impl GamePhase {
    pub const ALL: [GamePhase; 8] = [
        GamePhase::Unknown,
        GamePhase::TitleScreen,
        GamePhase::MainMenu,
        GamePhase::Overworld,
        GamePhase::Battle,
        GamePhase::Dialog,
        GamePhase::Menu,
        GamePhase::Inventory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GamePhase::Unknown => "UNKNOWN",
            GamePhase::TitleScreen => "TITLE_SCREEN",
            GamePhase::MainMenu => "MAIN_MENU",
            GamePhase::Overworld => "OVERWORLD",
            GamePhase::Battle => "BATTLE",
            GamePhase::Dialog => "DIALOG",
            GamePhase::Menu => "MENU",
            GamePhase::Inventory => "INVENTORY",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GamePhase {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        GamePhase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| Error::UnknownPhase(s.to_string()))
    }
}

/// Serializable view of a tracker, also the on-disk layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub current_state: String,
    pub previous_state: String,
    pub data: Map<String, Value>,
}

/// Records the current game phase and free-form data attached to it.
///
/// Phases are set by the caller; nothing here inspects the screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateTracker {
    current: GamePhase,
    previous: GamePhase,
    data: Map<String, Value>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> GamePhase {
        self.current
    }

    pub fn previous(&self) -> GamePhase {
        self.previous
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn update_state<I, K>(&mut self, new_phase: GamePhase, aux_updates: I)
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.previous = self.current;
        self.current = new_phase;
        for (key, value) in aux_updates {
            self.data.insert(key.into(), value);
        }

        info!("State transition: {} -> {}", self.previous, self.current);
    }

    pub fn has_transitioned(&self) -> bool {
        self.current != self.previous
    }

    pub fn is_in_state(&self, phase: GamePhase) -> bool {
        self.current == phase
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            current_state: self.current.to_string(),
            previous_state: self.previous.to_string(),
            data: self.data.clone(),
        }
    }

    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| Error::MalformedState(e.to_string()))?;
        fs::write(path, text)?;
        info!("Saved state data to {}", path.display());
        Ok(())
    }

    /// Replaces the tracker contents with a record written by [`persist`](Self::persist).
    pub fn restore(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        *self = Self::from_json(&text)?;
        info!("Loaded state data from {}", path.display());
        Ok(())
    }

    fn from_json(text: &str) -> Result<Self> {
        let snapshot: StateSnapshot =
            serde_json::from_str(text).map_err(|e| Error::MalformedState(e.to_string()))?;

        Ok(Self {
            current: snapshot.current_state.parse()?,
            previous: snapshot.previous_state.parse()?,
            data: snapshot.data,
        })
    }
}
