//! Engine configuration, read from a TOML file.

use crate::error::{Error, Result};
use crate::models::MasteryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SESSION_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Maximum cards per review session
    pub session_limit: usize,
    /// When a card counts as mastered in deck statistics
    pub mastery: MasteryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("flashcards.sqlite3"),
            session_limit: DEFAULT_SESSION_LIMIT,
            mastery: MasteryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
