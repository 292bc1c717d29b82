//! Runner configuration from an optional `refresh.toml` at the repository root.
//!
//! Configuration only affects how steps are launched (which interpreter) and
//! whether runs are journaled. It never selects, skips or reorders steps.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::DEFAULT_INTERPRETER;

/// File name looked up in the repository root.
pub const CONFIG_FILE_NAME: &str = "refresh.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefreshConfig {
    /// Program used to run every step script.
    pub interpreter: String,
    /// Run history file (JSONL). Relative paths resolve against the repository root.
    pub history: Option<PathBuf>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interpreter: DEFAULT_INTERPRETER.to_string(),
            history: None,
        }
    }
}

impl RefreshConfig {
    /// Load `refresh.toml` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        if config.interpreter.trim().is_empty() {
            return Err(ConfigError::Invalid("interpreter must not be empty".into()));
        }
        Ok(config)
    }

    /// History file path resolved against `root`, if history is enabled.
    pub fn history_path(&self, root: &Path) -> Option<PathBuf> {
        self.history.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                root.join(p)
            }
        })
    }
}
