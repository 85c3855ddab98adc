//! Configuration loading and management
//!
//! Handles parsing of `config.toml` in the data directory (`~/.kanban` by
//! default). A missing file means all defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::{Status, StatusSet};
use crate::project::default_palette;

pub const CONFIG_FILE: &str = "config.toml";
pub const DATA_FILE: &str = "board.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Board columns, in display order
    #[serde(default)]
    pub statuses: StatusSet,

    /// Colours assigned to projects
    #[serde(default = "default_palette")]
    pub palette: Vec<String>,

    /// Data file; relative paths are resolved against the config directory
    #[serde(default)]
    pub db: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            statuses: StatusSet::default(),
            palette: default_palette(),
            db: None,
        }
    }
}

impl Config {
    /// Load and validate a config file, falling back to defaults when absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for required in [Status::Todo, Status::Done] {
            if !self.statuses.contains(required) {
                return Err(Error::InvalidConfig(format!(
                    "statuses must include '{required}'"
                )));
            }
        }
        if self.palette.iter().all(|c| c.trim().is_empty()) {
            return Err(Error::InvalidConfig("palette cannot be empty".into()));
        }
        Ok(())
    }

    /// Data file location: `--db` wins, then the config value, then the
    /// default file next to the config.
    pub fn data_path(&self, base_dir: &Path, cli_override: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_override {
            return path.to_path_buf();
        }
        match &self.db {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => base_dir.join(path),
            None => base_dir.join(DATA_FILE),
        }
    }
}

/// `~/.kanban`, or `./.kanban` when no home directory is known.
pub fn default_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".kanban")
}
