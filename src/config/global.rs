//! Global configuration.
//!
//! Loaded from ~/.config/reviewr/reviewr.yml or .reviewr.yml

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::scheduler::SchedulerConfig;

/// Global configuration for Reviewr.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Scheduling engine parameters.
    pub scheduler: SchedulerConfig,

    /// Storage settings.
    pub storage: StorageConfig,
}

impl GlobalConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .reviewr.yml in current directory
    /// 3. ~/.config/reviewr/reviewr.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let config = Self::load_unvalidated(config_path)?;
        config.validate()?;
        Ok(config)
    }

    fn load_unvalidated(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let mut candidates = vec![PathBuf::from(".reviewr.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("reviewr").join("reviewr.yml"));
        }
        Self::load_first_existing(&candidates)
    }

    /// Load the first of `candidates` that exists, or defaults if none do.
    ///
    /// A file that exists but does not parse is an error, not a fallthrough.
    fn load_first_existing(candidates: &[PathBuf]) -> Result<Self> {
        for path in candidates {
            if path.exists() {
                let config =
                    Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()))?;
                log::info!("Loaded config from {}", path.display());
                return Ok(config);
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate().context("Invalid scheduler section")?;
        if self.storage.data_dir.as_os_str().is_empty() {
            eyre::bail!("storage.data-dir must not be empty");
        }
        Ok(())
    }
}

/// Which storage backend to persist cards and states in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSONL file per collection.
    #[default]
    Jsonl,
    /// A single SQLite database file.
    Sqlite,
}

/// Storage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend to use.
    pub backend: StorageBackend,

    /// Data directory for collections, the database and undo history.
    #[serde(rename = "data-dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let default_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("reviewr");

        Self {
            backend: StorageBackend::Jsonl,
            data_dir: default_dir,
        }
    }
}
