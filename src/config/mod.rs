//! Configuration system for Reviewr.
//!
//! - `SchedulerConfig`: the engine's parameters, injected into the orchestrator
//! - `GlobalConfig`: the file-level config (~/.config/reviewr/reviewr.yml or .reviewr.yml)
//!   holding the scheduler section and storage settings

use eyre::Result;
use std::path::PathBuf;

pub use self::global::{GlobalConfig, StorageBackend, StorageConfig};
pub use self::scheduler::{MIN_EASE, SchedulerConfig};

mod global;
mod scheduler;

/// Load configuration from the standard search paths.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. .reviewr.yml in current directory (project config)
/// 3. ~/.config/reviewr/reviewr.yml (user config)
/// 4. Default values
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<GlobalConfig> {
    GlobalConfig::load(explicit_path)
}
