//! Application configuration
//!
//! The serde types live in waystone-types; this module adds the
//! platform-specific defaults and confy persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use waystone_types::{AppConfig, TrackerSettings};

use super::error::ConfigError;
use crate::storage::{self, CHECKPOINT_FILE, DATABASE_FILE, StoreError};

const APP_NAME: &str = "waystone";
const CONFIG_NAME: &str = "config";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Where the game writes Client.txt on a default install.
pub fn default_log_file() -> String {
    #[cfg(target_os = "windows")]
    {
        PathBuf::from(r"C:\Program Files (x86)\Grinding Gear Games\Path of Exile\logs\Client.txt")
            .to_str()
            .map(String::from)
            .unwrap_or_default()
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        dirs::home_dir()
            .map(|p| p.join(".local/share/Steam/steamapps/common/Path of Exile/logs/Client.txt"))
            .and_then(|p| p.to_str().map(String::from))
            .unwrap_or_default()
    }
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|p| {
                p.join("Library/Application Support/Steam/steamapps/common/Path of Exile/logs/Client.txt")
            })
            .and_then(|p| p.to_str().map(String::from))
            .unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AppConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for AppConfig persistence and derived paths
pub trait AppConfigExt: Sized {
    fn load() -> Self;
    fn load_with_defaults() -> Self;
    fn save(&self) -> Result<(), ConfigError>;
    fn log_path(&self) -> PathBuf;
    fn data_dir(&self) -> Result<PathBuf, StoreError>;
    fn database_path(&self) -> Result<PathBuf, StoreError>;
    fn checkpoint_path(&self) -> Result<PathBuf, StoreError>;
    fn poll_interval(&self) -> Duration;
    fn checkpoint_interval(&self) -> Duration;
}

impl AppConfigExt for AppConfig {
    fn load() -> Self {
        let loaded: Result<AppConfig, _> = confy::load(APP_NAME, CONFIG_NAME);
        match loaded {
            Ok(config) if config.log_file.is_empty() => AppConfig {
                log_file: default_log_file(),
                ..config
            },
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load configuration, using defaults");
                Self::load_with_defaults()
            }
        }
    }

    /// Load with platform-specific defaults (used when no config file exists)
    fn load_with_defaults() -> Self {
        AppConfig::with_log_file(default_log_file())
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn log_path(&self) -> PathBuf {
        PathBuf::from(&self.log_file)
    }

    fn data_dir(&self) -> Result<PathBuf, StoreError> {
        storage::data_dir(self.data_directory.as_deref().map(Path::new))
    }

    fn database_path(&self) -> Result<PathBuf, StoreError> {
        Ok(self.data_dir()?.join(DATABASE_FILE))
    }

    fn checkpoint_path(&self) -> Result<PathBuf, StoreError> {
        Ok(self.data_dir()?.join(CHECKPOINT_FILE))
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs.max(1))
    }
}
