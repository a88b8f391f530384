//! # Scheduler Configuration
//!
//! Configuration management for the scheduling engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                            │
//! │     TILL_EXPORT_DIR=/srv/reports                                        │
//! │     TILL_DB_PATH=/var/lib/till/till.db                                  │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/till-reports/scheduler.toml (Linux)                       │
//! │     ~/Library/Application Support/com.till.reports/... (macOS)          │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                    │
//! │     Platform data dir for both database and exports                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scheduler.toml
//! [database]
//! path = "/var/lib/till/till.db"
//!
//! [exports]
//! dir = "/srv/reports"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{SchedulerError, SchedulerResult};

// =============================================================================
// Database Settings
// =============================================================================

/// Where the scheduled reports database lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    data_dir().join("till.db")
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
        }
    }
}

// =============================================================================
// Export Settings
// =============================================================================

/// Where exported report files land.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory for exported files. A schedule's `export_path` field
    /// overrides this per report.
    #[serde(default = "default_export_dir")]
    pub dir: PathBuf,
}

fn default_export_dir() -> PathBuf {
    data_dir().join("exports")
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            dir: default_export_dir(),
        }
    }
}

// =============================================================================
// Main Scheduler Configuration
// =============================================================================

/// Complete scheduler configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Database location.
    #[serde(default)]
    pub database: DatabaseSettings,

    /// Export destination.
    #[serde(default)]
    pub exports: ExportSettings,
}

impl SchedulerConfig {
    /// Creates a new config with platform defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scheduler.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SchedulerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scheduler config from file");
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| SchedulerError::ConfigLoadFailed(e.to_string()))?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scheduler config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SchedulerResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SchedulerError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SchedulerError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .map_err(|e| SchedulerError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scheduler config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(SchedulerError::InvalidConfig(
                "database.path must not be empty".into(),
            ));
        }
        if self.exports.dir.as_os_str().is_empty() {
            return Err(SchedulerError::InvalidConfig(
                "exports.dir must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("TILL_EXPORT_DIR") {
            debug!(dir = %dir, "Overriding export dir from environment");
            self.exports.dir = PathBuf::from(dir);
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "reports")
            .map(|dirs| dirs.config_dir().join("scheduler.toml"))
    }
}

/// Platform data directory, with a relative fallback when the platform
/// offers none (containers without HOME).
fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "till", "reports")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./till-data"))
}
