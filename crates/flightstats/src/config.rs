//! Configuration management for flightstats.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML file,
//! then `FLIGHTSTATS_`-prefixed environment variables.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "flightstats";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "flight_records.db";

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Application configuration.
///
/// Loaded from (highest precedence first):
/// 1. Environment variables (prefixed with `FLIGHTSTATS_`)
/// 2. TOML config file at `~/.config/flightstats/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Route statistics configuration.
    pub stats: StatsConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/flightstats/flight_records.db`
    pub database_path: Option<PathBuf>,
    /// Records older than this many days are pruned. 0 keeps everything.
    pub retention_days: u32,
    /// Buffered change notifications per subscriber before snapshots collapse.
    pub subscription_capacity: usize,
}

/// Route statistics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Look-back window for route averages, in days.
    pub window_days: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            retention_days: 30,
            subscription_capacity: 16,
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self { window_days: 7 }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("FLIGHTSTATS_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.storage.subscription_capacity == 0 {
            return Err(Error::config_validation(
                "subscription_capacity must be greater than 0",
            ));
        }

        if self.stats.window_days == 0 {
            return Err(Error::config_validation(
                "window_days must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Retention period, or `None` when records are kept forever.
    #[must_use]
    pub fn retention(&self) -> Option<Duration> {
        if self.storage.retention_days == 0 {
            None
        } else {
            Some(Duration::from_secs(
                u64::from(self.storage.retention_days) * 24 * 60 * 60,
            ))
        }
    }

    /// Start of the statistics window, in epoch milliseconds, relative to `now_ms`.
    #[must_use]
    pub fn stats_window_start(&self, now_ms: i64) -> i64 {
        now_ms - i64::from(self.stats.window_days) * MILLIS_PER_DAY
    }
}
