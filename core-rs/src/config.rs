/**
 * config.rs
 * Store configuration (YAML file or environment)
 *
 * Format:
 * ```yaml
 * dataDir: ./data
 * logLevel: info
 * ```
 *
 * Environment overrides:
 * - GRIMOIRE_DATA_DIR
 * - GRIMOIRE_LOG
 */

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::StoreError;

/// Default data directory, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = "data";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "GRIMOIRE_DATA_DIR";

/// Environment variable overriding the log level
pub const LOG_LEVEL_ENV: &str = "GRIMOIRE_LOG";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Root directory every document key resolves under
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Default tracing filter used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

impl StoreConfig {
    /// Config rooted at `data_dir` with default logging
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Load config from a YAML file
    ///
    /// # Example
    /// ```no_run
    /// use grimoire_core::config::StoreConfig;
    ///
    /// let config = StoreConfig::load("grimoire.yaml").unwrap();
    /// println!("{}", config.data_dir.display());
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(StoreError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let config: StoreConfig = serde_yaml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Build config from defaults plus environment overrides
    pub fn from_env() -> Result<Self, StoreError> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply GRIMOIRE_DATA_DIR / GRIMOIRE_LOG on top of the current values
    pub fn apply_env(&mut self) {
        if let Ok(dir) = env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(level) = env::var(LOG_LEVEL_ENV) {
            if !level.trim().is_empty() {
                self.log_level = level.trim().to_lowercase();
            }
        }
    }

    /// Validate config values
    ///
    /// Ensures:
    /// - dataDir is non-empty
    /// - logLevel is one of trace, debug, info, warn, error
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(StoreError::Config("dataDir cannot be empty".to_string()));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(StoreError::Config(format!(
                "Invalid logLevel '{}': expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}
