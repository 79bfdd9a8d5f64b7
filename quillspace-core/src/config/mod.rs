//! Configuration management for Quillspace
//!
//! This module provides environment-based configuration management with
//! support for defaults, file loading, and validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

mod error;

pub use error::ConfigError;

use crate::core_workspace::DEFAULT_EXPIRATION_DAYS;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,

    /// Invitation configuration
    pub invitations: InvitationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,

    /// Maximum connections in the pool
    pub pool_size: u32,
}

/// Invitation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationConfig {
    /// Expiry horizon for invitations created without an override, in days
    pub default_expiration_days: u32,

    /// Deadline for a single notification delivery attempt
    #[serde(with = "humantime_serde")]
    pub delivery_timeout: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            invitations: InvitationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/quillspace.db"),
            pool_size: 10,
        }
    }
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            default_expiration_days: DEFAULT_EXPIRATION_DAYS,
            delivery_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: QUILLSPACE_<SECTION>_<KEY>
    /// Example: QUILLSPACE_STORE_DB_PATH=/var/lib/quillspace/quillspace.db
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Store config
        if let Ok(db_path) = env::var("QUILLSPACE_STORE_DB_PATH") {
            config.store.db_path = PathBuf::from(db_path);
        }
        if let Ok(pool_size) = env::var("QUILLSPACE_STORE_POOL_SIZE") {
            config.store.pool_size = pool_size
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid pool size: {}", e)))?;
        }

        // Invitation config
        if let Ok(days) = env::var("QUILLSPACE_INVITATION_EXPIRATION_DAYS") {
            config.invitations.default_expiration_days = days.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid expiration days: {}", e))
            })?;
        }

        // Logging config
        if let Ok(level) = env::var("QUILLSPACE_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("QUILLSPACE_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        if self.invitations.default_expiration_days == 0 {
            return Err(ConfigError::ValidationFailed(
                "default_expiration_days must be greater than 0".to_string(),
            ));
        }

        if self.invitations.delivery_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "delivery_timeout must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
