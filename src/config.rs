//! Configuration module for cloudshelf.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, ShelfError};

/// Environment variable overriding the database path.
pub const ENV_DATABASE_PATH: &str = "CLOUDSHELF_DATABASE_PATH";

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/cloudshelf.db".to_string()
}

fn default_max_connections() -> u32 {
    8
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Blob store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    /// Root directory of the local blob store.
    #[serde(default = "default_blob_root")]
    pub root: String,
}

fn default_blob_root() -> String {
    "data/blobs".to_string()
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            root: default_blob_root(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/cloudshelf.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Limits applied to item payloads and tree shape.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitsConfig {
    /// Maximum item name length (in characters).
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    /// Maximum folder nesting depth (root items are at depth 0).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_name_length() -> usize {
    255
}

fn default_max_depth() -> usize {
    32
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_name_length: default_max_name_length(),
            max_depth: default_max_depth(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob store configuration.
    #[serde(default)]
    pub blob: BlobConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Payload and tree limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ShelfError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ShelfError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CLOUDSHELF_DATABASE_PATH`: Override the database path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(ENV_DATABASE_PATH) {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(ShelfError::Config(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.limits.max_name_length == 0 {
            return Err(ShelfError::Config(
                "limits.max_name_length must be at least 1".to_string(),
            ));
        }
        if self.limits.max_depth == 0 {
            return Err(ShelfError::Config(
                "limits.max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
