//! Application configuration.
//!
//! Aggregates the storage, cache and limit settings into a single Config
//! struct that can be loaded from YAML files or environment variables.

mod cache;
mod limits;
mod storage;

pub use cache::{CacheConfig, CacheRepresentation, DEFAULT_PRIME_BATCH_DAYS};
pub use limits::{
    QueryLimits, DEFAULT_DAILY_WINDOW_MAX_DAYS, DEFAULT_MAX_DELTA_INTERVAL_DAYS,
    DEFAULT_MAX_SNAPSHOT_INTERVAL_DAYS, DEFAULT_WEEKLY_WINDOW_MAX_DAYS,
};
pub use storage::StorageConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "HISCORE_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "HISCORE";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "HISCORE_LOG";

use serde::Deserialize;

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Snapshot and delta cache configuration.
    pub cache: CacheConfig,
    /// Query span limits.
    pub limits: QueryLimits,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ::config::ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Parse configuration from an inline YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ::config::ConfigError> {
        use ::config::{Config as ConfigLib, File, FileFormat};

        ConfigLib::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()
    }
}
