//! Chunkwise Configuration Management.
//!
//! This crate provides configuration loading and validation for the chunkwise
//! engine. It supports YAML, TOML, and JSON configuration files, as well as
//! environment variable overrides.
//!
//! # Example
//!
//! ```rust,ignore
//! use chunkwise_config::{Config, ConfigLoader};
//!
//! let config = ConfigLoader::new()
//!     .with_file("chunkwise.yaml")
//!     .with_env_prefix("CHUNKWISE")
//!     .load()?;
//!
//! println!("Workers: {}", config.engine.workers);
//! ```

pub mod engine;
pub mod error;
pub mod loader;
pub mod validation;

pub use engine::EngineConfig;
pub use error::ConfigError;
pub use loader::{ConfigBuilder, ConfigLoader};

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Engine configuration.
    #[validate(nested)]
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration.
    #[validate(nested)]
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Create a new configuration from file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        ConfigLoader::new().with_file(path).load()
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        ConfigLoader::new().with_env_prefix("CHUNKWISE").load()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        <Self as Validate>::validate(self).map_err(ConfigError::from)?;
        validation::validate_config(self)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    #[validate(length(min = 1))]
    pub level: String,

    /// Log format (json, pretty, compact).
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics collection.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("engine:\n  workers: 2\n").unwrap();
        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.engine.max_chunk_bytes, chunkwise_core::DEFAULT_CHUNK_BYTES);
        assert_eq!(config.logging.level, "warn");
        assert!(config.metrics.enabled);
    }
}
