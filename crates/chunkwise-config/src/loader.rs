//! Configuration loader.

use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use chunkwise_core::{KernelMode, WordBoundary};

use crate::error::ConfigError;
use crate::{Config, EngineConfig};

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension.
    pub fn from_extension(path: &str) -> Option<Self> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Some(Self::Yaml),
            Some("toml") => Some(Self::Toml),
            Some("json") => Some(Self::Json),
            _ => None,
        }
    }

    /// Parse content in this format.
    pub fn parse<T: serde::de::DeserializeOwned>(&self, content: &str) -> Result<T, ConfigError> {
        match self {
            Self::Yaml => serde_yaml::from_str(content).map_err(ConfigError::from),
            Self::Toml => toml::from_str(content).map_err(ConfigError::from),
            Self::Json => serde_json::from_str(content).map_err(ConfigError::from),
        }
    }
}

/// Configuration loader.
pub struct ConfigLoader {
    /// Config file path.
    file_path: Option<String>,

    /// Environment variable prefix.
    env_prefix: Option<String>,

    /// Default values.
    defaults: Config,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new() -> Self {
        Self {
            file_path: None,
            env_prefix: None,
            defaults: Config::default(),
        }
    }

    /// Set the config file path.
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Set default values.
    pub fn with_defaults(mut self, defaults: Config) -> Self {
        self.defaults = defaults;
        self
    }

    /// Load the configuration.
    pub fn load(self) -> Result<Config, ConfigError> {
        let mut config = match self.file_path {
            Some(ref path) => self.load_from_file(path)?,
            None => self.defaults.clone(),
        };

        if let Some(ref prefix) = self.env_prefix {
            apply_env_overrides(&mut config, prefix, |name| std::env::var(name).ok())?;
        }

        config.validate()?;

        Ok(config)
    }

    /// Load from file.
    fn load_from_file(&self, path: &str) -> Result<Config, ConfigError> {
        debug!("Loading configuration from {}", path);

        if !Path::new(path).exists() {
            return Err(ConfigError::FileNotFound(path.to_string()));
        }

        let content = std::fs::read_to_string(path)?;

        let format = ConfigFormat::from_extension(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_string()))?;

        let config: Config = format.parse(&content)?;

        info!("Loaded configuration from {}", path);

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `<PREFIX>_*` overrides read through `lookup`.
///
/// A variable that is set but unparsable is an error rather than being ignored.
pub fn apply_env_overrides<F>(config: &mut Config, prefix: &str, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |suffix: &str| {
        let name = format!("{}_{}", prefix, suffix);
        lookup(&name).map(|value| (name, value))
    };

    if let Some((name, val)) = var("WORKERS") {
        config.engine.workers = parse_number(&name, &val)?;
    }
    if let Some((name, val)) = var("MAX_CHUNK_BYTES") {
        config.engine.max_chunk_bytes = parse_number(&name, &val)?;
    }
    if let Some((name, val)) = var("MAX_LANES") {
        config.engine.max_lanes = parse_number(&name, &val)?;
    }
    if let Some((name, val)) = var("KERNEL") {
        config.engine.kernel = KernelMode::parse(&val)
            .ok_or_else(|| ConfigError::env(name, format!("unknown kernel '{}'", val)))?;
    }
    if let Some((name, val)) = var("WORD_BOUNDARY") {
        config.engine.word_boundary = WordBoundary::parse(&val)
            .ok_or_else(|| ConfigError::env(name, format!("unknown word boundary '{}'", val)))?;
    }

    if let Some((_, val)) = var("LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some((_, val)) = var("LOG_FORMAT") {
        config.logging.format = val;
    }
    if let Some((name, val)) = var("METRICS") {
        config.metrics.enabled = match val.to_lowercase().as_str() {
            "1" | "true" | "on" => true,
            "0" | "false" | "off" => false,
            _ => return Err(ConfigError::env(name, "expected true or false")),
        };
    }

    Ok(())
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env(name, format!("'{}' is not a number", value)))
}

/// Load configuration from default locations.
pub fn load_default_config() -> Result<Config, ConfigError> {
    let paths = [
        "chunkwise.yaml",
        "chunkwise.yml",
        "chunkwise.toml",
        "chunkwise.json",
    ];

    for path in &paths {
        if Path::new(path).exists() {
            return ConfigLoader::new()
                .with_file(*path)
                .with_env_prefix("CHUNKWISE")
                .load();
        }
    }

    ConfigLoader::new().with_env_prefix("CHUNKWISE").load()
}

/// Builder for programmatic configuration.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new config builder.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set engine configuration.
    pub fn engine(mut self, config: EngineConfig) -> Self {
        self.config.engine = config;
        self
    }

    /// Set the worker count.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.engine.workers = workers;
        self
    }

    /// Set the chunk size.
    pub fn max_chunk_bytes(mut self, max_chunk_bytes: usize) -> Self {
        self.config.engine.max_chunk_bytes = max_chunk_bytes;
        self
    }

    /// Set the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
