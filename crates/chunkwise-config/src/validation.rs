//! Configuration validation.
//!
//! Checks that cannot be expressed with `validator` attributes.

use chunkwise_core::{MAX_LANES_LIMIT, MIN_CHUNK_BYTES};

use crate::error::ConfigError;
use crate::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

/// Validate a configuration.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_engine_config(config)?;
    validate_logging_config(config)?;
    Ok(())
}

/// Validate engine configuration.
fn validate_engine_config(config: &Config) -> Result<(), ConfigError> {
    // One dispatcher plus at least one worker.
    if config.engine.workers == 0 {
        return Err(ConfigError::invalid_value(
            "engine.workers",
            "requires at least one worker besides the dispatcher",
        ));
    }

    if config.engine.max_chunk_bytes < MIN_CHUNK_BYTES {
        return Err(ConfigError::invalid_value(
            "engine.max_chunk_bytes",
            format!("must be greater or equal than {}", MIN_CHUNK_BYTES),
        ));
    }

    // Each lane is an OS thread.
    if !(1..=MAX_LANES_LIMIT).contains(&config.engine.max_lanes) {
        return Err(ConfigError::invalid_value(
            "engine.max_lanes",
            format!("must be between 1 and {}", MAX_LANES_LIMIT),
        ));
    }

    Ok(())
}

/// Validate logging configuration.
fn validate_logging_config(config: &Config) -> Result<(), ConfigError> {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::invalid_value(
            "logging.level",
            format!("must be one of: {}", LOG_LEVELS.join(", ")),
        ));
    }

    let format = config.logging.format.to_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        return Err(ConfigError::invalid_value(
            "logging.format",
            format!("must be one of: {}", LOG_FORMATS.join(", ")),
        ));
    }

    Ok(())
}
