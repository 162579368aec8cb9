//! Chunkwise CLI.

pub mod commands;
pub mod output;
pub mod progress;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use chunkwise_config::{loader::load_default_config, Config, ConfigLoader};

/// Most input files accepted by one run.
pub const MAX_INPUT_FILES: usize = 10;

/// Chunkwise - word statistics and determinants over a worker pool.
#[derive(Parser, Debug)]
#[command(
    name = "chunkwise",
    version,
    about = "Chunked computation over a dispatcher/worker pool",
    long_about = "Chunkwise splits its inputs into work units and spreads them over a pool\n\
                  of worker threads.\n\n\
                  Commands:\n\
                  • text: count words, vowel-initial words and consonant-final words\n\
                  • matrix: compute determinants of the matrices in binary matrix files"
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path.
    #[arg(short, long, global = true, env = "CHUNKWISE_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Enable JSON output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Print Prometheus metrics after the run.
    #[arg(long, global = true)]
    pub metrics: bool,
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Count words in text files.
    Text(commands::text::TextArgs),

    /// Compute determinants of matrix files.
    Matrix(commands::matrix::MatrixArgs),

    /// Validate configuration.
    Validate(commands::validate::ValidateArgs),

    /// Show version information.
    Version,
}

/// Load the configuration named on the command line, or the default
/// locations when none is given, with `CHUNKWISE_*` overrides applied.
pub fn load_config(path: Option<&str>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::new()
            .with_file(path)
            .with_env_prefix("CHUNKWISE")
            .load()
            .with_context(|| format!("failed to load configuration from {path}")),
        None => load_default_config().context("failed to load configuration"),
    }
}

/// Log level from the command line, else the configuration, else `warn`.
///
/// An unknown name is an error whichever source it came from.
pub fn resolve_log_level(flag: Option<&str>, config: Option<&Config>) -> Result<tracing::Level> {
    let name = flag
        .or(config.map(|c| c.logging.level.as_str()))
        .unwrap_or("warn");
    name.parse::<tracing::Level>().map_err(|_| {
        anyhow::anyhow!("invalid log level '{name}': must be one of trace, debug, info, warn, error")
    })
}

/// Reject file lists the engine will not accept.
pub fn check_input_files(files: &[String]) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("file name is missing");
    }
    if files.len() > MAX_INPUT_FILES {
        anyhow::bail!("can only process {MAX_INPUT_FILES} files at a time");
    }
    Ok(())
}
