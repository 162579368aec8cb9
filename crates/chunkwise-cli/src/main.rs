//! Chunkwise CLI entry point.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::info;

use chunkwise_cli::{commands, load_config, output, resolve_log_level, Cli, Commands};
use chunkwise_config::Config;
use chunkwise_metrics::{export_prometheus, init_metrics, init_tracing, LogFormat, TracingConfig};

fn main() {
    if let Err(err) = run() {
        output::print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Only processing commands read the configuration; validate loads its own file.
    let config = match cli.command {
        Commands::Text(_) | Commands::Matrix(_) => Some(load_config(cli.config.as_deref())?),
        Commands::Validate(_) | Commands::Version => None,
    };

    init_logging(&cli, config.as_ref())?;

    let metrics = cli.metrics || config.as_ref().is_some_and(|c| c.metrics.enabled);
    if metrics {
        init_metrics()?;
    }

    match cli.command {
        Commands::Text(args) => {
            commands::text::execute(args, config.unwrap_or_default(), cli.json)?;
        }
        Commands::Matrix(args) => {
            commands::matrix::execute(args, config.unwrap_or_default(), cli.json)?;
        }
        Commands::Validate(args) => {
            commands::validate::execute(args, cli.json)?;
        }
        Commands::Version => {
            print_version(cli.json)?;
        }
    }

    if cli.metrics {
        print!("{}", export_prometheus()?);
    }

    Ok(())
}

/// Set up tracing from the command line, then the configuration.
fn init_logging(cli: &Cli, config: Option<&Config>) -> Result<()> {
    let level = resolve_log_level(cli.log_level.as_deref(), config)?;

    let format = if cli.json {
        LogFormat::Json
    } else {
        config
            .map(|c| LogFormat::from_name(&c.logging.format))
            .unwrap_or(LogFormat::Compact)
    };

    init_tracing(TracingConfig {
        level,
        format,
        ..Default::default()
    })?;
    info!(%level, "logging initialized");
    Ok(())
}

/// Print version information.
fn print_version(json: bool) -> Result<()> {
    if json {
        let version = serde_json::json!({
            "name": "chunkwise",
            "version": env!("CARGO_PKG_VERSION"),
            "rust_version": env!("CARGO_PKG_RUST_VERSION"),
            "description": env!("CARGO_PKG_DESCRIPTION"),
        });
        println!("{}", serde_json::to_string_pretty(&version)?);
    } else {
        println!("{} {}", "chunkwise".bright_green().bold(), env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
        println!();
        println!("{}", env!("CARGO_PKG_DESCRIPTION"));
    }
    Ok(())
}
