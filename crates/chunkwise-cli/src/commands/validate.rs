//! Validate command - validate configuration files.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use chunkwise_config::ConfigLoader;
use chunkwise_core::{KernelMode, DEFAULT_CHUNK_BYTES};

use crate::output;

/// Validate command arguments.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration file to validate.
    pub config_file: String,

    /// Verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Execute the validate command.
pub fn execute(args: ValidateArgs, json: bool) -> Result<()> {
    if !json {
        println!(
            "\n{} {}",
            "Validating".bright_green().bold(),
            args.config_file.bright_cyan()
        );
        println!();
    }

    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let config = match ConfigLoader::new().with_file(&args.config_file).load() {
        Ok(c) => {
            if !json && args.verbose {
                output::print_success("Configuration loaded successfully");
            }
            Some(c)
        }
        Err(e) => {
            errors.push(format!("Failed to load configuration: {}", e));
            None
        }
    };

    if let Some(ref config) = config {
        let engine = &config.engine;
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        if engine.workers > parallelism {
            warnings.push(format!(
                "engine.workers ({}) exceeds the {} available cores",
                engine.workers, parallelism
            ));
        }

        if engine.max_chunk_bytes > 64 * DEFAULT_CHUNK_BYTES {
            warnings.push(format!(
                "engine.max_chunk_bytes ({}) is large; each worker holds a full chunk",
                engine.max_chunk_bytes
            ));
        }

        if engine.kernel == KernelMode::RowParallel && engine.max_lanes > 4 * parallelism {
            warnings.push(format!(
                "engine.max_lanes ({}) allows far more lanes than cores",
                engine.max_lanes
            ));
        }

        if !json && args.verbose {
            println!();
            println!("  {}", "Configuration Summary".bright_cyan().underline());
            println!(
                "{}",
                output::format_kv_list(&[
                    ("Workers", engine.workers.to_string()),
                    ("Max chunk bytes", engine.max_chunk_bytes.to_string()),
                    ("Word boundary", engine.word_boundary.as_str().to_string()),
                    ("Kernel", engine.kernel.as_str().to_string()),
                    ("Max lanes", engine.max_lanes.to_string()),
                    ("Log level", config.logging.level.clone()),
                    ("Metrics", config.metrics.enabled.to_string()),
                ])
            );
            println!();
        }
    }

    if json {
        let result = serde_json::json!({
            "file": args.config_file,
            "valid": errors.is_empty(),
            "errors": errors,
            "warnings": warnings,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if !errors.is_empty() {
            println!("  {}", "Errors:".bright_red().bold());
            for error in &errors {
                println!("    {} {}", "✗".bright_red(), error);
            }
            println!();
        }

        if !warnings.is_empty() {
            println!("  {}", "Warnings:".bright_yellow().bold());
            for warning in &warnings {
                println!("    {} {}", "⚠".bright_yellow(), warning);
            }
            println!();
        }

        if errors.is_empty() {
            output::print_success(&format!("Configuration is {}", "valid".bright_green().bold()));
        } else {
            output::print_error(&format!("Configuration is {}", "invalid".bright_red().bold()));
        }
    }

    if !errors.is_empty() {
        anyhow::bail!("Configuration validation failed");
    }

    Ok(())
}
