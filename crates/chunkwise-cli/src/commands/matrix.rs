//! Matrix command - determinants of binary matrix files.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use chunkwise_config::Config;
use chunkwise_core::KernelMode;
use chunkwise_engine::Engine;

use crate::check_input_files;
use crate::commands::finish_run;
use crate::output;
use crate::progress::ScopedProgress;

/// Matrix command arguments.
#[derive(Args, Debug)]
pub struct MatrixArgs {
    /// Matrix file to process (repeat for more files).
    #[arg(short = 'f', long = "file", required = true)]
    pub files: Vec<String>,

    /// Number of workers.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Determinant kernel (auto, sequential, row-parallel, parallel-for).
    #[arg(long, value_parser = parse_kernel)]
    pub kernel: Option<KernelMode>,

    /// Most lanes the row-parallel kernel may spawn.
    #[arg(long)]
    pub max_lanes: Option<usize>,

    /// Print per-worker statistics.
    #[arg(long)]
    pub summary: bool,
}

fn parse_kernel(s: &str) -> std::result::Result<KernelMode, String> {
    KernelMode::parse(s).ok_or_else(|| format!("unknown kernel '{s}'"))
}

/// Execute the matrix command.
pub fn execute(args: MatrixArgs, config: Config, json: bool) -> Result<()> {
    check_input_files(&args.files)?;

    let mut engine_config = config.engine;
    if let Some(workers) = args.workers {
        engine_config.workers = workers;
    }
    if let Some(kernel) = args.kernel {
        engine_config.kernel = kernel;
    }
    if let Some(max_lanes) = args.max_lanes {
        engine_config.max_lanes = max_lanes;
    }
    debug!(?engine_config, "matrix run");

    let started = Instant::now();
    let progress = (!json).then(|| ScopedProgress::spinner("Computing determinants..."));

    let mut engine = Engine::start(&engine_config).context("failed to start the worker pool")?;
    let reports = engine.process_matrices(&args.files)?;
    let summary = engine.shutdown()?;
    drop(progress);

    finish_run(
        reports,
        summary,
        started.elapsed(),
        json,
        args.summary,
        output::print_matrix_report,
    )
}
