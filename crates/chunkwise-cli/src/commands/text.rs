//! Text command - word statistics over text files.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

use chunkwise_config::Config;
use chunkwise_core::WordBoundary;
use chunkwise_engine::Engine;

use crate::check_input_files;
use crate::commands::finish_run;
use crate::output;
use crate::progress::ScopedProgress;

/// Text command arguments.
#[derive(Args, Debug)]
pub struct TextArgs {
    /// Text file to process (repeat for more files).
    #[arg(short = 'f', long = "file", required = true)]
    pub files: Vec<String>,

    /// Maximum number of bytes per chunk.
    #[arg(short = 'm', long)]
    pub max_chunk_bytes: Option<usize>,

    /// Number of workers.
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Word boundary policy (whitespace, punctuation).
    #[arg(long, value_parser = parse_boundary)]
    pub boundary: Option<WordBoundary>,

    /// Print per-worker statistics.
    #[arg(long)]
    pub summary: bool,
}

fn parse_boundary(s: &str) -> std::result::Result<WordBoundary, String> {
    WordBoundary::parse(s).ok_or_else(|| format!("unknown word boundary '{s}'"))
}

/// Execute the text command.
pub fn execute(args: TextArgs, config: Config, json: bool) -> Result<()> {
    check_input_files(&args.files)?;

    let mut engine_config = config.engine;
    if let Some(max) = args.max_chunk_bytes {
        engine_config.max_chunk_bytes = max;
    }
    if let Some(workers) = args.workers {
        engine_config.workers = workers;
    }
    if let Some(boundary) = args.boundary {
        engine_config.word_boundary = boundary;
    }
    debug!(?engine_config, "text run");

    let started = Instant::now();
    let progress = (!json).then(|| ScopedProgress::spinner("Counting words..."));

    let mut engine = Engine::start(&engine_config).context("failed to start the worker pool")?;
    let reports = engine.process_text(&args.files)?;
    let summary = engine.shutdown()?;
    drop(progress);

    finish_run(
        reports,
        summary,
        started.elapsed(),
        json,
        args.summary,
        output::print_text_report,
    )
}
