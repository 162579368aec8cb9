//! CLI commands.

pub mod matrix;
pub mod text;
pub mod validate;

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use chunkwise_engine::RunSummary;

use crate::output;

/// Everything a processing command prints in JSON mode.
#[derive(Debug, Serialize)]
pub struct RunOutput<T> {
    /// One report per input, in command-line order.
    pub reports: Vec<T>,
    /// Pool statistics.
    pub summary: RunSummary,
    /// Wall-clock time for the whole run.
    pub elapsed_seconds: f64,
}

/// Print the reports of a finished run.
pub(crate) fn finish_run<T: Serialize>(
    reports: Vec<T>,
    summary: RunSummary,
    elapsed: Duration,
    json: bool,
    show_summary: bool,
    print_report: fn(&T),
) -> Result<()> {
    if json {
        let run = RunOutput {
            reports,
            summary,
            elapsed_seconds: elapsed.as_secs_f64(),
        };
        println!("{}", serde_json::to_string_pretty(&run)?);
        return Ok(());
    }

    for report in &reports {
        print_report(report);
    }
    if show_summary {
        output::print_run_summary(&summary);
    }
    output::print_elapsed(elapsed);
    Ok(())
}
