//! Counter metrics.

use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

use crate::MetricsError;

/// Units handed to workers.
static UNITS_DISPATCHED: OnceLock<IntCounterVec> = OnceLock::new();

/// Results merged into aggregates.
static RESULTS_MERGED: OnceLock<IntCounterVec> = OnceLock::new();

/// Dispatch rounds completed.
static ROUNDS: OnceLock<IntCounterVec> = OnceLock::new();

/// Inputs fully processed.
static INPUTS_COMPLETED: OnceLock<IntCounterVec> = OnceLock::new();

fn register(
    registry: &Registry,
    cell: &OnceLock<IntCounterVec>,
    name: &str,
    help: &str,
) -> Result<(), MetricsError> {
    let counter = IntCounterVec::new(Opts::new(name, help), &["kind"])?;
    registry.register(Box::new(counter.clone()))?;
    cell.set(counter)
        .map_err(|_| MetricsError::AlreadyInitialized)
}

/// Initialize counters.
pub fn init_counters(registry: &Registry) -> Result<(), MetricsError> {
    register(
        registry,
        &UNITS_DISPATCHED,
        "units_dispatched_total",
        "Work units sent to workers",
    )?;
    register(
        registry,
        &RESULTS_MERGED,
        "results_merged_total",
        "Worker results merged into an aggregate",
    )?;
    register(registry, &ROUNDS, "rounds_total", "Dispatch rounds completed")?;
    register(
        registry,
        &INPUTS_COMPLETED,
        "inputs_completed_total",
        "Inputs fully processed",
    )?;
    Ok(())
}

fn add(cell: &OnceLock<IntCounterVec>, kind: &str, count: u64) {
    if let Some(counter) = cell.get() {
        counter.with_label_values(&[kind]).inc_by(count);
    }
}

fn read(cell: &OnceLock<IntCounterVec>, kind: &str) -> u64 {
    cell.get()
        .map(|c| c.with_label_values(&[kind]).get())
        .unwrap_or(0)
}

/// Add to the dispatched-units counter.
pub fn inc_units_dispatched(kind: &str, count: u64) {
    add(&UNITS_DISPATCHED, kind, count);
}

/// Add to the merged-results counter.
pub fn inc_results_merged(kind: &str, count: u64) {
    add(&RESULTS_MERGED, kind, count);
}

/// Count one completed round.
pub fn inc_rounds(kind: &str) {
    add(&ROUNDS, kind, 1);
}

/// Count one completed input.
pub fn inc_inputs_completed(kind: &str) {
    add(&INPUTS_COMPLETED, kind, 1);
}

/// Current dispatched-units count.
pub fn units_dispatched(kind: &str) -> u64 {
    read(&UNITS_DISPATCHED, kind)
}

/// Current merged-results count.
pub fn results_merged(kind: &str) -> u64 {
    read(&RESULTS_MERGED, kind)
}
