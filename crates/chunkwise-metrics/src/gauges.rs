//! Gauge metrics.

use prometheus::{IntGauge, Opts, Registry};
use std::sync::OnceLock;

use crate::MetricsError;

/// Workers currently holding a unit.
static BUSY_WORKERS: OnceLock<IntGauge> = OnceLock::new();

/// Size of the worker pool.
static POOL_SIZE: OnceLock<IntGauge> = OnceLock::new();

/// Initialize gauges.
pub fn init_gauges(registry: &Registry) -> Result<(), MetricsError> {
    let busy = IntGauge::with_opts(Opts::new("busy_workers", "Workers with a unit in flight"))?;
    registry.register(Box::new(busy.clone()))?;
    BUSY_WORKERS
        .set(busy)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    let pool = IntGauge::with_opts(Opts::new("pool_workers", "Workers in the pool"))?;
    registry.register(Box::new(pool.clone()))?;
    POOL_SIZE
        .set(pool)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    Ok(())
}

/// Set busy workers.
pub fn set_busy_workers(count: usize) {
    if let Some(gauge) = BUSY_WORKERS.get() {
        gauge.set(count as i64);
    }
}

/// Set the pool size.
pub fn set_pool_workers(count: usize) {
    if let Some(gauge) = POOL_SIZE.get() {
        gauge.set(count as i64);
    }
}
