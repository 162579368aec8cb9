//! Chunkwise Metrics and Observability.
//!
//! Logging setup plus a small set of Prometheus metrics describing dispatch
//! activity: units sent, results merged, rounds run, inputs completed, and
//! how many workers are busy.
//!
//! Recording functions are no-ops until [`init_metrics`] has been called, so
//! the engine can be embedded without any metrics setup.
//!
//! # Example
//!
//! ```rust,ignore
//! use chunkwise_metrics::{init_metrics, export_prometheus, inc_units_dispatched};
//!
//! init_metrics()?;
//! inc_units_dispatched("text", 1);
//! println!("{}", export_prometheus()?);
//! ```

pub mod counters;
pub mod gauges;
pub mod tracing_setup;

pub use counters::*;
pub use gauges::*;
pub use tracing_setup::{init_tracing, LogFormat, TracingConfig};

use ::prometheus::{Encoder, Registry, TextEncoder};
use std::sync::OnceLock;
use thiserror::Error;

/// Registry holding every chunkwise metric.
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Metrics error.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Metrics already initialized")]
    AlreadyInitialized,

    #[error("Metrics not initialized")]
    NotInitialized,

    #[error("Prometheus error: {0}")]
    PrometheusError(#[from] ::prometheus::Error),

    #[error("Tracing error: {0}")]
    TracingError(String),
}

/// Create the registry and register all counters and gauges.
pub fn init_metrics() -> Result<(), MetricsError> {
    let registry = Registry::new_custom(Some("chunkwise".to_string()), None)?;
    counters::init_counters(&registry)?;
    gauges::init_gauges(&registry)?;
    REGISTRY
        .set(registry)
        .map_err(|_| MetricsError::AlreadyInitialized)
}

/// Whether [`init_metrics`] has completed.
pub fn is_initialized() -> bool {
    REGISTRY.get().is_some()
}

/// Export metrics in Prometheus text format.
pub fn export_prometheus() -> Result<String, MetricsError> {
    let registry = REGISTRY.get().ok_or(MetricsError::NotInitialized)?;
    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
