//! # Chunkwise Core
//!
//! Core types shared by every crate of the chunkwise engine.
//!
//! This crate provides the foundational abstractions used throughout chunkwise:
//!
//! - **Error handling**: one workspace error type with structured variants
//! - **Run parameters**: the configuration broadcast from the dispatcher to workers
//! - **Work units**: the tagged payloads sent to workers and the results they send back
//!
//! ## Example
//!
//! ```rust
//! use chunkwise_core::{ResultUnit, TextStats, WorkUnit, TextChunk};
//!
//! let unit = WorkUnit::Text(TextChunk::new(b"an owl".to_vec(), b' ', true));
//! assert_eq!(unit.kind().as_str(), "text");
//!
//! let result = ResultUnit::Text(TextStats::new(2, 2, 1));
//! assert_eq!(result.kind(), unit.kind());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::{Error, Result};
pub use types::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::*;
    pub use crate::error::{Error, Result};
    pub use crate::types::*;
}
