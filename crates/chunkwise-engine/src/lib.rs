//! # Chunkwise Engine
//!
//! Dispatcher/worker engine that splits an input into work units, fans them
//! out over a fixed pool of worker threads in rounds, and reduces the partial
//! results per input.
//!
//! ## Architecture
//!
//! - **Source**: cuts a text stream into word-aligned chunks, or reads matrices
//!   from the binary matrix format
//! - **Dispatcher**: assigns one unit per idle worker per round and merges the
//!   replies once the round is complete
//! - **Worker**: answers requests with the text parser or the determinant kernel
//!   until told to stop
//! - **Transport**: one duplex channel per worker plus a one-shot broadcast
//!
//! ## Example
//!
//! ```rust,no_run
//! use chunkwise_config::EngineConfig;
//! use chunkwise_engine::Engine;
//!
//! # fn main() -> chunkwise_core::Result<()> {
//! let mut engine = Engine::start(&EngineConfig::default().with_workers(2))?;
//! let report = engine.process_text_reader("inline", "An owl flew up.".as_bytes())?;
//! assert_eq!(report.stats.words, 4);
//! engine.shutdown()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod determinant;
pub mod dispatcher;
pub mod engine;
pub mod source;
pub mod text;
pub mod transport;
pub mod worker;

pub use aggregate::*;
pub use determinant::*;
pub use dispatcher::*;
pub use engine::*;
pub use source::*;
pub use text::*;
pub use transport::*;
pub use worker::*;

/// Prelude for common imports
pub mod prelude {
    pub use super::engine::*;
    pub use super::source::{MatrixSource, TextSource, UnitSource};
    pub use super::text::ChunkBoundaryParser;
}
