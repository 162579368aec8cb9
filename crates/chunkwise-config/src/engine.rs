//! Engine configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use chunkwise_core::{
    KernelMode, RunParams, WordBoundary, DEFAULT_CHUNK_BYTES, DEFAULT_MAX_LANES, DEFAULT_WORKERS,
};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Number of worker threads (the dispatcher is not counted).
    #[serde(default = "default_workers")]
    #[validate(range(min = 1, message = "the pool needs at least one worker"))]
    pub workers: usize,

    /// Maximum bytes per text chunk.
    #[serde(default = "default_max_chunk_bytes")]
    #[validate(range(min = 11, message = "chunks must be at least 11 bytes"))]
    pub max_chunk_bytes: usize,

    /// Determinant kernel.
    #[serde(default)]
    pub kernel: KernelMode,

    /// Lane ceiling for the auto kernel.
    #[serde(default = "default_max_lanes")]
    #[validate(range(min = 1, max = 1024, message = "max_lanes must be between 1 and 1024"))]
    pub max_lanes: usize,

    /// Word boundary policy.
    #[serde(default)]
    pub word_boundary: WordBoundary,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_chunk_bytes: DEFAULT_CHUNK_BYTES,
            kernel: KernelMode::default(),
            max_lanes: DEFAULT_MAX_LANES,
            word_boundary: WordBoundary::default(),
        }
    }
}

impl EngineConfig {
    /// Parameters broadcast to every worker.
    pub fn run_params(&self) -> RunParams {
        RunParams {
            max_chunk_bytes: self.max_chunk_bytes,
            word_boundary: self.word_boundary,
            kernel: self.kernel,
            max_lanes: self.max_lanes,
        }
    }

    /// Builder-style worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Builder-style chunk size.
    pub fn with_max_chunk_bytes(mut self, max_chunk_bytes: usize) -> Self {
        self.max_chunk_bytes = max_chunk_bytes;
        self
    }

    /// Builder-style kernel selection.
    pub fn with_kernel(mut self, kernel: KernelMode) -> Self {
        self.kernel = kernel;
        self
    }

    /// Builder-style boundary policy.
    pub fn with_word_boundary(mut self, word_boundary: WordBoundary) -> Self {
        self.word_boundary = word_boundary;
        self
    }
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_max_chunk_bytes() -> usize {
    DEFAULT_CHUNK_BYTES
}

fn default_max_lanes() -> usize {
    DEFAULT_MAX_LANES
}
