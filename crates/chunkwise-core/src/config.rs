//! Run parameters shared between the dispatcher and its workers.
//!
//! The dispatcher broadcasts a [`RunParams`] value exactly once, before any
//! work is sent, so every worker can size its scratch buffers up front.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest chunk size the dispatcher accepts.
pub const MIN_CHUNK_BYTES: usize = 11;

/// Chunk size used when nothing else is configured.
pub const DEFAULT_CHUNK_BYTES: usize = 2500;

/// Default number of workers in the pool (the dispatcher is not counted).
pub const DEFAULT_WORKERS: usize = 4;

/// Default upper bound on compute lanes spawned by [`KernelMode::Auto`].
pub const DEFAULT_MAX_LANES: usize = 64;

/// Most compute lanes a run may allow; each lane is an OS thread.
pub const MAX_LANES_LIMIT: usize = 1024;

/// How the determinant kernel runs its elimination loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KernelMode {
    /// Row-parallel when the order fits in `max_lanes`, sequential otherwise.
    #[default]
    Auto,
    /// Single-threaded Gaussian elimination.
    Sequential,
    /// One lane per matrix row, two barriers per elimination step.
    RowParallel,
    /// Work-stealing parallel-for over the rows below the pivot.
    ParallelFor,
}

impl KernelMode {
    /// Stable name used in logs and configuration files.
    pub const fn as_str(&self) -> &'static str {
        match self {
            KernelMode::Auto => "auto",
            KernelMode::Sequential => "sequential",
            KernelMode::RowParallel => "row_parallel",
            KernelMode::ParallelFor => "parallel_for",
        }
    }

    /// Parse a kernel name. Accepts `-` or `_` as word separator.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "auto" => Some(Self::Auto),
            "sequential" | "serial" => Some(Self::Sequential),
            "row_parallel" | "lanes" => Some(Self::RowParallel),
            "parallel_for" | "rayon" => Some(Self::ParallelFor),
            _ => None,
        }
    }
}

/// Which bytes end a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WordBoundary {
    /// Space, tab, newline and carriage return.
    #[default]
    Whitespace,
    /// Whitespace plus ASCII separation and punctuation marks.
    Punctuation,
}

impl WordBoundary {
    /// Stable name used in logs and configuration files.
    pub const fn as_str(&self) -> &'static str {
        match self {
            WordBoundary::Whitespace => "whitespace",
            WordBoundary::Punctuation => "punctuation",
        }
    }

    /// Parse a boundary policy name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "whitespace" | "ws" => Some(Self::Whitespace),
            "punctuation" | "punct" => Some(Self::Punctuation),
            _ => None,
        }
    }

    /// Whether `byte` terminates a word under this policy.
    #[inline]
    pub const fn is_separator(&self, byte: u8) -> bool {
        let whitespace = matches!(byte, b' ' | b'\t' | b'\n' | b'\r');
        match self {
            WordBoundary::Whitespace => whitespace,
            WordBoundary::Punctuation => {
                whitespace
                    || matches!(
                        byte,
                        b'"' | b'(' | b')' | b'-' | b'[' | b']' | b'!' | b',' | b'.' | b':' | b';' | b'?'
                    )
            }
        }
    }
}

/// Parameters broadcast once to every worker at pool start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParams {
    /// Upper bound on the length of any text chunk.
    pub max_chunk_bytes: usize,

    /// Word boundary policy used by the text parser.
    pub word_boundary: WordBoundary,

    /// Determinant kernel selection.
    pub kernel: KernelMode,

    /// Lane ceiling for [`KernelMode::Auto`].
    pub max_lanes: usize,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            max_chunk_bytes: DEFAULT_CHUNK_BYTES,
            word_boundary: WordBoundary::default(),
            kernel: KernelMode::default(),
            max_lanes: DEFAULT_MAX_LANES,
        }
    }
}

impl RunParams {
    /// Check the invariants workers rely on.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_bytes < MIN_CHUNK_BYTES {
            return Err(Error::configuration(format!(
                "max_chunk_bytes must be at least {MIN_CHUNK_BYTES}, got {}",
                self.max_chunk_bytes
            )));
        }
        if !(1..=MAX_LANES_LIMIT).contains(&self.max_lanes) {
            return Err(Error::configuration(format!(
                "max_lanes must be between 1 and {MAX_LANES_LIMIT}, got {}",
                self.max_lanes
            )));
        }
        Ok(())
    }
}
