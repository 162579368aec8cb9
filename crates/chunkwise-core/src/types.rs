//! Core types used throughout chunkwise.
//!
//! A [`WorkUnit`] travels from the dispatcher to exactly one worker and comes
//! back as exactly one [`ResultUnit`]. Both are plain values: once a unit has
//! been sent, nothing on the dispatcher side refers to it again.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};

/// Identity of one pool member. Worker ids start at 1; the dispatcher is rank 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub usize);

impl WorkerId {
    /// Create a worker id.
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    /// Get the numeric value.
    pub const fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker_{}", self.0)
    }
}

/// Kind of payload carried by a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Text chunk / word statistics.
    Text,
    /// Matrix / determinant.
    Matrix,
}

impl UnitKind {
    /// Label used for logs and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            UnitKind::Text => "text",
            UnitKind::Matrix => "matrix",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contiguous byte range of a text input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Chunk bytes; never longer than the broadcast `max_chunk_bytes`.
    pub bytes: Vec<u8>,

    /// Last byte of the previous chunk of the same input (a space for the first chunk).
    pub carry: u8,

    /// Whether this is the last chunk of its input.
    pub is_final: bool,
}

impl TextChunk {
    /// Create a chunk.
    pub fn new(bytes: Vec<u8>, carry: u8, is_final: bool) -> Self {
        Self {
            bytes,
            carry,
            is_final,
        }
    }

    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the chunk carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Last byte of this chunk, i.e. the carry for the next one.
    pub fn last_byte(&self) -> Option<u8> {
        self.bytes.last().copied()
    }
}

/// One square matrix and its position in the input's matrix collection.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixTask {
    /// Matrix order (rows == columns).
    pub order: usize,

    /// Position of the matrix within its file.
    pub index: usize,

    /// Row-major values, `order * order` of them.
    pub values: Vec<f64>,
}

impl MatrixTask {
    /// Create a matrix task.
    pub fn new(order: usize, index: usize, values: Vec<f64>) -> Self {
        Self {
            order,
            index,
            values,
        }
    }

    /// Whether the value count matches the order.
    pub fn is_well_formed(&self) -> bool {
        self.order > 0 && self.values.len() == self.order * self.order
    }
}

/// The unit of dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkUnit {
    /// Count words in a text chunk.
    Text(TextChunk),
    /// Compute one determinant.
    Matrix(MatrixTask),
}

impl WorkUnit {
    /// Kind of this unit.
    pub const fn kind(&self) -> UnitKind {
        match self {
            WorkUnit::Text(_) => UnitKind::Text,
            WorkUnit::Matrix(_) => UnitKind::Matrix,
        }
    }

    /// Matrix index, if this is a matrix unit.
    pub fn matrix_index(&self) -> Option<usize> {
        match self {
            WorkUnit::Matrix(task) => Some(task.index),
            WorkUnit::Text(_) => None,
        }
    }
}

/// Word statistics for a chunk or a whole input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    /// Number of words.
    pub words: u64,

    /// Words whose first byte is a vowel.
    pub vowel_start: u64,

    /// Words whose last byte is an alphabetic non-vowel.
    pub consonant_end: u64,
}

impl TextStats {
    /// Create stats from raw counts.
    pub const fn new(words: u64, vowel_start: u64, consonant_end: u64) -> Self {
        Self {
            words,
            vowel_start,
            consonant_end,
        }
    }

    /// Whether every counter is zero.
    pub const fn is_zero(&self) -> bool {
        self.words == 0 && self.vowel_start == 0 && self.consonant_end == 0
    }
}

impl Add for TextStats {
    type Output = TextStats;

    fn add(self, rhs: TextStats) -> TextStats {
        TextStats {
            words: self.words + rhs.words,
            vowel_start: self.vowel_start + rhs.vowel_start,
            consonant_end: self.consonant_end + rhs.consonant_end,
        }
    }
}

impl AddAssign for TextStats {
    fn add_assign(&mut self, rhs: TextStats) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for TextStats {
    fn sum<I: Iterator<Item = TextStats>>(iter: I) -> Self {
        iter.fold(TextStats::default(), Add::add)
    }
}

/// Partial result sent back by a worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResultUnit {
    /// Statistics for one text chunk.
    Text(TextStats),
    /// Determinant of the matrix at `index`.
    Determinant {
        /// Matrix index echoed from the task.
        index: usize,
        /// Determinant value.
        value: f64,
    },
}

impl ResultUnit {
    /// Kind of this result.
    pub const fn kind(&self) -> UnitKind {
        match self {
            ResultUnit::Text(_) => UnitKind::Text,
            ResultUnit::Determinant { .. } => UnitKind::Matrix,
        }
    }
}

/// The two values of the work-status flag that prefixes every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    /// A unit follows.
    WorkAvailable,
    /// All inputs are processed; the worker must exit.
    AllInputsProcessed,
}

/// Dispatcher-to-worker message.
///
/// The terminal variant carries no payload by construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Process this unit and reply.
    Work(WorkUnit),
    /// No more work exists; exit the loop.
    NoMoreWork,
}

impl Request {
    /// Status flag this request maps to.
    pub const fn status(&self) -> WorkStatus {
        match self {
            Request::Work(_) => WorkStatus::WorkAvailable,
            Request::NoMoreWork => WorkStatus::AllInputsProcessed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_sum() {
        let parts = vec![TextStats::new(3, 1, 2), TextStats::new(4, 2, 2), TextStats::default()];
        let total: TextStats = parts.into_iter().sum();
        assert_eq!(total, TextStats::new(7, 3, 4));
    }

    #[test]
    fn test_request_status() {
        let unit = WorkUnit::Matrix(MatrixTask::new(1, 0, vec![2.0]));
        assert_eq!(Request::Work(unit).status(), WorkStatus::WorkAvailable);
        assert_eq!(Request::NoMoreWork.status(), WorkStatus::AllInputsProcessed);
    }

    #[test]
    fn test_matrix_task_shape() {
        assert!(MatrixTask::new(2, 0, vec![1.0, 2.0, 3.0, 4.0]).is_well_formed());
        assert!(!MatrixTask::new(2, 0, vec![1.0, 2.0, 3.0]).is_well_formed());
        assert!(!MatrixTask::new(0, 0, vec![]).is_well_formed());
    }

    #[test]
    fn test_kinds_match() {
        let chunk = WorkUnit::Text(TextChunk::new(b"abc ".to_vec(), b' ', false));
        assert_eq!(chunk.kind(), ResultUnit::Text(TextStats::default()).kind());
        assert_eq!(chunk.matrix_index(), None);
        assert_eq!(
            ResultUnit::Determinant { index: 4, value: 1.0 }.kind(),
            UnitKind::Matrix
        );
    }

    #[test]
    fn test_worker_id_display() {
        assert_eq!(WorkerId::new(5).to_string(), "worker_5");
    }
}
