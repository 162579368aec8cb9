//! Per-input reduction of worker results.

use chunkwise_core::{Error, Result, ResultUnit, TextStats, WorkerId};

/// Reduction target for the results of one input.
pub trait Aggregate {
    /// Final value once every result is in.
    type Output;

    /// Fold one result in. `worker` is used for diagnostics only.
    fn merge(&mut self, worker: WorkerId, result: ResultUnit) -> Result<()>;

    /// Check completeness and produce the final value.
    fn finish(self) -> Result<Self::Output>;
}

/// Running sums of text statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextAggregate {
    stats: TextStats,
    chunks: usize,
}

impl TextAggregate {
    /// Empty aggregate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Totals so far.
    pub fn stats(&self) -> TextStats {
        self.stats
    }

    /// Chunks merged so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }
}

impl Aggregate for TextAggregate {
    type Output = (TextStats, usize);

    fn merge(&mut self, worker: WorkerId, result: ResultUnit) -> Result<()> {
        match result {
            ResultUnit::Text(stats) => {
                self.stats += stats;
                self.chunks += 1;
                Ok(())
            }
            other => Err(Error::protocol(
                worker,
                format!("sent a {} result for a text input", other.kind()),
            )),
        }
    }

    fn finish(self) -> Result<Self::Output> {
        Ok((self.stats, self.chunks))
    }
}

/// Determinants indexed by matrix position.
///
/// Complete once every index in `0..count` has been written exactly once.
/// Storage grows with the highest index merged so far, never with `count`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeterminantSet {
    count: usize,
    values: Vec<Option<f64>>,
    filled: usize,
}

/// Missing indices named in an incomplete-set error.
const MISSING_LISTED: usize = 8;

impl DeterminantSet {
    /// Set expecting `count` determinants.
    pub fn new(count: usize) -> Self {
        Self {
            count,
            values: Vec::new(),
            filled: 0,
        }
    }

    /// Number of determinants expected.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no determinant is expected.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether every index has a value.
    pub fn is_complete(&self) -> bool {
        self.filled == self.count
    }

    /// Value recorded at `index`, if any.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }
}

impl Aggregate for DeterminantSet {
    type Output = Vec<f64>;

    fn merge(&mut self, worker: WorkerId, result: ResultUnit) -> Result<()> {
        let (index, value) = match result {
            ResultUnit::Determinant { index, value } => (index, value),
            other => {
                return Err(Error::protocol(
                    worker,
                    format!("sent a {} result for a matrix input", other.kind()),
                ))
            }
        };

        if index >= self.count {
            return Err(Error::protocol(
                worker,
                format!("determinant index {index} out of range 0..{}", self.count),
            ));
        }
        if index >= self.values.len() {
            self.values.resize(index + 1, None);
        }

        let slot = &mut self.values[index];
        if slot.is_some() {
            return Err(Error::protocol(
                worker,
                format!("duplicate determinant for index {index}"),
            ));
        }

        *slot = Some(value);
        self.filled += 1;
        Ok(())
    }

    fn finish(self) -> Result<Self::Output> {
        if !self.is_complete() {
            let missing: Vec<String> = (0..self.count)
                .filter(|&i| self.get(i).is_none())
                .take(MISSING_LISTED)
                .map(|i| i.to_string())
                .collect();
            let unlisted = self.count - self.filled - missing.len();
            let more = if unlisted > 0 {
                format!(" and {unlisted} more")
            } else {
                String::new()
            };
            return Err(Error::internal(format!(
                "missing determinants for indices {}{more}",
                missing.join(", ")
            )));
        }
        Ok(self.values.into_iter().flatten().collect())
    }
}
