//! Pool lifecycle.
//!
//! The engine starts the worker threads, broadcasts the run parameters,
//! feeds inputs to the dispatcher one at a time and finally stops and joins
//! every worker.

use std::io::Read;
use std::path::Path;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, warn};
use validator::Validate;

use chunkwise_config::EngineConfig;
use chunkwise_core::{Error, Result, RunParams, TextStats, UnitKind, WorkerId};
use chunkwise_metrics as metrics;

use crate::aggregate::{DeterminantSet, TextAggregate};
use crate::dispatcher::Dispatcher;
use crate::source::{MatrixSource, TextSource, UnitSource};
use crate::transport::{pool_links, ChannelWorkerPort, PoolLinks};
use crate::worker::{Worker, WorkerSummary};

/// Word statistics for one text input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextReport {
    /// Input name.
    pub name: String,
    /// Totals over every chunk.
    pub stats: TextStats,
    /// Chunks the input was cut into.
    pub chunks: usize,
}

/// Determinants for one matrix input, in file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixReport {
    /// Input name.
    pub name: String,
    /// Matrix order.
    pub order: usize,
    /// One determinant per matrix.
    pub determinants: Vec<f64>,
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Per-worker unit counts, in worker order.
    pub workers: Vec<WorkerSummary>,
    /// Inputs processed.
    pub inputs: usize,
    /// Rounds run.
    pub rounds: u64,
}

impl RunSummary {
    /// Units answered across the pool.
    pub fn total_units(&self) -> u64 {
        self.workers.iter().map(|w| w.units).sum()
    }
}

/// Dispatcher plus a pool of worker threads.
pub struct Engine {
    params: RunParams,
    dispatcher: Dispatcher<ChannelWorkerPort>,
    handles: Vec<(WorkerId, JoinHandle<Result<WorkerSummary>>)>,
    inputs: usize,
    started: Instant,
    stopped: bool,
}

impl Engine {
    /// Validate the configuration, spawn the workers and broadcast the run
    /// parameters.
    pub fn start(config: &EngineConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::configuration(e.to_string()))?;
        let params = config.run_params();
        params.validate()?;

        let PoolLinks {
            broadcaster,
            worker_ports,
            dispatcher_ports,
        } = pool_links(config.workers);

        let mut handles = Vec::with_capacity(config.workers);
        for port in dispatcher_ports {
            let worker = Worker::new(port);
            let id = worker.id();
            let handle = std::thread::Builder::new()
                .name(format!("chunkwise-worker-{}", id.value()))
                .spawn(move || worker.run())
                .map_err(|e| Error::io(format!("failed to spawn {id}"), e))?;
            handles.push((id, handle));
        }

        let dispatcher = Dispatcher::new(worker_ports)?;
        broadcaster.broadcast(&params)?;
        metrics::set_pool_workers(config.workers);

        info!(
            workers = config.workers,
            max_chunk_bytes = params.max_chunk_bytes,
            kernel = params.kernel.as_str(),
            boundary = params.word_boundary.as_str(),
            "engine started"
        );

        Ok(Self {
            params,
            dispatcher,
            handles,
            inputs: 0,
            started: Instant::now(),
            stopped: false,
        })
    }

    /// Parameters broadcast to the workers.
    pub fn params(&self) -> &RunParams {
        &self.params
    }

    /// Pool size.
    pub fn workers(&self) -> usize {
        self.dispatcher.workers()
    }

    /// Time since start.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Process text files in order. Stops at the first failing input.
    pub fn process_text<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<Vec<TextReport>> {
        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let source = TextSource::open(path, self.params.max_chunk_bytes, self.params.word_boundary)
                .map_err(|e| {
                    error!(error = %e, "cannot open text input");
                    e
                })?;
            reports.push(self.run_text(source)?);
        }
        Ok(reports)
    }

    /// Process one text stream.
    pub fn process_text_reader<R: Read>(&mut self, name: impl Into<String>, reader: R) -> Result<TextReport> {
        let source = TextSource::from_reader(
            name,
            reader,
            self.params.max_chunk_bytes,
            self.params.word_boundary,
        )?;
        self.run_text(source)
    }

    fn run_text<R: Read>(&mut self, mut source: TextSource<R>) -> Result<TextReport> {
        let name = source.name().to_string();
        let span = metrics::input_span!(UnitKind::Text, name);
        let _enter = span.enter();

        let ((stats, chunks), input) = self
            .dispatcher
            .run_input(&mut source, TextAggregate::new())
            .map_err(|e| {
                error!(error = %e, "text input failed");
                e
            })?;

        self.complete(UnitKind::Text);
        info!(
            words = stats.words,
            vowel_start = stats.vowel_start,
            consonant_end = stats.consonant_end,
            chunks,
            rounds = input.rounds,
            "text input done"
        );

        Ok(TextReport {
            name,
            stats,
            chunks,
        })
    }

    /// Process matrix files in order. Stops at the first failing input.
    ///
    /// A file shorter than its header announces is rejected before any
    /// matrix is dispatched.
    pub fn process_matrices<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<Vec<MatrixReport>> {
        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let source = MatrixSource::open(path).map_err(|e| {
                error!(error = %e, "cannot open matrix input");
                e
            })?;
            reports.push(self.run_matrices(source)?);
        }
        Ok(reports)
    }

    /// Process one matrix stream.
    pub fn process_matrix_reader<R: Read>(
        &mut self,
        name: impl Into<String>,
        reader: R,
    ) -> Result<MatrixReport> {
        let source = MatrixSource::from_reader(name, reader)?;
        self.run_matrices(source)
    }

    fn run_matrices<R: Read>(&mut self, mut source: MatrixSource<R>) -> Result<MatrixReport> {
        let name = source.name().to_string();
        let span = metrics::input_span!(UnitKind::Matrix, name);
        let _enter = span.enter();

        let count = source.count();
        let (determinants, input) = self
            .dispatcher
            .run_input(&mut source, DeterminantSet::new(count))
            .map_err(|e| {
                error!(error = %e, "matrix input failed");
                e
            })?;

        self.complete(UnitKind::Matrix);
        info!(count, order = source.order(), rounds = input.rounds, "matrix input done");

        Ok(MatrixReport {
            name,
            order: source.order(),
            determinants,
        })
    }

    fn complete(&mut self, kind: UnitKind) {
        self.inputs += 1;
        metrics::inc_inputs_completed(kind.as_str());
    }

    /// Signal every worker to stop and join them.
    pub fn shutdown(mut self) -> Result<RunSummary> {
        self.stop()
    }

    fn stop(&mut self) -> Result<RunSummary> {
        self.stopped = true;
        let signalled = self.dispatcher.terminate();

        let mut workers = Vec::with_capacity(self.handles.len());
        let mut first_error = signalled.err();
        for (id, handle) in self.handles.drain(..) {
            match handle.join() {
                Ok(Ok(summary)) => workers.push(summary),
                Ok(Err(e)) => {
                    warn!(worker = %id, error = %e, "worker ended with an error");
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    warn!(worker = %id, "worker panicked");
                    first_error.get_or_insert(Error::worker_lost(id));
                }
            }
        }

        if let Some(e) = first_error {
            return Err(e);
        }

        let summary = RunSummary {
            workers,
            inputs: self.inputs,
            rounds: self.dispatcher.rounds(),
        };
        info!(
            inputs = summary.inputs,
            rounds = summary.rounds,
            units = summary.total_units(),
            elapsed_ms = self.elapsed().as_millis() as u64,
            "engine stopped"
        );
        Ok(summary)
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.stopped {
            if let Err(e) = self.stop() {
                warn!(error = %e, "engine dropped without a clean shutdown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::write_matrices;
    use chunkwise_core::{KernelMode, WordBoundary};
    use proptest::prelude::*;
    use std::io::{Cursor, Write};

    const SAMPLE: &str = "The cat sat. An owl flew up.";

    fn config(workers: usize) -> EngineConfig {
        EngineConfig::default()
            .with_workers(workers)
            .with_max_chunk_bytes(11)
    }

    #[test]
    fn test_rejects_empty_pool() {
        let err = Engine::start(&config(0)).err().unwrap();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_text_same_for_any_chunking() {
        for (workers, max) in [(1, 11), (3, 11), (2, 64), (4, 2500)] {
            let mut engine = Engine::start(&config(workers).with_max_chunk_bytes(max)).unwrap();
            let report = engine
                .process_text_reader("sample", Cursor::new(SAMPLE))
                .unwrap();
            assert_eq!(report.stats, TextStats::new(7, 3, 4), "workers={workers} max={max}");
            assert_eq!(report.name, "sample");
            engine.shutdown().unwrap();
        }
    }

    #[test]
    fn test_text_punctuation_boundary() {
        let cfg = config(2).with_word_boundary(WordBoundary::Punctuation);
        let mut engine = Engine::start(&cfg).unwrap();
        let report = engine
            .process_text_reader("sample", Cursor::new(SAMPLE))
            .unwrap();
        assert_eq!(report.stats, TextStats::new(7, 3, 6));
        assert_eq!(report.chunks, 4);
    }

    fn example_matrices() -> Vec<u8> {
        let mut bytes = Vec::new();
        write_matrices(&mut bytes, 2, &[vec![1.0, 2.0, 3.0, 4.0], vec![2.0, 0.0, 0.0, 2.0]])
            .unwrap();
        bytes
    }

    #[test]
    fn test_matrices_single_worker() {
        for kernel in [
            KernelMode::Auto,
            KernelMode::Sequential,
            KernelMode::RowParallel,
            KernelMode::ParallelFor,
        ] {
            let mut engine = Engine::start(&config(1).with_kernel(kernel)).unwrap();
            let report = engine
                .process_matrix_reader("pair", Cursor::new(example_matrices()))
                .unwrap();
            assert_eq!(report.order, 2);
            assert_eq!(report.determinants.len(), 2);
            assert!((report.determinants[0] + 2.0).abs() < 1e-12);
            assert!((report.determinants[1] - 4.0).abs() < 1e-12);

            let summary = engine.shutdown().unwrap();
            assert_eq!(summary.inputs, 1);
            assert_eq!(summary.total_units(), 2);
            assert_eq!(summary.rounds, 2);
        }
    }

    #[test]
    fn test_files_processed_in_order() {
        let mut text = tempfile::NamedTempFile::new().unwrap();
        text.write_all(SAMPLE.as_bytes()).unwrap();
        let mut matrices = tempfile::NamedTempFile::new().unwrap();
        matrices.write_all(&example_matrices()).unwrap();

        let mut engine = Engine::start(&config(3)).unwrap();
        let texts = engine.process_text(&[text.path(), text.path()]).unwrap();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0].stats, texts[1].stats);

        let mats = engine.process_matrices(&[matrices.path()]).unwrap();
        assert_eq!(mats[0].determinants.len(), 2);

        let summary = engine.shutdown().unwrap();
        assert_eq!(summary.inputs, 3);
        assert_eq!(summary.workers.len(), 3);
    }

    #[test]
    fn test_missing_input_aborts_but_pool_stops() {
        let mut engine = Engine::start(&config(2)).unwrap();
        let err = engine
            .process_text(&["/no/such/input.txt"])
            .unwrap_err();
        assert_eq!(err.error_code(), "INPUT_ACCESS_ERROR");
        assert!(engine.shutdown().is_ok());
    }

    #[test]
    fn test_truncated_matrices_abort() {
        let mut bytes = example_matrices();
        bytes.truncate(bytes.len() - 4);
        let mut engine = Engine::start(&config(4)).unwrap();
        let err = engine
            .process_matrix_reader("broken", Cursor::new(bytes))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_INPUT");
        assert!(engine.shutdown().is_ok());
    }

    #[test]
    fn test_oversized_headers_rejected() {
        let mut engine = Engine::start(&config(2)).unwrap();
        for (count, order) in [(1i32, 1i32 << 24), (i32::MAX, 1)] {
            let mut bytes = count.to_le_bytes().to_vec();
            bytes.extend_from_slice(&order.to_le_bytes());
            let err = engine
                .process_matrix_reader("oversized", Cursor::new(bytes.clone()))
                .unwrap_err();
            assert_eq!(err.error_code(), "INVALID_INPUT");
            assert!(err.to_string().contains("truncated matrix 0"));

            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(&bytes).unwrap();
            let err = engine.process_matrices(&[file.path()]).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_INPUT");
        }
        assert_eq!(engine.shutdown().unwrap().inputs, 0);
    }

    #[test]
    fn test_drop_stops_workers() {
        let engine = Engine::start(&config(2)).unwrap();
        drop(engine);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_every_index_once(count in 0usize..40, workers in 1usize..6) {
            let matrices: Vec<Vec<f64>> = (0..count).map(|i| vec![i as f64 + 1.0]).collect();
            let mut bytes = Vec::new();
            write_matrices(&mut bytes, 1, &matrices).unwrap();

            let mut engine = Engine::start(&config(workers)).unwrap();
            let report = engine.process_matrix_reader("many", Cursor::new(bytes)).unwrap();
            let expected: Vec<f64> = (0..count).map(|i| i as f64 + 1.0).collect();
            prop_assert_eq!(report.determinants, expected);

            let summary = engine.shutdown().unwrap();
            prop_assert_eq!(summary.total_units(), count as u64);
            prop_assert_eq!(summary.rounds, count.div_ceil(workers) as u64);
        }
    }
}
