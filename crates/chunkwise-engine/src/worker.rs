//! Worker request/response loop.
//!
//! A worker waits for the broadcast run parameters, then answers one request
//! at a time until it receives the terminal signal. Nothing survives from one
//! unit to the next except the matrix scratch buffer.

use serde::Serialize;
use tracing::{debug, error, info};

use chunkwise_core::{Error, Request, Result, ResultUnit, RunParams, WorkUnit, WorkerId};

use crate::determinant::NumericKernel;
use crate::text::ChunkBoundaryParser;
use crate::transport::DispatcherPort;

/// Worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Waiting for a request.
    AwaitingWork,
    /// Computing a unit.
    Processing,
    /// Received the terminal signal.
    Terminated,
}

/// What a worker reports when its loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    /// Worker id.
    pub worker: WorkerId,
    /// Units answered.
    pub units: u64,
}

/// Kernels configured from the run parameters.
#[derive(Debug, Clone, Copy)]
struct Kernels {
    parser: ChunkBoundaryParser,
    numeric: NumericKernel,
    max_chunk_bytes: usize,
}

impl Kernels {
    fn from_params(params: &RunParams) -> Self {
        Self {
            parser: ChunkBoundaryParser::new(params.word_boundary),
            numeric: NumericKernel::from_params(params),
            max_chunk_bytes: params.max_chunk_bytes,
        }
    }
}

/// One pool member.
#[derive(Debug)]
pub struct Worker<P> {
    port: P,
    state: WorkerState,
    matrix_scratch: Vec<f64>,
    units: u64,
}

impl<P: DispatcherPort> Worker<P> {
    /// Create a worker on its end of the link.
    pub fn new(port: P) -> Self {
        Self {
            port,
            state: WorkerState::AwaitingWork,
            matrix_scratch: Vec::new(),
            units: 0,
        }
    }

    /// Worker id.
    pub fn id(&self) -> WorkerId {
        self.port.id()
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Run until the terminal signal arrives.
    pub fn run(mut self) -> Result<WorkerSummary> {
        let params = self.port.receive_params()?;
        params.validate()?;
        let kernels = Kernels::from_params(&params);

        info!(
            worker = %self.id(),
            max_chunk_bytes = params.max_chunk_bytes,
            kernel = params.kernel.as_str(),
            boundary = params.word_boundary.as_str(),
            "worker ready"
        );

        loop {
            match self.port.receive()? {
                Request::Work(unit) => {
                    self.state = WorkerState::Processing;
                    let result = match self.process(&kernels, unit) {
                        Ok(result) => result,
                        Err(e) => {
                            error!(worker = %self.id(), error = %e, "unit failed");
                            return Err(e);
                        }
                    };
                    self.port.reply(result)?;
                    self.units += 1;
                    self.state = WorkerState::AwaitingWork;
                }
                Request::NoMoreWork => {
                    self.state = WorkerState::Terminated;
                    break;
                }
            }
        }

        debug!(worker = %self.id(), units = self.units, "worker exiting");
        Ok(WorkerSummary {
            worker: self.id(),
            units: self.units,
        })
    }

    fn process(&mut self, kernels: &Kernels, unit: WorkUnit) -> Result<ResultUnit> {
        match unit {
            WorkUnit::Text(chunk) => {
                if chunk.len() > kernels.max_chunk_bytes {
                    return Err(Error::protocol(
                        self.id(),
                        format!(
                            "received a {} byte chunk, limit is {}",
                            chunk.len(),
                            kernels.max_chunk_bytes
                        ),
                    ));
                }
                Ok(ResultUnit::Text(kernels.parser.parse(&chunk)))
            }
            WorkUnit::Matrix(task) => {
                let value = kernels
                    .numeric
                    .determinant(&task, &mut self.matrix_scratch)?;
                Ok(ResultUnit::Determinant {
                    index: task.index,
                    value,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{pool_links, PoolLinks, WorkerPort};
    use chunkwise_core::{MatrixTask, TextChunk, TextStats};

    #[test]
    fn test_answers_until_terminated() {
        let PoolLinks {
            broadcaster,
            mut worker_ports,
            mut dispatcher_ports,
        } = pool_links(1);
        let port = worker_ports.remove(0);
        let worker = Worker::new(dispatcher_ports.remove(0));
        assert_eq!(worker.state(), WorkerState::AwaitingWork);

        let handle = std::thread::spawn(move || worker.run());
        broadcaster.broadcast(&RunParams::default()).unwrap();

        let chunk = TextChunk::new(b"An owl flew".to_vec(), b' ', true);
        port.send(Request::Work(WorkUnit::Text(chunk))).unwrap();
        assert_eq!(port.recv().unwrap(), ResultUnit::Text(TextStats::new(3, 2, 3)));

        let task = MatrixTask::new(2, 5, vec![1.0, 2.0, 3.0, 4.0]);
        port.send(Request::Work(WorkUnit::Matrix(task))).unwrap();
        match port.recv().unwrap() {
            ResultUnit::Determinant { index, value } => {
                assert_eq!(index, 5);
                assert!((value + 2.0).abs() < 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }

        port.send(Request::NoMoreWork).unwrap();
        let summary = handle.join().unwrap().unwrap();
        assert_eq!(summary.units, 2);
        assert_eq!(summary.worker, WorkerId::new(1));
    }

    #[test]
    fn test_oversized_chunk_stops_worker() {
        let PoolLinks {
            broadcaster,
            mut worker_ports,
            mut dispatcher_ports,
        } = pool_links(1);
        let port = worker_ports.remove(0);
        let worker = Worker::new(dispatcher_ports.remove(0));
        let handle = std::thread::spawn(move || worker.run());

        let params = RunParams {
            max_chunk_bytes: 11,
            ..RunParams::default()
        };
        broadcaster.broadcast(&params).unwrap();

        let chunk = TextChunk::new(vec![b'a'; 12], b' ', true);
        port.send(Request::Work(WorkUnit::Text(chunk))).unwrap();

        let err = handle.join().unwrap().unwrap_err();
        assert_eq!(err.error_code(), "PROTOCOL_VIOLATION");
        assert_eq!(port.recv().unwrap_err().error_code(), "WORKER_LOST");
    }

    #[test]
    fn test_exits_without_params() {
        let PoolLinks {
            mut dispatcher_ports,
            ..
        } = pool_links(1);
        let worker = Worker::new(dispatcher_ports.remove(0));
        assert!(worker.run().is_err());
    }
}
