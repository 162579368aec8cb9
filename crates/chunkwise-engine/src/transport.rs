//! Message passing between the dispatcher and its workers.
//!
//! Each worker gets a duplex link: a request channel from the dispatcher and
//! a result channel back. Run parameters travel once, through the
//! [`Broadcaster`], before any request. The dispatcher and workers only see
//! the [`WorkerPort`] and [`DispatcherPort`] traits, so other substrates can
//! be swapped in.

use crossbeam_channel::{bounded, Receiver, Sender};

use chunkwise_core::{Error, Request, Result, ResultUnit, RunParams, WorkerId};

/// Dispatcher-side end of one worker link.
pub trait WorkerPort {
    /// Worker on the other end.
    fn id(&self) -> WorkerId;

    /// Send a request. Blocks while the previous one is still queued.
    fn send(&self, request: Request) -> Result<()>;

    /// Block until the worker replies.
    fn recv(&self) -> Result<ResultUnit>;
}

/// Worker-side end of its link.
pub trait DispatcherPort {
    /// Worker owning this end.
    fn id(&self) -> WorkerId;

    /// Block until the broadcast run parameters arrive.
    fn receive_params(&self) -> Result<RunParams>;

    /// Block until the next request arrives.
    fn receive(&self) -> Result<Request>;

    /// Send the result of the current unit.
    fn reply(&self, result: ResultUnit) -> Result<()>;
}

/// Channel-backed [`WorkerPort`].
#[derive(Debug)]
pub struct ChannelWorkerPort {
    id: WorkerId,
    requests: Sender<Request>,
    results: Receiver<ResultUnit>,
}

impl WorkerPort for ChannelWorkerPort {
    fn id(&self) -> WorkerId {
        self.id
    }

    fn send(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| Error::worker_lost(self.id))
    }

    fn recv(&self) -> Result<ResultUnit> {
        self.results.recv().map_err(|_| Error::worker_lost(self.id))
    }
}

/// Channel-backed [`DispatcherPort`].
#[derive(Debug)]
pub struct ChannelDispatcherPort {
    id: WorkerId,
    params: Receiver<RunParams>,
    requests: Receiver<Request>,
    results: Sender<ResultUnit>,
}

impl ChannelDispatcherPort {
    fn hung_up(&self) -> Error {
        Error::internal(format!("dispatcher hung up on {}", self.id))
    }
}

impl DispatcherPort for ChannelDispatcherPort {
    fn id(&self) -> WorkerId {
        self.id
    }

    fn receive_params(&self) -> Result<RunParams> {
        self.params.recv().map_err(|_| self.hung_up())
    }

    fn receive(&self) -> Result<Request> {
        self.requests.recv().map_err(|_| self.hung_up())
    }

    fn reply(&self, result: ResultUnit) -> Result<()> {
        self.results.send(result).map_err(|_| self.hung_up())
    }
}

/// One-shot broadcast of the run parameters to every worker.
#[derive(Debug)]
pub struct Broadcaster {
    targets: Vec<(WorkerId, Sender<RunParams>)>,
}

impl Broadcaster {
    /// Number of workers reached by the broadcast.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether there is nobody to broadcast to.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Send `params` to every worker. Consumes the broadcaster, so the
    /// parameters can only be sent once per pool.
    pub fn broadcast(self, params: &RunParams) -> Result<()> {
        for (id, target) in self.targets {
            target.send(*params).map_err(|_| Error::worker_lost(id))?;
        }
        Ok(())
    }
}

/// Links for a pool of `workers` workers, numbered from 1.
pub struct PoolLinks {
    /// Broadcast primitive for the run parameters.
    pub broadcaster: Broadcaster,
    /// Dispatcher ends, in worker order.
    pub worker_ports: Vec<ChannelWorkerPort>,
    /// Worker ends, in worker order.
    pub dispatcher_ports: Vec<ChannelDispatcherPort>,
}

/// Create one duplex link per worker plus the broadcaster.
///
/// Every channel holds a single message: at most one unit is in flight per
/// worker, and a reply can always be queued without waiting for the
/// dispatcher.
pub fn pool_links(workers: usize) -> PoolLinks {
    let mut targets = Vec::with_capacity(workers);
    let mut worker_ports = Vec::with_capacity(workers);
    let mut dispatcher_ports = Vec::with_capacity(workers);

    for n in 1..=workers {
        let id = WorkerId::new(n);
        let (params_tx, params_rx) = bounded(1);
        let (request_tx, request_rx) = bounded(1);
        let (result_tx, result_rx) = bounded(1);

        targets.push((id, params_tx));
        worker_ports.push(ChannelWorkerPort {
            id,
            requests: request_tx,
            results: result_rx,
        });
        dispatcher_ports.push(ChannelDispatcherPort {
            id,
            params: params_rx,
            requests: request_rx,
            results: result_tx,
        });
    }

    PoolLinks {
        broadcaster: Broadcaster { targets },
        worker_ports,
        dispatcher_ports,
    }
}
