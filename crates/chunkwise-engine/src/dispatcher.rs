//! Dispatcher: rounds of unit assignment over a fixed worker pool.
//!
//! A round hands one unit to each idle slot, in slot order, until the slots
//! or the units run out, then blocks until every slot used in the round has
//! replied. Nothing is merged until the round is complete. The last round of
//! an input may use fewer slots than the pool has.

use tracing::{debug, info, warn};

use chunkwise_core::{Error, Request, Result, ResultUnit, UnitKind, WorkUnit, WorkerId};
use chunkwise_metrics as metrics;

use crate::aggregate::Aggregate;
use crate::source::UnitSource;
use crate::transport::WorkerPort;

/// What a busy slot is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// A text chunk.
    Text,
    /// The determinant of the matrix at this index.
    Matrix(usize),
}

impl Assignment {
    fn of(unit: &WorkUnit) -> Self {
        match unit {
            WorkUnit::Text(_) => Assignment::Text,
            WorkUnit::Matrix(task) => Assignment::Matrix(task.index),
        }
    }

    /// Whether `result` answers this assignment.
    fn accepts(&self, result: &ResultUnit) -> bool {
        match (self, result) {
            (Assignment::Text, ResultUnit::Text(_)) => true,
            (Assignment::Matrix(expected), ResultUnit::Determinant { index, .. }) => {
                expected == index
            }
            _ => false,
        }
    }
}

/// Slot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Ready for a unit.
    Idle,
    /// One unit in flight.
    Busy(Assignment),
}

/// One pool member as seen by the dispatcher.
#[derive(Debug)]
pub struct WorkerSlot<P> {
    port: P,
    state: SlotState,
    units: u64,
}

impl<P: WorkerPort> WorkerSlot<P> {
    fn new(port: P) -> Self {
        Self {
            port,
            state: SlotState::Idle,
            units: 0,
        }
    }

    /// Worker behind this slot.
    pub fn id(&self) -> WorkerId {
        self.port.id()
    }

    /// Current state.
    pub fn state(&self) -> SlotState {
        self.state
    }

    /// Units dispatched to this slot so far.
    pub fn units(&self) -> u64 {
        self.units
    }

    fn dispatch(&mut self, unit: WorkUnit) -> Result<()> {
        if let SlotState::Busy(_) = self.state {
            return Err(Error::internal(format!(
                "{} already has a unit in flight",
                self.id()
            )));
        }
        let assignment = Assignment::of(&unit);
        self.port.send(Request::Work(unit))?;
        self.state = SlotState::Busy(assignment);
        self.units += 1;
        Ok(())
    }

    fn collect(&mut self) -> Result<ResultUnit> {
        let SlotState::Busy(assignment) = self.state else {
            return Err(Error::internal(format!("{} has no unit in flight", self.id())));
        };
        let result = self.port.recv()?;
        self.state = SlotState::Idle;

        if !assignment.accepts(&result) {
            return Err(Error::protocol(
                self.id(),
                format!("reply {result:?} does not answer {assignment:?}"),
            ));
        }
        Ok(result)
    }
}

/// Statistics for one processed input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputStats {
    /// Units dispatched.
    pub units: u64,
    /// Rounds run.
    pub rounds: u64,
}

/// Owns the worker slots and drives inputs through them.
#[derive(Debug)]
pub struct Dispatcher<P> {
    slots: Vec<WorkerSlot<P>>,
    rounds: u64,
    terminated: bool,
}

impl<P: WorkerPort> Dispatcher<P> {
    /// Create a dispatcher over the given ports.
    ///
    /// At least one port is required.
    pub fn new(ports: Vec<P>) -> Result<Self> {
        if ports.is_empty() {
            return Err(Error::configuration(
                "requires at least one worker besides the dispatcher",
            ));
        }
        Ok(Self {
            slots: ports.into_iter().map(WorkerSlot::new).collect(),
            rounds: 0,
            terminated: false,
        })
    }

    /// Pool size.
    pub fn workers(&self) -> usize {
        self.slots.len()
    }

    /// Slots in worker order.
    pub fn slots(&self) -> &[WorkerSlot<P>] {
        &self.slots
    }

    /// Rounds run over all inputs.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Whether [`terminate`](Self::terminate) has run.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Drive one input to completion and reduce its results.
    ///
    /// On error, replies still owed by busy workers are drained before
    /// returning, so the pool can be terminated cleanly afterwards.
    pub fn run_input<S, A>(&mut self, source: &mut S, mut aggregate: A) -> Result<(A::Output, InputStats)>
    where
        S: UnitSource + ?Sized,
        A: Aggregate,
    {
        if self.terminated {
            return Err(Error::internal("dispatcher already terminated"));
        }

        let kind = source.kind();
        let mut stats = InputStats::default();

        loop {
            match self.run_round(source, &mut aggregate, kind) {
                Ok(0) => break,
                Ok(used) => {
                    stats.units += used as u64;
                    stats.rounds += 1;
                }
                Err(e) => {
                    self.drain();
                    return Err(e);
                }
            }
        }

        let output = aggregate.finish()?;
        debug!(
            input = %source.name(),
            units = stats.units,
            rounds = stats.rounds,
            "input reduced"
        );
        Ok((output, stats))
    }

    /// One round. Returns the number of slots used, zero once the source is
    /// exhausted.
    fn run_round<S, A>(&mut self, source: &mut S, aggregate: &mut A, kind: UnitKind) -> Result<usize>
    where
        S: UnitSource + ?Sized,
        A: Aggregate,
    {
        let mut used = 0;
        for slot in &mut self.slots {
            let Some(unit) = source.next_unit()? else {
                break;
            };
            slot.dispatch(unit)?;
            used += 1;
        }

        if used == 0 {
            return Ok(0);
        }

        self.rounds += 1;
        metrics::inc_units_dispatched(kind.as_str(), used as u64);
        metrics::set_busy_workers(used);
        debug!(round = self.rounds, used, kind = %kind, "round dispatched");

        // Full barrier: every reply is in before anything is merged.
        let mut replies = Vec::with_capacity(used);
        for slot in &mut self.slots[..used] {
            replies.push((slot.id(), slot.collect()?));
        }
        metrics::set_busy_workers(0);

        for (worker, result) in replies {
            aggregate.merge(worker, result)?;
        }
        metrics::inc_results_merged(kind.as_str(), used as u64);
        metrics::inc_rounds(kind.as_str());

        Ok(used)
    }

    /// Wait out every unit still in flight, discarding the replies.
    fn drain(&mut self) {
        for slot in &mut self.slots {
            if let SlotState::Busy(assignment) = slot.state {
                slot.state = SlotState::Idle;
                match slot.port.recv() {
                    Ok(_) => warn!(worker = %slot.id(), ?assignment, "discarded reply after failed input"),
                    Err(e) => warn!(worker = %slot.id(), error = %e, "lost reply while draining"),
                }
            }
        }
        metrics::set_busy_workers(0);
    }

    /// Send the terminal signal to every worker, exactly once.
    ///
    /// Later calls are no-ops. Units still in flight are drained first.
    pub fn terminate(&mut self) -> Result<()> {
        if self.terminated {
            return Ok(());
        }
        self.drain();
        self.terminated = true;

        let mut first_error = None;
        for slot in &self.slots {
            if let Err(e) = slot.port.send(Request::NoMoreWork) {
                warn!(worker = %slot.id(), error = %e, "could not deliver termination");
                first_error.get_or_insert(e);
            }
        }

        info!(workers = self.slots.len(), rounds = self.rounds, "workers signalled to stop");
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{DeterminantSet, TextAggregate};
    use chunkwise_core::{MatrixTask, TextChunk, TextStats};
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// How a fake worker mangles its reply.
    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Reply {
        Honest,
        WrongIndex,
        WrongKind,
    }

    /// Answers synchronously on `recv` from the last request it was sent.
    #[derive(Debug)]
    struct FakePort {
        id: WorkerId,
        reply: Reply,
        inbox: Mutex<VecDeque<Request>>,
        log: Mutex<Vec<Request>>,
    }

    impl FakePort {
        fn new(id: usize, reply: Reply) -> Self {
            Self {
                id: WorkerId::new(id),
                reply,
                inbox: Mutex::new(VecDeque::new()),
                log: Mutex::new(Vec::new()),
            }
        }
    }

    impl WorkerPort for FakePort {
        fn id(&self) -> WorkerId {
            self.id
        }

        fn send(&self, request: Request) -> Result<()> {
            self.log.lock().push(request.clone());
            self.inbox.lock().push_back(request);
            Ok(())
        }

        fn recv(&self) -> Result<ResultUnit> {
            let Some(Request::Work(unit)) = self.inbox.lock().pop_front() else {
                return Err(Error::worker_lost(self.id));
            };
            Ok(match (unit, self.reply) {
                (WorkUnit::Text(_), Reply::WrongKind) => ResultUnit::Determinant { index: 0, value: 0.0 },
                (WorkUnit::Text(chunk), _) => {
                    ResultUnit::Text(TextStats::new(chunk.len() as u64, 0, 0))
                }
                (WorkUnit::Matrix(_), Reply::WrongKind) => ResultUnit::Text(TextStats::default()),
                (WorkUnit::Matrix(task), Reply::WrongIndex) => ResultUnit::Determinant {
                    index: task.index + 1,
                    value: task.values[0],
                },
                (WorkUnit::Matrix(task), Reply::Honest) => ResultUnit::Determinant {
                    index: task.index,
                    value: task.values[0],
                },
            })
        }
    }

    /// Source over a fixed list of units.
    struct ListSource(VecDeque<WorkUnit>, UnitKind);

    impl UnitSource for ListSource {
        fn name(&self) -> &str {
            "list"
        }

        fn kind(&self) -> UnitKind {
            self.1
        }

        fn next_unit(&mut self) -> Result<Option<WorkUnit>> {
            Ok(self.0.pop_front())
        }
    }

    fn matrices(count: usize) -> ListSource {
        ListSource(
            (0..count)
                .map(|i| WorkUnit::Matrix(MatrixTask::new(1, i, vec![i as f64 * 10.0])))
                .collect(),
            UnitKind::Matrix,
        )
    }

    fn pool(n: usize, reply: Reply) -> Dispatcher<FakePort> {
        Dispatcher::new((1..=n).map(|i| FakePort::new(i, reply)).collect()).unwrap()
    }

    #[test]
    fn test_empty_pool_rejected() {
        let err = Dispatcher::<FakePort>::new(Vec::new()).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_rounds_shrink_on_last() {
        let mut dispatcher = pool(3, Reply::Honest);
        let (dets, stats) = dispatcher
            .run_input(&mut matrices(7), DeterminantSet::new(7))
            .unwrap();

        assert_eq!(dets, (0..7).map(|i| i as f64 * 10.0).collect::<Vec<_>>());
        assert_eq!(stats, InputStats { units: 7, rounds: 3 });
        let units: Vec<u64> = dispatcher.slots().iter().map(|s| s.units()).collect();
        assert_eq!(units, vec![3, 2, 2]);
        assert!(dispatcher
            .slots()
            .iter()
            .all(|s| s.state() == SlotState::Idle));
    }

    #[test]
    fn test_single_worker_pool() {
        let mut dispatcher = pool(1, Reply::Honest);
        let (dets, stats) = dispatcher
            .run_input(&mut matrices(4), DeterminantSet::new(4))
            .unwrap();
        assert_eq!(dets.len(), 4);
        assert_eq!(stats.rounds, 4);
    }

    #[test]
    fn test_text_sums_chunks() {
        let mut source = ListSource(
            vec![
                WorkUnit::Text(TextChunk::new(b"ab ".to_vec(), b' ', false)),
                WorkUnit::Text(TextChunk::new(b"cde".to_vec(), b' ', true)),
            ]
            .into(),
            UnitKind::Text,
        );
        let mut dispatcher = pool(4, Reply::Honest);
        let ((stats, chunks), input) = dispatcher
            .run_input(&mut source, TextAggregate::new())
            .unwrap();
        assert_eq!(stats.words, 6);
        assert_eq!(chunks, 2);
        assert_eq!(input.rounds, 1);
    }

    #[test]
    fn test_unassigned_index_is_protocol_violation() {
        let mut dispatcher = pool(2, Reply::WrongIndex);
        let err = dispatcher
            .run_input(&mut matrices(2), DeterminantSet::new(2))
            .unwrap_err();
        assert_eq!(err.error_code(), "PROTOCOL_VIOLATION");
        // Both replies were drained; the pool can still stop.
        assert!(dispatcher.slots().iter().all(|s| s.state() == SlotState::Idle));
        dispatcher.terminate().unwrap();
    }

    #[test]
    fn test_wrong_kind_is_protocol_violation() {
        let mut dispatcher = pool(1, Reply::WrongKind);
        let err = dispatcher
            .run_input(&mut matrices(1), DeterminantSet::new(1))
            .unwrap_err();
        assert!(err.is_worker_fault());
    }

    #[test]
    fn test_terminate_once() {
        let mut dispatcher = pool(2, Reply::Honest);
        dispatcher.terminate().unwrap();
        dispatcher.terminate().unwrap();
        assert!(dispatcher.is_terminated());

        for slot in dispatcher.slots() {
            let log = slot.port.log.lock();
            assert_eq!(log.as_slice(), &[Request::NoMoreWork]);
        }

        let err = dispatcher
            .run_input(&mut matrices(1), DeterminantSet::new(1))
            .unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
