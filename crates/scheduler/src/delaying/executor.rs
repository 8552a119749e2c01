use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;
use tracing::{debug, info, warn};

use stint_core::ExecutorConfig;

use crate::error::SchedulerError;
use crate::metrics::{ExecutorMetrics, ExecutorStats};
use crate::panic::catch;

use super::waiting::{WaitFor, WaitKey, WaitingLoop};

/// A zero-argument action run once its delay has elapsed.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Ready times are capped this far out so `Instant` arithmetic never overflows.
const MAX_DELAY: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Numbers executors within the process so their names stay distinct.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

/// Lifecycle of a [`DelayingExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExecutorState {
    /// Accepting and firing tasks.
    Running,
    /// No longer accepting; still firing what was accepted.
    Draining,
    /// Every accepted task has been dispatched; the loop thread has exited.
    Drained,
    /// Stopped immediately; pending tasks were discarded.
    FastStopped,
}

impl ExecutorState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Running,
            1 => Self::Draining,
            2 => Self::Drained,
            _ => Self::FastStopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Running => 0,
            Self::Draining => 1,
            Self::Drained => 2,
            Self::FastStopped => 3,
        }
    }
}

/// State shared between the executor handle and its loop thread.
pub(super) struct Shared {
    pub(super) name: String,
    /// `None` once shut down; senders hold the read lock while sending.
    ingest: RwLock<Option<Sender<WaitFor>>>,
    state: AtomicU8,
    next_seq: AtomicU64,
    pub(super) metrics: ExecutorMetrics,
}

impl Shared {
    pub(super) fn state(&self) -> ExecutorState {
        ExecutorState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: &[ExecutorState], to: ExecutorState) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if !from.contains(&ExecutorState::from_u8(current)) {
                return false;
            }
            match self.state.compare_exchange(current, to.as_u8(), Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Drop the ingestion sender. Blocks until in-flight sends finish.
    fn close_ingest(&self) {
        self.ingest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub(super) fn mark_drained(&self) {
        self.transition(&[ExecutorState::Draining], ExecutorState::Drained);
    }

    /// Run a fired task inside the failure boundary.
    pub(super) fn run_task(&self, task: Task) {
        if let Err(payload) = catch(task) {
            self.metrics.record_panic();
            warn!(executor = %self.name, panic = %payload, "delayed task panicked");
        }
    }
}

/// Runs actions after a delay, in ready-time order, each on its own thread.
///
/// One dedicated loop thread owns the pending set. Callers hand it entries
/// through a bounded channel, so scheduling blocks briefly when that buffer
/// is full ([`try_schedule_after`](Self::try_schedule_after) refuses instead).
///
/// Dropping the executor without a shutdown drains it in the background.
pub struct DelayingExecutor {
    shared: Arc<Shared>,
    stop_tx: Mutex<Option<Sender<()>>>,
    drained_rx: Receiver<()>,
}

impl DelayingExecutor {
    /// Executor whose ingestion buffer holds `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self, SchedulerError> {
        Self::with_config(&ExecutorConfig {
            ingest_capacity: capacity,
            ..ExecutorConfig::default()
        })
    }

    pub fn with_config(config: &ExecutorConfig) -> Result<Self, SchedulerError> {
        let (executor, waiting) = Self::unstarted(config);
        thread::Builder::new()
            .name(executor.shared.name.clone())
            .spawn(move || waiting.run())?;

        info!(
            executor = %executor.shared.name,
            capacity = config.ingest_capacity,
            "delaying executor started"
        );
        Ok(executor)
    }

    /// The handle plus the loop that has yet to be put on a thread. The name
    /// is `{thread_name}-{instance}`.
    pub(super) fn unstarted(config: &ExecutorConfig) -> (Self, WaitingLoop) {
        let instance = NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed);
        let (ingest_tx, ingest_rx) = bounded(config.ingest_capacity);
        let (stop_tx, stop_rx) = bounded(1);
        let (drained_tx, drained_rx) = bounded(0);

        let shared = Arc::new(Shared {
            name: format!("{}-{instance}", config.thread_name),
            ingest: RwLock::new(Some(ingest_tx)),
            state: AtomicU8::new(ExecutorState::Running.as_u8()),
            next_seq: AtomicU64::new(0),
            metrics: ExecutorMetrics::default(),
        });

        let waiting = WaitingLoop::new(Arc::clone(&shared), ingest_rx, stop_rx, drained_tx);
        let executor = Self {
            shared,
            stop_tx: Mutex::new(Some(stop_tx)),
            drained_rx,
        };
        (executor, waiting)
    }

    /// Run `action` once `delay` has elapsed.
    ///
    /// Blocks while the ingestion buffer is full. Fails with
    /// [`SchedulerError::ExecutorStopped`] after either shutdown.
    pub fn schedule_after<F>(&self, delay: Duration, action: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(delay, Box::new(action), true)
    }

    /// Like [`schedule_after`](Self::schedule_after) but fails with
    /// [`SchedulerError::Backpressure`] instead of blocking on a full buffer.
    pub fn try_schedule_after<F>(&self, delay: Duration, action: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(delay, Box::new(action), false)
    }

    fn submit(&self, delay: Duration, task: Task, block: bool) -> Result<(), SchedulerError> {
        let result = self.send(delay, task, block);
        match &result {
            Ok(()) => self.shared.metrics.record_scheduled(),
            Err(_) => self.shared.metrics.record_rejected(),
        }
        result
    }

    fn send(&self, delay: Duration, task: Task, block: bool) -> Result<(), SchedulerError> {
        if self.shared.state() != ExecutorState::Running {
            return Err(SchedulerError::ExecutorStopped);
        }
        let guard = self.shared.ingest.read().unwrap_or_else(PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(SchedulerError::ExecutorStopped)?;

        let entry = WaitFor {
            key: WaitKey {
                ready_at: Instant::now() + delay.min(MAX_DELAY),
                seq: self.shared.next_seq.fetch_add(1, Ordering::Relaxed),
            },
            task,
        };

        if block {
            sender
                .send(entry)
                .map_err(|_| SchedulerError::ExecutorStopped)
        } else {
            sender.try_send(entry).map_err(|err| match err {
                TrySendError::Full(_) => SchedulerError::Backpressure,
                TrySendError::Disconnected(_) => SchedulerError::ExecutorStopped,
            })
        }
    }

    /// Stop immediately and discard everything pending. Tasks already handed
    /// to their own thread keep running. Idempotent.
    pub fn shutdown_fast(&self) {
        let from = [ExecutorState::Running, ExecutorState::Draining];
        if !self.shared.transition(&from, ExecutorState::FastStopped) {
            return;
        }
        if let Some(stop) = self.stop_tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = stop.try_send(());
        }
        // After the stop signal: a sender blocked on a full buffer holds the
        // read lock until the discarding loop makes room for it.
        self.shared.close_ingest();
        info!(executor = %self.shared.name, "delaying executor stopped");
    }

    /// Refuse new tasks from now on; everything already accepted still fires.
    ///
    /// With `block`, waits until the pending set has been fully dispatched.
    /// Dispatch is not completion: a task may still be running, or not yet
    /// started on its thread, when this returns. Idempotent.
    pub fn shutdown_with_drain(&self, block: bool) {
        if self.shared.transition(&[ExecutorState::Running], ExecutorState::Draining) {
            self.shared.close_ingest();
            debug!(executor = %self.shared.name, "delaying executor draining");
        }
        if block {
            // Disconnects when the loop thread exits.
            let _ = self.drained_rx.recv();
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.shared.state()
    }

    pub fn stats(&self) -> ExecutorStats {
        self.shared.metrics.snapshot()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }
}

impl Drop for DelayingExecutor {
    fn drop(&mut self) {
        self.shutdown_with_drain(false);
    }
}

impl std::fmt::Debug for DelayingExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayingExecutor")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish()
    }
}
