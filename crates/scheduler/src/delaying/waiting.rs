//! The executor's loop thread. It is the only code that touches the pending
//! set; everything else reaches it through the ingestion channel.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{after, never, select, Receiver, Sender};
use tracing::{debug, info, warn};

use stint_collections::{Collection, Map, PriorityCollection, PriorityMap};

use super::executor::{ExecutorState, Shared, Task};

/// Ordering and identity of a pending task.
///
/// `seq` is unique per executor, so two tasks due at the same instant are
/// distinct entries and both fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct WaitKey {
    pub(super) ready_at: Instant,
    pub(super) seq: u64,
}

impl WaitKey {
    fn fires_before(&self, other: &WaitKey) -> bool {
        (self.ready_at, self.seq) < (other.ready_at, other.seq)
    }
}

/// A task on its way to the loop thread.
pub(super) struct WaitFor {
    pub(super) key: WaitKey,
    pub(super) task: Task,
}

/// What woke the loop.
enum Wake {
    Stop,
    /// The executor handle is gone without a fast stop.
    StopDetached,
    Timer,
    Entry(WaitFor),
    IngestClosed,
}

pub(super) struct WaitingLoop {
    shared: Arc<Shared>,
    pending: PriorityMap<WaitKey, Task>,
    ingest: Receiver<WaitFor>,
    stop: Receiver<()>,
    /// Never sent on; dropping it on exit releases blocked drain waiters.
    _drained: Sender<()>,
}

impl WaitingLoop {
    pub(super) fn new(
        shared: Arc<Shared>,
        ingest: Receiver<WaitFor>,
        stop: Receiver<()>,
        drained: Sender<()>,
    ) -> Self {
        Self {
            shared,
            pending: PriorityMap::hashed(WaitKey::fires_before),
            ingest,
            stop,
            _drained: drained,
        }
    }

    pub(super) fn run(mut self) {
        debug!(executor = %self.shared.name, "waiting loop started");
        loop {
            let now = Instant::now();
            self.fire_due(now);
            if self.fast_stopped() {
                self.discard();
                return;
            }

            let timer = match self.pending.try_peek() {
                Some(next) => after(next.key.ready_at.saturating_duration_since(now)),
                None => never(),
            };

            let wake = select! {
                recv(self.stop) -> msg => match msg {
                    Ok(()) => Wake::Stop,
                    Err(_) => Wake::StopDetached,
                },
                recv(timer) -> _ => Wake::Timer,
                recv(self.ingest) -> msg => match msg {
                    Ok(entry) => Wake::Entry(entry),
                    Err(_) => Wake::IngestClosed,
                },
            };

            match wake {
                Wake::Stop => {
                    self.discard();
                    return;
                }
                Wake::StopDetached => self.stop = never(),
                Wake::Timer => {}
                Wake::Entry(entry) => {
                    self.accept(entry);
                    self.accept_buffered();
                }
                Wake::IngestClosed => {
                    self.drain();
                    return;
                }
            }
        }
    }

    /// Fire everything left, each at its ready time, then report drained.
    /// Only a fast stop cuts this short.
    fn drain(&mut self) {
        debug!(
            executor = %self.shared.name,
            pending = self.pending.len(),
            "draining pending tasks"
        );
        loop {
            let now = Instant::now();
            self.fire_due(now);
            if self.fast_stopped() {
                self.discard();
                return;
            }

            let next = match self.pending.try_peek() {
                Some(next) => next.key.ready_at,
                None => break,
            };
            let timer = after(next.saturating_duration_since(now));

            let wake = select! {
                recv(self.stop) -> msg => match msg {
                    Ok(()) => Wake::Stop,
                    Err(_) => Wake::StopDetached,
                },
                recv(timer) -> _ => Wake::Timer,
            };

            match wake {
                Wake::Stop => {
                    self.discard();
                    return;
                }
                Wake::StopDetached => self.stop = never(),
                _ => {}
            }
        }
        self.shared.mark_drained();
        info!(executor = %self.shared.name, "delaying executor drained");
    }

    /// True once `shutdown_fast` has begun. The select picks among ready arms
    /// at random, so every step that would fire a task checks this first.
    fn fast_stopped(&self) -> bool {
        self.shared.state() == ExecutorState::FastStopped
    }

    fn accept(&mut self, entry: WaitFor) {
        if entry.key.ready_at <= Instant::now() && !self.fast_stopped() {
            self.dispatch(entry.task);
        } else {
            self.pending.put(entry.key, entry.task);
        }
    }

    /// Take whatever else is already buffered without blocking.
    fn accept_buffered(&mut self) {
        while !self.fast_stopped() {
            match self.ingest.try_recv() {
                Ok(entry) => self.accept(entry),
                Err(_) => break,
            }
        }
    }

    fn fire_due(&mut self, now: Instant) {
        while !self.fast_stopped()
            && self
                .pending
                .try_peek()
                .is_some_and(|next| next.key.ready_at <= now)
        {
            if let Some(due) = self.pending.try_pop() {
                self.dispatch(due.value);
            }
        }
    }

    /// Hand a task to its own thread.
    fn dispatch(&self, task: Task) {
        self.shared.metrics.record_fired();

        // The slot lets us recover the task if the thread cannot be spawned.
        let slot = Arc::new(Mutex::new(Some(task)));
        let handoff = Arc::clone(&slot);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("{}-task", self.shared.name))
            .spawn(move || {
                if let Some(task) = take(&handoff) {
                    shared.run_task(task);
                }
            });

        if let Err(err) = spawned {
            warn!(
                executor = %self.shared.name,
                error = %err,
                "failed to spawn task thread, running inline"
            );
            if let Some(task) = take(&slot) {
                self.shared.run_task(task);
            }
        }
    }

    /// Drop everything pending. Only called after a fast stop, which closes
    /// ingestion, so reading until disconnect also counts entries from
    /// senders that were blocked on a full buffer.
    fn discard(&mut self) {
        let buffered = self.ingest.iter().count();
        let dropped = self.pending.len() + buffered;
        self.pending.clear();
        self.shared.metrics.record_discarded(dropped as u64);
        debug!(executor = %self.shared.name, dropped, "discarded pending tasks");
    }
}

fn take(slot: &Mutex<Option<Task>>) -> Option<Task> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}
