use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, warn};

use stint_core::{ExecutorConfig, StintConfig};

use crate::error::SchedulerError;

use super::executor::DelayingExecutor;

/// How often the closer re-checks for undelivered values.
const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A value channel where each value shows up only after its own delay.
///
/// After [`close`](Self::close), values already added are still delivered;
/// once they are all out, [`get`](Self::get) returns `T::default()` on every
/// call instead of blocking or failing. Use [`recv`](Self::recv) to tell the
/// end of the channel apart from a real default value.
pub struct DelayingChannel<T> {
    executor: Arc<DelayingExecutor>,
    /// `None` once closed.
    sender: Mutex<Option<Sender<T>>>,
    receiver: Receiver<T>,
    outstanding: Arc<AtomicI64>,
}

/// Counts one undelivered value until dropped. Travels inside the scheduled
/// task, so a value that never gets delivered still releases its count.
struct Outstanding(Arc<AtomicI64>);

impl Outstanding {
    fn acquire(counter: &Arc<AtomicI64>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for Outstanding {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<T: Send + 'static> DelayingChannel<T> {
    /// Channel whose executor buffer and output buffer both hold `capacity`.
    pub fn new(capacity: usize) -> Result<Self, SchedulerError> {
        let executor = DelayingExecutor::new(capacity)?;
        Ok(Self::from_parts(executor, capacity))
    }

    pub fn with_config(config: &StintConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        let executor = DelayingExecutor::with_config(&ExecutorConfig {
            thread_name: format!("{}-channel", config.executor.thread_name),
            ..config.executor.clone()
        })?;
        Ok(Self::from_parts(executor, config.channel.capacity))
    }

    fn from_parts(executor: DelayingExecutor, capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            executor: Arc::new(executor),
            sender: Mutex::new(Some(sender)),
            receiver,
            outstanding: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Deliver `value` once `delay` has elapsed.
    pub fn add_after(&self, value: T, delay: Duration) -> Result<(), SchedulerError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(SchedulerError::ChannelClosed)?;

        let pending = Outstanding::acquire(&self.outstanding);
        self.executor
            .schedule_after(delay, move || {
                // A dropped receiver just means nobody is listening.
                let _ = sender.send(value);
                drop(pending);
            })
            .map_err(|err| match err {
                SchedulerError::ExecutorStopped => SchedulerError::ChannelClosed,
                other => other,
            })
    }

    /// Stop accepting values. Values already added are still delivered, and
    /// the output side ends once the last of them is out.
    ///
    /// Fails with [`SchedulerError::AlreadyClosed`] on a second call.
    pub fn close(&self) -> Result<(), SchedulerError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SchedulerError::AlreadyClosed)?;

        self.executor.shutdown_with_drain(false);

        let executor = Arc::clone(&self.executor);
        let outstanding = Arc::clone(&self.outstanding);
        let spawned = thread::Builder::new()
            .name(format!("{}-closer", self.executor.name()))
            .spawn(move || {
                // Drained means handed off, not delivered; wait for the
                // in-flight sends too.
                executor.shutdown_with_drain(true);
                while outstanding.load(Ordering::Acquire) > 0 {
                    thread::sleep(CLOSE_POLL_INTERVAL);
                }
                drop(sender);
                debug!(executor = %executor.name(), "delaying channel closed");
            });

        if let Err(err) = spawned {
            // Every pending task holds its own sender clone, so the output
            // side still ends after the last delivery.
            warn!(error = %err, "failed to spawn channel closer");
        }
        Ok(())
    }

    /// Next value, blocking until one arrives. `None` once the channel is
    /// closed and everything has been delivered.
    pub fn recv(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Values added but not yet delivered.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire).max(0) as usize
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl<T: Default + Send + 'static> DelayingChannel<T> {
    /// Next value, blocking until one arrives; `T::default()` after the
    /// channel has closed and drained.
    pub fn get(&self) -> T {
        self.recv().unwrap_or_default()
    }
}
