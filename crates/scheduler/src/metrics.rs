//! Runtime counters for executors and pools.
//!
//! Counters are atomics updated on the hot path; callers read them through
//! serializable snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time view of a [`DelayingExecutor`](crate::DelayingExecutor).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    /// Tasks accepted by `schedule_after`.
    pub scheduled: u64,
    /// Tasks handed to an execution thread.
    pub fired: u64,
    /// Tasks whose action panicked.
    pub panicked: u64,
    /// Scheduling attempts refused after shutdown or on a full buffer.
    pub rejected: u64,
    /// Pending tasks dropped by a fast stop.
    pub discarded: u64,
    /// Accepted but neither fired nor discarded.
    pub pending: u64,
}

#[derive(Debug, Default)]
pub(crate) struct ExecutorMetrics {
    scheduled: AtomicU64,
    fired: AtomicU64,
    panicked: AtomicU64,
    rejected: AtomicU64,
    discarded: AtomicU64,
}

impl ExecutorMetrics {
    pub(crate) fn record_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fired(&self) {
        self.fired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panic(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self, count: u64) {
        self.discarded.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ExecutorStats {
        let scheduled = self.scheduled.load(Ordering::Relaxed);
        let fired = self.fired.load(Ordering::Relaxed);
        let discarded = self.discarded.load(Ordering::Relaxed);
        ExecutorStats {
            scheduled,
            fired,
            panicked: self.panicked.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            discarded,
            pending: scheduled.saturating_sub(fired + discarded),
        }
    }
}

/// Point-in-time view of a worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Loop-function invocations, including ones that panicked.
    pub iterations: u64,
    /// Iterations that panicked.
    pub panics: u64,
    /// Panics raised by the panic handler itself.
    pub handler_panics: u64,
}

#[derive(Debug, Default)]
pub(crate) struct PoolMetrics {
    iterations: AtomicU64,
    panics: AtomicU64,
    handler_panics: AtomicU64,
}

impl PoolMetrics {
    pub(crate) fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handler_panic(&self) {
        self.handler_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            iterations: self.iterations.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_pending_tracks_scheduled_minus_fired() {
        let m = ExecutorMetrics::default();
        m.record_scheduled();
        m.record_scheduled();
        m.record_scheduled();
        m.record_fired();
        m.record_rejected();

        let stats = m.snapshot();
        assert_eq!(stats.scheduled, 3);
        assert_eq!(stats.fired, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.pending, 2);
    }

    #[test]
    fn discarded_tasks_leave_pending() {
        let m = ExecutorMetrics::default();
        m.record_scheduled();
        m.record_scheduled();
        m.record_fired();
        m.record_discarded(1);
        let stats = m.snapshot();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.scheduled, 2);
    }

    #[test]
    fn snapshots_serialize() {
        let m = PoolMetrics::default();
        m.record_iteration();
        m.record_panic();
        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["iterations"], 1);
        assert_eq!(json["panics"], 1);
        assert_eq!(json["handler_panics"], 0);
    }
}
