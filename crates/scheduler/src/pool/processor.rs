use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use stint_core::PoolConfig;

use crate::cancel::CancellationToken;
use crate::error::SchedulerError;
use crate::metrics::{PoolMetrics, PoolStats};
use crate::panic::{catch, PanicHandler};

/// One iteration of worker logic. Returns whether the worker should go on.
pub type LoopFn = Arc<dyn Fn(&CancellationToken) -> bool + Send + Sync>;

const DEFAULT_THREAD_NAME: &str = "stint-worker";

/// Runs a loop function concurrently on a fixed number of workers.
pub struct ParallelProcessor {
    loop_fn: LoopFn,
    panic_handler: Option<PanicHandler>,
    thread_name: String,
    metrics: Arc<PoolMetrics>,
}

impl ParallelProcessor {
    pub fn new<F>(loop_fn: F, panic_handler: Option<PanicHandler>) -> Self
    where
        F: Fn(&CancellationToken) -> bool + Send + Sync + 'static,
    {
        Self {
            loop_fn: Arc::new(loop_fn),
            panic_handler,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            metrics: Arc::new(PoolMetrics::default()),
        }
    }

    /// Prefix for worker thread names (`{name}-{index}`).
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Run `workers` workers and block until every one of them has stopped.
    ///
    /// Fails with [`SchedulerError::InvalidWorkerCount`] for zero workers.
    pub fn start(&self, workers: usize, token: &CancellationToken) -> Result<(), SchedulerError> {
        self.run(workers, &self.thread_name, token)
    }

    /// [`start`](Self::start) with the worker count and thread name taken
    /// from `config`.
    pub fn start_with_config(
        &self,
        config: &PoolConfig,
        token: &CancellationToken,
    ) -> Result<(), SchedulerError> {
        config.validate()?;
        self.run(config.resolved_workers(), &config.thread_name, token)
    }

    pub fn stats(&self) -> PoolStats {
        self.metrics.snapshot()
    }

    fn run(&self, workers: usize, thread_name: &str, token: &CancellationToken) -> Result<(), SchedulerError> {
        if workers == 0 {
            return Err(SchedulerError::InvalidWorkerCount(workers));
        }

        let prefix = thread_name.to_string();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;

        info!(workers, pool = %thread_name, "worker pool starting");
        pool.scope(|scope| {
            for worker in 0..workers {
                scope.spawn(move |_| self.run_worker(worker, token));
            }
        });

        let stats = self.stats();
        info!(
            pool = %thread_name,
            iterations = stats.iterations,
            panics = stats.panics,
            "worker pool stopped"
        );
        Ok(())
    }

    fn run_worker(&self, worker: usize, token: &CancellationToken) {
        debug!(worker, "worker started");
        while self.iterate(worker, token) {}
        debug!(worker, "worker stopped");
    }

    /// One guarded iteration. Returns whether the worker goes on.
    fn iterate(&self, worker: usize, token: &CancellationToken) -> bool {
        if token.is_cancelled() {
            return false;
        }
        self.metrics.record_iteration();

        let payload = match catch(|| (self.loop_fn)(token)) {
            Ok(go_on) => return go_on,
            Err(payload) => payload,
        };
        self.metrics.record_panic();

        let Some(handler) = &self.panic_handler else {
            warn!(worker, panic = %payload, "loop function panicked");
            return true;
        };
        match catch(|| handler(payload)) {
            // A handled panic ends this worker.
            Ok(()) => false,
            Err(secondary) => {
                self.metrics.record_handler_panic();
                warn!(worker, panic = %secondary, "panic handler panicked");
                true
            }
        }
    }
}

impl fmt::Debug for ParallelProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelProcessor")
            .field("thread_name", &self.thread_name)
            .field("panic_handler", &self.panic_handler.is_some())
            .field("stats", &self.stats())
            .finish()
    }
}
