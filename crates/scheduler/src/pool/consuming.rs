use std::fmt;
use std::marker::PhantomData;

use stint_core::PoolConfig;

use crate::cancel::CancellationToken;
use crate::error::SchedulerError;
use crate::metrics::PoolStats;
use crate::panic::PanicHandler;

use super::processor::ParallelProcessor;

/// A worker pool whose iterations produce one item and then consume it.
///
/// Each worker runs its own produce/consume pair; the producer and consumer
/// must therefore be safe to call from several threads at once.
/// Cancellation is checked before producing and again before consuming.
pub struct ParallelConsumingProcessor<T> {
    processor: ParallelProcessor,
    _product: PhantomData<fn() -> T>,
}

impl<T: 'static> ParallelConsumingProcessor<T> {
    pub fn new<P, C>(producer: P, consumer: C, panic_handler: Option<PanicHandler>) -> Self
    where
        P: Fn(&CancellationToken) -> T + Send + Sync + 'static,
        C: Fn(T, &CancellationToken) + Send + Sync + 'static,
    {
        let processor = ParallelProcessor::new(
            move |token: &CancellationToken| {
                if token.is_cancelled() {
                    return false;
                }
                let product = producer(token);
                if token.is_cancelled() {
                    return false;
                }
                consumer(product, token);
                true
            },
            panic_handler,
        );
        Self {
            processor,
            _product: PhantomData,
        }
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.processor = self.processor.with_thread_name(name);
        self
    }

    /// See [`ParallelProcessor::start`].
    pub fn start(&self, workers: usize, token: &CancellationToken) -> Result<(), SchedulerError> {
        self.processor.start(workers, token)
    }

    pub fn start_with_config(
        &self,
        config: &PoolConfig,
        token: &CancellationToken,
    ) -> Result<(), SchedulerError> {
        self.processor.start_with_config(config, token)
    }

    pub fn stats(&self) -> PoolStats {
        self.processor.stats()
    }
}

impl<T> fmt::Debug for ParallelConsumingProcessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelConsumingProcessor")
            .field("processor", &self.processor)
            .finish()
    }
}
