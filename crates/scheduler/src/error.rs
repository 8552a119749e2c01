use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Scheduling after `shutdown_fast` or `shutdown_with_drain`.
    #[error("executor has been shut down")]
    ExecutorStopped,

    /// The ingestion buffer is full and the caller asked not to block.
    #[error("executor ingestion buffer is full")]
    Backpressure,

    #[error("delaying channel is closed")]
    ChannelClosed,

    #[error("delaying channel was already closed")]
    AlreadyClosed,

    #[error("worker count must be positive, got {0}")]
    InvalidWorkerCount(usize),

    #[error("failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] stint_core::ConfigError),
}
