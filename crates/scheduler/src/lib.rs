//! Delay-ordered task execution and panic-isolated worker pools.
//!
//! - [`DelayingExecutor`]: run actions after a delay, in ready-time order.
//! - [`DelayingChannel`]: a value channel where each value arrives after its
//!   own delay.
//! - [`ParallelProcessor`]: run a loop function on N workers until it says
//!   stop or a [`CancellationToken`] fires.
//! - [`ParallelConsumingProcessor`]: the same, built from a producer and a
//!   consumer step.

pub mod cancel;
pub mod delaying;
pub mod error;
pub mod metrics;
pub mod panic;
pub mod pool;

pub use cancel::CancellationToken;
pub use delaying::{DelayingChannel, DelayingExecutor, ExecutorState, Task};
pub use error::SchedulerError;
pub use metrics::{ExecutorStats, PoolStats};
pub use panic::{PanicHandler, PanicPayload};
pub use pool::{LoopFn, ParallelConsumingProcessor, ParallelProcessor};

pub use crossbeam_channel::RecvTimeoutError;
