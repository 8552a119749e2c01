//! Fixed-size worker pools driving a loop function.
//!
//! Each worker calls the loop function until it returns `false` or the
//! [`CancellationToken`](crate::CancellationToken) fires. Cancellation is
//! only checked between iterations. Every iteration runs inside a failure
//! boundary:
//!
//! - no handler: the panic is logged and the worker keeps going;
//! - handler installed: it receives the payload and the worker stops;
//! - handler panics too: that panic is swallowed and the worker keeps going.

mod consuming;
mod processor;


pub use consuming::ParallelConsumingProcessor;
pub use processor::{LoopFn, ParallelProcessor};
