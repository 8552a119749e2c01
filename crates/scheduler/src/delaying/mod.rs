//! Delay-ordered task execution.
//!
//! [`DelayingExecutor`] fires zero-argument tasks once their delay elapses,
//! in ready-time order. A single loop thread owns the pending set; callers
//! reach it only through a bounded ingestion channel, so the set itself is
//! never locked. Every fired task runs on its own thread inside a failure
//! boundary.
//!
//! [`DelayingChannel`] builds a delayed value channel on top of it.

mod channel;
mod executor;
mod waiting;


pub use channel::DelayingChannel;
pub use executor::{DelayingExecutor, ExecutorState, Task};
