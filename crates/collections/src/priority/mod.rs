//! Heap-backed priority collections.
//!
//! - [`PriorityQueue`]: heap only; duplicates allowed, removal is a linear
//!   scan with the caller's equality function.
//! - [`PriorityMap`]: heap plus a [`HashIndex`](crate::HashIndex) from key to
//!   heap entry; one live entry per key, O(log n) update and removal.
//! - [`PrioritySet`]: a `PriorityMap` with unit values.

mod map;
mod queue;
mod set;

pub use self::map::PriorityMap;
pub use self::queue::PriorityQueue;
pub use self::set::PrioritySet;
