//! Priority collections with O(log n) keyed update and removal.
//!
//! The [`Heap`] engine stores each entry's current array position inside the
//! entry itself. [`PriorityMap`] pairs it with a [`HashIndex`] from key to
//! entry, which turns "find this key in the heap" into an O(1) lookup and
//! makes decrease-key and arbitrary removal O(log n).

pub mod collection;
pub mod error;
pub mod hash_index;
pub mod heap;
pub mod priority;
pub mod set;

pub use collection::{Collection, Comparator, Equaler, Hasher, Map, Pair, PriorityCollection};
pub use error::CollectionError;
pub use hash_index::HashIndex;
pub use heap::{EntryId, Heap};
pub use priority::{PriorityMap, PriorityQueue, PrioritySet};
pub use set::{KeySet, ThreadSafeSet};
