use std::fmt;

use crate::collection::{Collection, Equaler, PriorityCollection};
use crate::heap::Heap;

/// A heap ordered by a caller comparator. Holds duplicates.
pub struct PriorityQueue<T> {
    heap: Heap<T>,
    equaler: Equaler<T>,
}

impl<T> PriorityQueue<T> {
    /// `less` orders the queue (minimum first); `equaler` is only used by
    /// [`remove_first`](Collection::remove_first) and [`has`](Collection::has).
    pub fn new<C, E>(less: C, equaler: E) -> Self
    where
        C: Fn(&T, &T) -> bool + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            heap: Heap::new(less),
            equaler: Box::new(equaler),
        }
    }
}

impl<T: Ord + 'static> PriorityQueue<T> {
    /// Smallest-first queue using the item's own ordering and equality.
    pub fn ascending() -> Self {
        Self::new(|a: &T, b: &T| a < b, |a: &T, b: &T| a == b)
    }

    /// Largest-first queue using the item's own ordering and equality.
    pub fn descending() -> Self {
        Self::new(|a: &T, b: &T| a > b, |a: &T, b: &T| a == b)
    }
}

impl<T> Collection<T> for PriorityQueue<T> {
    /// Always pushes; a queue never replaces.
    fn add(&mut self, item: T) -> Option<T> {
        self.heap.push(item);
        None
    }

    fn remove_first(&mut self, item: &T) -> bool {
        match self.heap.find(|candidate| (self.equaler)(item, candidate)) {
            Some(id) => self.heap.remove(id).is_some(),
            None => false,
        }
    }

    fn try_pop(&mut self) -> Option<T> {
        self.heap.pop()
    }

    fn has(&self, item: &T) -> bool {
        self.heap.find(|candidate| (self.equaler)(item, candidate)).is_some()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn clear(&mut self) {
        self.heap.clear();
    }

    fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.heap.iter().cloned().collect()
    }
}

impl<T> PriorityCollection<T> for PriorityQueue<T> {
    fn try_peek(&self) -> Option<&T> {
        self.heap.peek()
    }
}

impl<T: fmt::Debug> fmt::Debug for PriorityQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityQueue").field("heap", &self.heap).finish()
    }
}
