use std::fmt;
use std::hash::Hash;

use crate::collection::{Collection, Map, Pair, PriorityCollection};
use crate::priority::PriorityMap;

/// Unique items kept in priority order.
///
/// Adding an item equal to one already present replaces it in place and
/// re-sifts, so the set holds the latest instance at the latest priority.
pub struct PrioritySet<T> {
    map: PriorityMap<T, ()>,
}

impl<T: 'static> PrioritySet<T> {
    pub fn new<C, H, E>(less: C, hasher: H, equaler: E) -> Self
    where
        C: Fn(&T, &T) -> bool + Send + Sync + 'static,
        H: Fn(&T) -> u64 + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            map: PriorityMap::new(less, hasher, equaler),
        }
    }
}

impl<T: Hash + Eq + 'static> PrioritySet<T> {
    pub fn hashed<C>(less: C) -> Self
    where
        C: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            map: PriorityMap::hashed(less),
        }
    }
}

impl<T> PrioritySet<T> {
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.map.keys()
    }

    pub fn is_consistent(&self) -> bool {
        self.map.is_consistent()
    }
}

impl<T: Clone> Collection<T> for PrioritySet<T> {
    /// Returns the replaced item when an equal one was present.
    fn add(&mut self, item: T) -> Option<T> {
        self.map.put_pair(Pair::new(item, ())).map(|old| old.key)
    }

    fn remove_first(&mut self, item: &T) -> bool {
        self.map.remove_pair(item).is_some()
    }

    fn try_pop(&mut self) -> Option<T> {
        self.map.try_pop().map(|pair| pair.key)
    }

    fn has(&self, item: &T) -> bool {
        self.map.contains_key(item)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) {
        self.map.clear();
    }

    fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.map.keys().cloned().collect()
    }
}

impl<T: Clone> PriorityCollection<T> for PrioritySet<T> {
    fn try_peek(&self) -> Option<&T> {
        self.map.try_peek().map(|pair| &pair.key)
    }
}

impl<T: fmt::Debug> fmt::Debug for PrioritySet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
