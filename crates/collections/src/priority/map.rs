use std::fmt;
use std::hash::Hash;

use crate::collection::{Collection, Map, Pair, PriorityCollection};
use crate::hash_index::HashIndex;
use crate::heap::{EntryId, Heap};

/// A priority-ordered map: at most one live entry per key.
///
/// `put` on an existing key swaps the pair inside its heap entry and fixes the
/// heap from the entry's stored position, so re-prioritising a key is
/// O(log n) and never duplicates it.
pub struct PriorityMap<K, V> {
    heap: Heap<Pair<K, V>>,
    entries: HashIndex<K, EntryId>,
}

impl<K: 'static, V: 'static> PriorityMap<K, V> {
    /// `less` orders keys (minimum first). `hasher` and `equaler` define key
    /// identity; equal keys must hash equal.
    pub fn new<C, H, E>(less: C, hasher: H, equaler: E) -> Self
    where
        C: Fn(&K, &K) -> bool + Send + Sync + 'static,
        H: Fn(&K) -> u64 + Send + Sync + 'static,
        E: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        Self {
            heap: Heap::new(move |a: &Pair<K, V>, b: &Pair<K, V>| less(&a.key, &b.key)),
            entries: HashIndex::new(hasher, equaler),
        }
    }
}

impl<K: Hash + Eq + 'static, V: 'static> PriorityMap<K, V> {
    /// Map whose key identity is the key's own `Hash` and `Eq`.
    pub fn hashed<C>(less: C) -> Self
    where
        C: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        Self {
            heap: Heap::new(move |a: &Pair<K, V>, b: &Pair<K, V>| less(&a.key, &b.key)),
            entries: HashIndex::hashed(),
        }
    }
}

impl<K: Clone, V> PriorityMap<K, V> {
    /// Insert or update, returning the replaced pair.
    pub fn put_pair(&mut self, pair: Pair<K, V>) -> Option<Pair<K, V>> {
        match self.entries.get(&pair.key).copied() {
            Some(id) => {
                let key = pair.key.clone();
                let old = self.heap.replace(id, pair);
                // Keep the index holding the latest key instance.
                self.entries.put_pair(Pair::new(key, id));
                old
            }
            None => {
                let key = pair.key.clone();
                let id = self.heap.push(pair);
                self.entries.put_pair(Pair::new(key, id));
                None
            }
        }
    }
}

impl<K, V> PriorityMap<K, V> {
    /// Remove the pair stored for `key`.
    pub fn remove_pair(&mut self, key: &K) -> Option<Pair<K, V>> {
        let id = self.entries.remove_pair(key)?.value;
        self.heap.remove(id)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.heap.iter().map(|p| &p.key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pair<K, V>> {
        self.heap.iter()
    }

    /// Heap property and key index agree. O(n).
    pub fn is_consistent(&self) -> bool {
        self.heap.is_consistent()
            && self.heap.len() == Collection::len(&self.entries)
            && self.entries.iter().all(|entry| self.heap.get(entry.value).is_some())
    }
}

impl<K: Clone, V> Collection<Pair<K, V>> for PriorityMap<K, V> {
    fn add(&mut self, item: Pair<K, V>) -> Option<Pair<K, V>> {
        self.put_pair(item)
    }

    /// Removes by key; the value is ignored.
    fn remove_first(&mut self, item: &Pair<K, V>) -> bool {
        self.remove_pair(&item.key).is_some()
    }

    fn try_pop(&mut self) -> Option<Pair<K, V>> {
        let pair = self.heap.pop()?;
        self.entries.remove_pair(&pair.key);
        Some(pair)
    }

    fn has(&self, item: &Pair<K, V>) -> bool {
        self.entries.get(&item.key).is_some()
    }

    fn len(&self) -> usize {
        self.heap.len()
    }

    fn clear(&mut self) {
        self.heap.clear();
        Collection::clear(&mut self.entries);
    }

    fn to_vec(&self) -> Vec<Pair<K, V>>
    where
        Pair<K, V>: Clone,
    {
        self.heap.iter().cloned().collect()
    }
}

impl<K: Clone, V> PriorityCollection<Pair<K, V>> for PriorityMap<K, V> {
    fn try_peek(&self) -> Option<&Pair<K, V>> {
        self.heap.peek()
    }
}

impl<K: Clone, V> Map<K, V> for PriorityMap<K, V> {
    fn put(&mut self, key: K, value: V) -> Option<V> {
        self.put_pair(Pair::new(key, value)).map(|old| old.value)
    }

    fn get(&self, key: &K) -> Option<&V> {
        let id = *self.entries.get(key)?;
        self.heap.get(id).map(|p| &p.value)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_pair(key).map(|old| old.value)
    }

    fn contains_key(&self, key: &K) -> bool {
        self.entries.get(key).is_some()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for PriorityMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityMap").field("heap", &self.heap).finish()
    }
}
