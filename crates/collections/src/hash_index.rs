//! Chaining hash table keyed by caller-supplied hash and equality functions.

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash};

use crate::collection::{Collection, Equaler, Hasher, Map, Pair};

/// Bucket tables at or below this capacity are never shrunk.
const MIN_SHRINK_CAPACITY: usize = 64;

/// Associative container for keys that do not (or should not) implement
/// `Hash + Eq` the way they need to be looked up.
///
/// Entries with colliding hashes share a bucket and are told apart with the
/// equality function. Buckets are never left empty.
pub struct HashIndex<K, V> {
    buckets: HashMap<u64, Vec<Pair<K, V>>>,
    hasher: Hasher<K>,
    equaler: Equaler<K>,
    len: usize,
}

impl<K, V> HashIndex<K, V> {
    pub fn new<H, E>(hasher: H, equaler: E) -> Self
    where
        H: Fn(&K) -> u64 + Send + Sync + 'static,
        E: Fn(&K, &K) -> bool + Send + Sync + 'static,
    {
        Self {
            buckets: HashMap::new(),
            hasher: Box::new(hasher),
            equaler: Box::new(equaler),
            len: 0,
        }
    }

    /// Insert or overwrite, returning the replaced pair. The stored key is
    /// replaced by the new one too.
    pub fn put_pair(&mut self, pair: Pair<K, V>) -> Option<Pair<K, V>> {
        let hash = (self.hasher)(&pair.key);
        let bucket = self.buckets.entry(hash).or_default();
        if let Some(slot) = bucket.iter_mut().find(|p| (self.equaler)(&pair.key, &p.key)) {
            return Some(std::mem::replace(slot, pair));
        }
        bucket.push(pair);
        self.len += 1;
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let bucket = self.buckets.get(&(self.hasher)(key))?;
        bucket
            .iter()
            .find(|p| (self.equaler)(key, &p.key))
            .map(|p| &p.value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let bucket = self.buckets.get_mut(&(self.hasher)(key))?;
        bucket
            .iter_mut()
            .find(|p| (self.equaler)(key, &p.key))
            .map(|p| &mut p.value)
    }

    /// Remove and return the stored pair for `key`.
    pub fn remove_pair(&mut self, key: &K) -> Option<Pair<K, V>> {
        let hash = (self.hasher)(key);
        let bucket = self.buckets.get_mut(&hash)?;
        let pos = bucket.iter().position(|p| (self.equaler)(key, &p.key))?;
        let pair = bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&hash);
            self.shrink_if_sparse();
        }
        self.len -= 1;
        Some(pair)
    }

    /// Remove an arbitrary entry.
    pub fn pop_any(&mut self) -> Option<Pair<K, V>> {
        let hash = *self.buckets.keys().next()?;
        let bucket = self.buckets.get_mut(&hash)?;
        let pair = bucket.pop()?;
        if bucket.is_empty() {
            self.buckets.remove(&hash);
            self.shrink_if_sparse();
        }
        self.len -= 1;
        Some(pair)
    }

    /// Halve the table once it is mostly empty. Finding the first bucket
    /// scans from the start of the table, so repeated `pop_any` would
    /// otherwise slow down as the index drains.
    fn shrink_if_sparse(&mut self) {
        let capacity = self.buckets.capacity();
        if capacity > MIN_SHRINK_CAPACITY && self.buckets.len() * 4 < capacity {
            self.buckets.shrink_to(self.buckets.len() * 2);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pair<K, V>> {
        self.buckets.values().flatten()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|p| &p.key)
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[cfg(test)]
    fn bucket_capacity(&self) -> usize {
        self.buckets.capacity()
    }
}

impl<K: Hash + Eq + 'static, V: 'static> HashIndex<K, V> {
    /// Index using the key's own `Hash` and `Eq`.
    pub fn hashed() -> Self {
        let state = RandomState::new();
        Self::new(move |key: &K| state.hash_one(key), |a: &K, b: &K| a == b)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for HashIndex<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|p| (&p.key, &p.value)))
            .finish()
    }
}

impl<K, V> Collection<Pair<K, V>> for HashIndex<K, V> {
    fn add(&mut self, item: Pair<K, V>) -> Option<Pair<K, V>> {
        self.put_pair(item)
    }

    fn remove_first(&mut self, item: &Pair<K, V>) -> bool {
        self.remove_pair(&item.key).is_some()
    }

    fn try_pop(&mut self) -> Option<Pair<K, V>> {
        self.pop_any()
    }

    fn has(&self, item: &Pair<K, V>) -> bool {
        self.contains_key(&item.key)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    fn to_vec(&self) -> Vec<Pair<K, V>>
    where
        Pair<K, V>: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<K, V> Map<K, V> for HashIndex<K, V> {
    fn put(&mut self, key: K, value: V) -> Option<V> {
        self.put_pair(Pair::new(key, value)).map(|old| old.value)
    }

    fn get(&self, key: &K) -> Option<&V> {
        HashIndex::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_pair(key).map(|old| old.value)
    }

    fn contains_key(&self, key: &K) -> bool {
        HashIndex::get(self, key).is_some()
    }
}
