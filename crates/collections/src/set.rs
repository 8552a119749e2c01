//! Unordered sets over [`HashIndex`], plus a lock-guarded variant.

use std::fmt;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::collection::{Collection, Pair};
use crate::hash_index::HashIndex;

/// A set whose identity comes from caller hash and equality functions.
pub struct KeySet<T> {
    index: HashIndex<T, ()>,
}

impl<T> KeySet<T> {
    pub fn new<H, E>(hasher: H, equaler: E) -> Self
    where
        H: Fn(&T) -> u64 + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            index: HashIndex::new(hasher, equaler),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.index.keys()
    }

    /// Membership without cloning the probe.
    pub fn contains(&self, item: &T) -> bool {
        self.index.get(item).is_some()
    }
}

impl<T: Hash + Eq + 'static> KeySet<T> {
    pub fn hashed() -> Self {
        Self {
            index: HashIndex::hashed(),
        }
    }
}

impl<T> Collection<T> for KeySet<T> {
    fn add(&mut self, item: T) -> Option<T> {
        self.index.put_pair(Pair::new(item, ())).map(|old| old.key)
    }

    fn remove_first(&mut self, item: &T) -> bool {
        self.index.remove_pair(item).is_some()
    }

    fn try_pop(&mut self) -> Option<T> {
        self.index.pop_any().map(|pair| pair.key)
    }

    fn has(&self, item: &T) -> bool {
        self.contains(item)
    }

    fn len(&self) -> usize {
        Collection::len(&self.index)
    }

    fn clear(&mut self) {
        Collection::clear(&mut self.index);
    }

    fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<T: fmt::Debug> fmt::Debug for KeySet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A [`KeySet`] behind a reader/writer lock. Mutations are exclusive; reads
/// run concurrently.
///
/// A writer that panicked mid-operation leaves the set in whatever state the
/// underlying index reached; later callers keep using it rather than failing.
pub struct ThreadSafeSet<T> {
    inner: RwLock<KeySet<T>>,
}

impl<T> ThreadSafeSet<T> {
    pub fn new(set: KeySet<T>) -> Self {
        Self {
            inner: RwLock::new(set),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, KeySet<T>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, KeySet<T>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, item: T) -> Option<T> {
        self.write().add(item)
    }

    pub fn remove_first(&self, item: &T) -> bool {
        self.write().remove_first(item)
    }

    pub fn try_pop(&self) -> Option<T> {
        self.write().try_pop()
    }

    pub fn has(&self, item: &T) -> bool {
        self.read().contains(item)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.read().to_vec()
    }
}

impl<T: Hash + Eq + 'static> ThreadSafeSet<T> {
    pub fn hashed() -> Self {
        Self::new(KeySet::hashed())
    }
}

impl<T: fmt::Debug> fmt::Debug for ThreadSafeSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ThreadSafeSet").field(&*self.read()).finish()
    }
}
