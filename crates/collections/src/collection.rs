//! Collection traits shared by sets, maps and priority collections.

use crate::error::CollectionError;

/// Returns `true` when `first` should be ordered before `second`.
pub type Comparator<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Hash function for keys. Keys that are equal under the paired [`Equaler`]
/// must hash equal.
pub type Hasher<T> = Box<dyn Fn(&T) -> u64 + Send + Sync>;

/// Equality function for keys.
pub type Equaler<T> = Box<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// A key/value item, the element type of every [`Map`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Pair<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> Pair<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// Operations common to every collection in this crate.
pub trait Collection<T> {
    /// Add an item. Keyed collections return the item it replaced.
    fn add(&mut self, item: T) -> Option<T>;

    /// Remove the first item equal to `item`. Returns whether one was removed.
    fn remove_first(&mut self, item: &T) -> bool;

    /// Remove and return an item: the minimum for priority collections,
    /// an arbitrary one otherwise.
    fn try_pop(&mut self) -> Option<T>;

    fn has(&self, item: &T) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Snapshot of the items in unspecified order.
    fn to_vec(&self) -> Vec<T>
    where
        T: Clone;
}

/// A collection ordered by a caller-supplied [`Comparator`].
pub trait PriorityCollection<T>: Collection<T> {
    /// The minimum item, or `None` when empty.
    fn try_peek(&self) -> Option<&T>;

    /// The minimum item, or [`CollectionError::Empty`].
    fn peek(&self) -> Result<&T, CollectionError> {
        self.try_peek().ok_or(CollectionError::Empty)
    }

    /// Remove and return the minimum item, or [`CollectionError::Empty`].
    fn pop(&mut self) -> Result<T, CollectionError> {
        self.try_pop().ok_or(CollectionError::Empty)
    }
}

/// A keyed collection. As a [`Collection`], `remove_first` and `has` look at
/// the pair's key only.
pub trait Map<K, V>: Collection<Pair<K, V>> {
    /// Insert or overwrite. Returns the previous value for an existing key.
    fn put(&mut self, key: K, value: V) -> Option<V>;

    fn get(&self, key: &K) -> Option<&V>;

    fn remove(&mut self, key: &K) -> Option<V>;

    fn contains_key(&self, key: &K) -> bool;
}
