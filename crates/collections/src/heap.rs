//! Binary min-heap whose entries embed their own heap position.
//!
//! Entries live in a slab and are addressed by [`EntryId`]. The heap order is
//! a vector of slab slots; every swap writes the new position back into the
//! moved entries, so `order[entry.index] == slot` holds for every live entry.
//! That back-pointer is what makes [`Heap::fix`] and [`Heap::remove`] O(log n).

use std::fmt;

use crate::collection::Comparator;

/// Stable handle to a heap entry.
///
/// Valid until the entry leaves the heap (pop, remove, clear); the slot may be
/// reused by a later push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(usize);

/// An item plus its current position in the heap order.
#[derive(Debug)]
struct HeapEntry<T> {
    item: T,
    index: usize,
}

enum Slot<T> {
    Occupied(HeapEntry<T>),
    Vacant,
}

pub struct Heap<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    /// Heap-ordered slot numbers.
    order: Vec<usize>,
    less: Comparator<T>,
}

impl<T> Heap<T> {
    /// Creates an empty heap ordered by `less` (minimum first).
    pub fn new<C>(less: C) -> Self
    where
        C: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            less: Box::new(less),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn push(&mut self, item: T) -> EntryId {
        let pos = self.order.len();
        let entry = Slot::Occupied(HeapEntry { item, index: pos });
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = entry;
                slot
            }
            None => {
                self.slots.push(entry);
                self.slots.len() - 1
            }
        };
        self.order.push(slot);
        self.up(pos);
        EntryId(slot)
    }

    /// The minimum item.
    pub fn peek(&self) -> Option<&T> {
        self.order.first().map(|&slot| self.item(slot))
    }

    pub fn peek_id(&self) -> Option<EntryId> {
        self.order.first().map(|&slot| EntryId(slot))
    }

    /// Removes and returns the minimum item.
    pub fn pop(&mut self) -> Option<T> {
        if self.order.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// Removes an arbitrary entry in O(log n).
    pub fn remove(&mut self, id: EntryId) -> Option<T> {
        let pos = self.position(id)?;
        Some(self.remove_at(pos))
    }

    pub fn get(&self, id: EntryId) -> Option<&T> {
        match self.slots.get(id.0)? {
            Slot::Occupied(entry) => Some(&entry.item),
            Slot::Vacant => None,
        }
    }

    /// Current position of the entry in the heap order.
    pub fn position(&self, id: EntryId) -> Option<usize> {
        match self.slots.get(id.0)? {
            Slot::Occupied(entry) => Some(entry.index),
            Slot::Vacant => None,
        }
    }

    /// Swaps in a new item for an existing entry and restores heap order,
    /// returning the old item. The entry keeps its id.
    pub fn replace(&mut self, id: EntryId, item: T) -> Option<T> {
        let entry = match self.slots.get_mut(id.0)? {
            Slot::Occupied(entry) => entry,
            Slot::Vacant => return None,
        };
        let old = std::mem::replace(&mut entry.item, item);
        let pos = entry.index;
        self.fix_at(pos);
        Some(old)
    }

    /// Mutates an entry in place, then restores heap order around it.
    pub fn update<F>(&mut self, id: EntryId, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        let entry = match self.slots.get_mut(id.0) {
            Some(Slot::Occupied(entry)) => entry,
            _ => return false,
        };
        f(&mut entry.item);
        let pos = entry.index;
        self.fix_at(pos);
        true
    }

    /// Restores heap order after the entry's ordering key changed.
    pub fn fix(&mut self, id: EntryId) {
        if let Some(pos) = self.position(id) {
            self.fix_at(pos);
        }
    }

    /// First entry (in heap array order) matching `pred`. O(n).
    pub fn find<P>(&self, mut pred: P) -> Option<EntryId>
    where
        P: FnMut(&T) -> bool,
    {
        self.order
            .iter()
            .find(|&&slot| pred(self.item(slot)))
            .map(|&slot| EntryId(slot))
    }

    /// Items in heap array order, not sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().map(|&slot| self.item(slot))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.order.clear();
    }

    /// Checks the heap property and every back-pointer. O(n).
    pub fn is_consistent(&self) -> bool {
        let positions_ok = self.order.iter().enumerate().all(|(pos, &slot)| {
            matches!(&self.slots[slot], Slot::Occupied(entry) if entry.index == pos)
        });
        let order_ok = (1..self.order.len()).all(|child| !self.less_at(child, (child - 1) / 2));
        let live = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Occupied(_)))
            .count();
        positions_ok && order_ok && live == self.order.len()
    }

    fn item(&self, slot: usize) -> &T {
        match &self.slots[slot] {
            Slot::Occupied(entry) => &entry.item,
            Slot::Vacant => unreachable!("heap order references vacant slot {slot}"),
        }
    }

    fn set_index(&mut self, slot: usize, pos: usize) {
        if let Slot::Occupied(entry) = &mut self.slots[slot] {
            entry.index = pos;
        }
    }

    fn less_at(&self, i: usize, j: usize) -> bool {
        (self.less)(self.item(self.order[i]), self.item(self.order[j]))
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.order.swap(i, j);
        self.set_index(self.order[i], i);
        self.set_index(self.order[j], j);
    }

    fn remove_at(&mut self, pos: usize) -> T {
        let slot = self.order.swap_remove(pos);
        if pos < self.order.len() {
            let moved = self.order[pos];
            self.set_index(moved, pos);
            // The replacement may belong above or below its new position.
            self.fix_at(pos);
        }
        self.release(slot)
    }

    fn release(&mut self, slot: usize) -> T {
        match std::mem::replace(&mut self.slots[slot], Slot::Vacant) {
            Slot::Occupied(entry) => {
                self.free.push(slot);
                entry.item
            }
            Slot::Vacant => unreachable!("released vacant slot {slot}"),
        }
    }

    fn fix_at(&mut self, pos: usize) {
        if !self.down(pos) {
            self.up(pos);
        }
    }

    fn up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less_at(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    /// Returns whether the entry moved.
    fn down(&mut self, start: usize) -> bool {
        let len = self.order.len();
        let mut pos = start;
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less_at(right, left) {
                right
            } else {
                left
            };
            if !self.less_at(child, pos) {
                break;
            }
            self.swap(pos, child);
            pos = child;
        }
        pos > start
    }
}

impl<T: fmt::Debug> fmt::Debug for Heap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
