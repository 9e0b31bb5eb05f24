//! Dense storage with two-phase deletion
//!
//! Pools iterate their store by index while control actions and collision
//! outcomes delete entries. Deleting only marks the slot; the slot stays
//! readable until [`CompactingStore::compact`] drops every marked entry in one
//! pass, preserving the order of survivors. [`CompactingStore::swap_remove`]
//! is the eager alternative for callers that never iterate while deleting.

use std::ops::{Index, IndexMut};

#[derive(Debug, Clone)]
pub struct CompactingStore<T> {
    items: Vec<T>,
    removed: Vec<bool>,
    pending: usize,
}

impl<T> Default for CompactingStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CompactingStore<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            removed: Vec::with_capacity(capacity),
            pending: 0,
        }
    }

    /// Append an item, returning its slot index
    #[inline]
    pub fn add(&mut self, item: T) -> usize {
        self.items.push(item);
        self.removed.push(false);
        self.items.len() - 1
    }

    /// Mark a slot for removal at the next compaction.
    ///
    /// Returns false if the slot was already marked or is out of range.
    #[inline]
    pub fn delete(&mut self, index: usize) -> bool {
        match self.removed.get_mut(index) {
            Some(flag) if !*flag => {
                *flag = true;
                self.pending += 1;
                true
            }
            _ => false,
        }
    }

    /// Remove a slot immediately by moving the last element into it
    pub fn swap_remove(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        if self.removed.swap_remove(index) {
            self.pending -= 1;
        }
        Some(self.items.swap_remove(index))
    }

    /// Drop every marked slot, preserving the relative order of survivors
    pub fn compact(&mut self) {
        if self.pending == 0 {
            return;
        }
        let removed = std::mem::take(&mut self.removed);
        let mut flags = removed.iter();
        self.items.retain(|_| !flags.next().copied().unwrap_or(false));
        self.removed = removed;
        self.removed.clear();
        self.removed.resize(self.items.len(), false);
        self.pending = 0;
    }

    #[inline]
    pub fn is_removed(&self, index: usize) -> bool {
        self.removed.get(index).copied().unwrap_or(true)
    }

    /// Number of live elements
    #[inline]
    pub fn count(&self) -> usize {
        self.items.len() - self.pending
    }

    /// Number of physical slots, including marked ones
    #[inline]
    pub fn slots(&self) -> usize {
        self.items.len()
    }

    /// Number of slots awaiting compaction
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Live elements with their slot indices
    pub fn iter_live(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.removed[*i])
    }

    /// The backing slice. Only dense once compacted.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.removed.clear();
        self.pending = 0;
    }
}

impl<T> Index<usize> for CompactingStore<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> IndexMut<usize> for CompactingStore<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }
}
