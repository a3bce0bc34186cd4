//! Capacity-bounded collections.
//!
//! None of these ever grow past their capacity: a write that would overflow
//! is rejected with [`StoreError::Capacity`] and the collection is left as it
//! was. Callers log the rejection and carry on.

use crate::error::{Collection, StoreError};
use crate::types::Position;
use std::collections::{BTreeMap, BTreeSet};

/// Ordered, duplicate-free set with a hard capacity.
#[derive(Debug, Clone)]
pub struct BoundedSet<T> {
    items: BTreeSet<T>,
    capacity: usize,
    kind: Collection,
}

impl<T: Ord + Copy> BoundedSet<T> {
    pub fn new(kind: Collection, capacity: usize) -> Self {
        Self {
            items: BTreeSet::new(),
            capacity,
            kind,
        }
    }

    /// Inserts `item`.
    ///
    /// Returns `Ok(true)` if it was added, `Ok(false)` if it was already
    /// present. A full set rejects new items but still reports existing ones
    /// as present.
    pub fn insert(&mut self, item: T) -> Result<bool, StoreError> {
        if self.items.contains(&item) {
            return Ok(false);
        }
        if self.items.len() >= self.capacity {
            return Err(StoreError::Capacity {
                collection: self.kind,
                capacity: self.capacity,
            });
        }
        Ok(self.items.insert(item))
    }

    /// Removes `item`, returning whether it was present.
    pub fn remove(&mut self, item: &T) -> bool {
        self.items.remove(item)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().copied().collect()
    }
}

/// Append-only position log; writes past capacity are dropped.
#[derive(Debug, Clone)]
pub struct PositionLog {
    entries: Vec<Position>,
    capacity: usize,
    kind: Collection,
}

impl PositionLog {
    pub fn new(kind: Collection, capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            kind,
        }
    }

    pub fn record(&mut self, position: Position) -> Result<(), StoreError> {
        if self.entries.len() >= self.capacity {
            return Err(StoreError::Capacity {
                collection: self.kind,
                capacity: self.capacity,
            });
        }
        self.entries.push(position);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Position] {
        &self.entries
    }
}

/// Keyed table with a hard capacity on the number of keys.
#[derive(Debug, Clone)]
pub struct BoundedMap<K, V> {
    entries: BTreeMap<K, V>,
    capacity: usize,
    kind: Collection,
}

impl<K: Ord + Copy, V: Copy> BoundedMap<K, V> {
    pub fn new(kind: Collection, capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity,
            kind,
        }
    }

    /// Inserts or overwrites `key`. New keys are rejected once full.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), StoreError> {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            return Err(StoreError::Capacity {
                collection: self.kind,
                capacity: self.capacity,
            });
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<(K, V)> {
        self.entries.iter().map(|(k, v)| (*k, *v)).collect()
    }
}
