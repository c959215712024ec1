//! Insertion-ordered, duplicate-free pool of pre-generated teleport locations.

use std::collections::{HashMap, VecDeque};

use crate::ids::LocationId;
use crate::location::WorldLocation;

/// FIFO location pool for one farm world.
///
/// Entries keep insertion order and every id occurs at most once; `pop_front`
/// hands out the entry that has waited longest. Purely in-memory, no interior
/// mutability; the engine wraps it in a lock and mirrors mutations to storage.
#[derive(Debug, Default, Clone)]
pub struct LocationCache {
    order: VecDeque<LocationId>,
    entries: HashMap<LocationId, WorldLocation>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts at the back. Returns false and leaves the cache untouched when
    /// the id is already present.
    pub fn insert(&mut self, id: LocationId, location: WorldLocation) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.order.push_back(id);
        self.entries.insert(id, location);
        true
    }

    /// Removes and returns the oldest entry.
    pub fn pop_front(&mut self) -> Option<(LocationId, WorldLocation)> {
        let id = self.order.pop_front()?;
        let location = self.entries.remove(&id)?;
        Some((id, location))
    }

    pub fn remove(&mut self, id: &LocationId) -> Option<WorldLocation> {
        let location = self.entries.remove(id)?;
        self.order.retain(|other| other != id);
        Some(location)
    }

    pub fn get(&self, id: &LocationId) -> Option<&WorldLocation> {
        self.entries.get(id)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids in insertion order, oldest first.
    pub fn ids(&self) -> impl Iterator<Item = &LocationId> {
        self.order.iter()
    }
}
