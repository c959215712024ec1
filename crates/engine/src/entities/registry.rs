//! Registry of configured farm worlds.

use std::sync::Arc;

use dashmap::DashMap;

use super::farm_world::FarmWorld;

/// Concurrent name -> farm world map.
///
/// `get` is an exact match on the primary name; `resolve` also accepts
/// aliases, ignoring case.
#[derive(Default)]
pub struct FarmWorldRegistry {
    worlds: DashMap<String, Arc<FarmWorld>>,
}

impl FarmWorldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, world: Arc<FarmWorld>) {
        self.worlds.insert(world.name().to_string(), world);
    }

    pub fn remove(&self, name: &str) -> Option<Arc<FarmWorld>> {
        self.worlds.remove(name).map(|(_, world)| world)
    }

    pub fn get(&self, name: &str) -> Option<Arc<FarmWorld>> {
        self.worlds.get(name).map(|entry| entry.value().clone())
    }

    /// Find by primary name or alias, ignoring case.
    pub fn resolve(&self, candidate: &str) -> Option<Arc<FarmWorld>> {
        if let Some(world) = self.get(candidate) {
            return Some(world);
        }
        self.worlds
            .iter()
            .find(|entry| entry.value().definition().matches_name(candidate))
            .map(|entry| entry.value().clone())
    }

    pub fn all(&self) -> Vec<Arc<FarmWorld>> {
        self.worlds
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.worlds.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}
