//! In-memory store, used by tests and by the demo daemon when no database
//! path is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use farmwrld_domain::{LocationId, SpawnPoint, WorldLocation};

use crate::infrastructure::ports::{
    FarmWorldRecord, FarmWorldRepo, LocationRecord, LocationRepo, StoreError,
};

/// Holds farm world records, instance spawns, and pooled locations in process
/// memory. Location rows keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, FarmWorldRecord>>,
    spawns: RwLock<HashMap<String, SpawnPoint>>,
    rows: RwLock<Vec<LocationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FarmWorldRepo for MemoryStore {
    async fn save(&self, name: &str, record: &FarmWorldRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.insert(name.to_string(), record.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<FarmWorldRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        records.remove(name);
        Ok(())
    }

    async fn load_spawn(&self, instance: &str) -> Result<Option<SpawnPoint>, StoreError> {
        let spawns = self.spawns.read().await;
        Ok(spawns.get(instance).copied())
    }

    async fn save_spawn(&self, instance: &str, spawn: &SpawnPoint) -> Result<(), StoreError> {
        let mut spawns = self.spawns.write().await;
        spawns.insert(instance.to_string(), *spawn);
        Ok(())
    }
}

#[async_trait]
impl LocationRepo for MemoryStore {
    async fn save(
        &self,
        farm_world: &str,
        id: LocationId,
        location: &WorldLocation,
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        let record = LocationRecord {
            id,
            farm_world: farm_world.to_string(),
            location: location.clone(),
        };
        match rows.iter_mut().find(|row| row.id == id) {
            Some(row) => *row = record,
            None => rows.push(record),
        }
        Ok(())
    }

    async fn delete(&self, id: LocationId) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        rows.retain(|row| row.id != id);
        Ok(())
    }

    async fn delete_all_for(&self, farm_world: &str) -> Result<(), StoreError> {
        let mut rows = self.rows.write().await;
        rows.retain(|row| row.farm_world != farm_world);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<LocationRecord>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmwrld_domain::{FarmWorldDefinition, FarmWorldState, Position};

    fn record(name: &str) -> FarmWorldRecord {
        FarmWorldRecord {
            definition: FarmWorldDefinition::new(name, 10),
            state: FarmWorldState::default(),
            spawn: None,
        }
    }

    #[tokio::test]
    async fn farm_world_records_round_trip() {
        let store = MemoryStore::new();
        FarmWorldRepo::save(&store, "farm", &record("farm")).await.unwrap();
        FarmWorldRepo::save(&store, "nether", &record("nether")).await.unwrap();

        let loaded = FarmWorldRepo::load_all(&store).await.unwrap();
        assert_eq!(loaded.len(), 2);

        FarmWorldRepo::delete(&store, "farm").await.unwrap();
        let loaded = FarmWorldRepo::load_all(&store).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].definition.name, "nether");
    }

    #[tokio::test]
    async fn spawns_are_keyed_by_instance() {
        let store = MemoryStore::new();
        let spawn = SpawnPoint::new(Position::new(0.5, 65.0, 0.5));
        store.save_spawn("farm_a1", &spawn).await.unwrap();

        assert_eq!(store.load_spawn("farm_a1").await.unwrap(), Some(spawn));
        assert_eq!(store.load_spawn("farm_a2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn location_rows_keep_insertion_order() {
        let store = MemoryStore::new();
        let ids: Vec<LocationId> = (0..3).map(|_| LocationId::new()).collect();
        for (i, id) in ids.iter().enumerate() {
            let location = WorldLocation::new("farm_a1", Position::new(i as f64, 64.0, 0.0));
            LocationRepo::save(&store, "farm", *id, &location).await.unwrap();
        }

        let loaded = LocationRepo::load_all(&store).await.unwrap();
        let seen: Vec<LocationId> = loaded.iter().map(|row| row.id).collect();
        assert_eq!(seen, ids);
    }

    #[tokio::test]
    async fn delete_all_for_leaves_other_worlds_alone() {
        let store = MemoryStore::new();
        let farm_id = LocationId::new();
        let nether_id = LocationId::new();
        let location = WorldLocation::new("farm_a1", Position::new(0.0, 64.0, 0.0));
        LocationRepo::save(&store, "farm", farm_id, &location).await.unwrap();
        LocationRepo::save(&store, "nether", nether_id, &location).await.unwrap();

        store.delete_all_for("farm").await.unwrap();
        let loaded = LocationRepo::load_all(&store).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, nether_id);
    }

    #[tokio::test]
    async fn saving_an_existing_location_replaces_it_in_place() {
        let store = MemoryStore::new();
        let first = LocationId::new();
        let second = LocationId::new();
        let location = WorldLocation::new("farm_a1", Position::new(0.0, 64.0, 0.0));
        LocationRepo::save(&store, "farm", first, &location).await.unwrap();
        LocationRepo::save(&store, "farm", second, &location).await.unwrap();

        let moved = WorldLocation::new("farm_a1", Position::new(9.0, 64.0, 9.0));
        LocationRepo::save(&store, "farm", first, &moved).await.unwrap();

        let loaded = LocationRepo::load_all(&store).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, first);
        assert_eq!(loaded[0].location.position.x, 9.0);
    }
}
