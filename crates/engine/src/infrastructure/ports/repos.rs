// Port traits define the full contract - many methods are for future use
#![allow(dead_code)]

//! Repository ports for lifecycle state and location persistence.

use async_trait::async_trait;
use farmwrld_domain::{FarmWorldDefinition, FarmWorldState, LocationId, SpawnPoint, WorldLocation};
use serde::{Deserialize, Serialize};

use super::error::StoreError;

/// Persisted snapshot of one farm world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmWorldRecord {
    pub definition: FarmWorldDefinition,
    pub state: FarmWorldState,
    /// Operator spawn override, kept with the record so it survives restarts.
    #[serde(default)]
    pub spawn: Option<SpawnPoint>,
}

/// Flat persisted row for one pooled location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub id: LocationId,
    pub farm_world: String,
    pub location: WorldLocation,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FarmWorldRepo: Send + Sync {
    /// Upsert the record under the farm world name.
    async fn save(&self, name: &str, record: &FarmWorldRecord) -> Result<(), StoreError>;

    async fn load_all(&self) -> Result<Vec<FarmWorldRecord>, StoreError>;

    async fn delete(&self, name: &str) -> Result<(), StoreError>;

    /// Spawn override recorded next to a specific instance. `Stale` means a
    /// record exists but cannot be read anymore; callers treat it as absent.
    async fn load_spawn(&self, instance: &str) -> Result<Option<SpawnPoint>, StoreError>;

    async fn save_spawn(&self, instance: &str, spawn: &SpawnPoint) -> Result<(), StoreError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationRepo: Send + Sync {
    async fn save(
        &self,
        farm_world: &str,
        id: LocationId,
        location: &WorldLocation,
    ) -> Result<(), StoreError>;

    async fn delete(&self, id: LocationId) -> Result<(), StoreError>;

    /// Drop every location belonging to the farm world.
    async fn delete_all_for(&self, farm_world: &str) -> Result<(), StoreError>;

    /// All persisted locations in insertion order.
    async fn load_all(&self) -> Result<Vec<LocationRecord>, StoreError>;
}
