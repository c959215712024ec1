//! Farm world entity - definition, guarded runtime state, and the location pool.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use farmwrld_domain::{
    FarmWorldDefinition, FarmWorldState, LocationCache, SpawnPoint, WorldLocation,
};

use crate::infrastructure::ports::{FarmWorldRecord, FarmWorldRepo, FarmWorldStatus};

/// One configured farm world.
///
/// `ops` serializes lifecycle transitions per world and is held across the
/// whole transition. `state` and `pool` are taken briefly for reads and
/// mutations; when several locks are needed the order is ops, then state,
/// then pool. The pool has its own lock so visits never wait behind a
/// transition's provisioning calls.
pub struct FarmWorld {
    definition: FarmWorldDefinition,
    ops: Mutex<()>,
    state: Mutex<FarmWorldState>,
    pool: Mutex<LocationCache>,
    spawn: Mutex<Option<SpawnPoint>>,
    pregen_inflight: AtomicBool,
}

impl FarmWorld {
    pub fn new(definition: FarmWorldDefinition) -> Self {
        Self::from_parts(definition, FarmWorldState::default(), None)
    }

    pub fn from_record(record: FarmWorldRecord) -> Self {
        Self::from_parts(record.definition, record.state, record.spawn)
    }

    /// Build from a configured definition and previously persisted state.
    pub fn from_parts(
        definition: FarmWorldDefinition,
        state: FarmWorldState,
        spawn: Option<SpawnPoint>,
    ) -> Self {
        Self {
            definition,
            ops: Mutex::new(()),
            state: Mutex::new(state),
            pool: Mutex::new(LocationCache::new()),
            spawn: Mutex::new(spawn),
            pregen_inflight: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &FarmWorldDefinition {
        &self.definition
    }

    /// Lifecycle transition lock; held for the span of a transition.
    pub fn ops(&self) -> &Mutex<()> {
        &self.ops
    }

    pub fn state(&self) -> &Mutex<FarmWorldState> {
        &self.state
    }

    pub fn pool(&self) -> &Mutex<LocationCache> {
        &self.pool
    }

    pub async fn snapshot(&self) -> FarmWorldState {
        self.state.lock().await.clone()
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.active
    }

    pub async fn current_world(&self) -> Option<String> {
        self.state.lock().await.current_world_name.clone()
    }

    pub async fn status(&self) -> FarmWorldStatus {
        let state = self.state.lock().await;
        FarmWorldStatus {
            farm_world: self.definition.name.clone(),
            active: state.active,
            current_world: state.current_world_name.clone(),
            reset_at: state.reset_at(self.definition.timer),
        }
    }

    /// Persistable snapshot of definition, state, and spawn override.
    pub async fn record(&self) -> FarmWorldRecord {
        FarmWorldRecord {
            definition: self.definition.clone(),
            state: self.snapshot().await,
            spawn: *self.spawn.lock().await,
        }
    }

    pub async fn spawn_override(&self) -> Option<SpawnPoint> {
        *self.spawn.lock().await
    }

    pub async fn set_spawn_override(&self, spawn: Option<SpawnPoint>) {
        *self.spawn.lock().await = spawn;
    }

    /// Preferred spawn for the current instance: the spawn record stored next
    /// to the instance wins, then the in-memory override. Unreadable records
    /// degrade to the override with a debug log, never an error.
    pub async fn spawn_point(&self, repo: &dyn FarmWorldRepo) -> Option<WorldLocation> {
        let current = self.current_world().await?;
        match repo.load_spawn(&current).await {
            Ok(Some(spawn)) => return Some(spawn.into_location(current)),
            Ok(None) => {}
            Err(err) => {
                tracing::debug!(world = %current, error = %err, "Ignoring unreadable spawn record");
            }
        }
        let spawn = (*self.spawn.lock().await)?;
        Some(spawn.into_location(current))
    }

    /// Claim the pre-generation slot; false when a creation is in flight.
    pub fn try_begin_pregeneration(&self) -> bool {
        self.pregen_inflight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end_pregeneration(&self) {
        self.pregen_inflight.store(false, Ordering::Release);
    }

    pub fn pregeneration_in_flight(&self) -> bool {
        self.pregen_inflight.load(Ordering::Acquire)
    }
}
