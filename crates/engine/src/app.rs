//! Application state and composition.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::EngineConfig;
use crate::entities::{FarmWorld, FarmWorldRegistry};
use crate::infrastructure::ports::{
    ClockPort, DisplayPort, EventBusPort, FarmWorldRepo, LocationRecord, LocationRepo,
    OccupantPort, RandomPort, StoreError, WorldHostPort,
};
use crate::use_cases::{
    CooldownGate, CountdownGate, FarmWorldLifecycle, LifecycleError, LocationPool, RandomTeleport,
    Scheduler, TickRoster,
};

/// The port implementations the engine is wired against.
pub struct EnginePorts {
    pub host: Arc<dyn WorldHostPort>,
    pub occupants: Arc<dyn OccupantPort>,
    pub farm_worlds: Arc<dyn FarmWorldRepo>,
    pub locations: Arc<dyn LocationRepo>,
    pub events: Arc<dyn EventBusPort>,
    pub display: Arc<dyn DisplayPort>,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
}

/// Composition root: owns the registry, the services, and the worker tasks.
pub struct Engine {
    config: EngineConfig,
    registry: Arc<FarmWorldRegistry>,
    lifecycle: Arc<FarmWorldLifecycle>,
    scheduler: Scheduler,
    countdowns: CountdownGate,
    visits: RandomTeleport,
    pool: Arc<LocationPool>,
    host: Arc<dyn WorldHostPort>,
    farm_worlds: Arc<dyn FarmWorldRepo>,
    locations: Arc<dyn LocationRepo>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Engine {
    /// Wire all services against the given ports.
    pub fn new(config: EngineConfig, ports: EnginePorts) -> Self {
        let registry = Arc::new(FarmWorldRegistry::new());
        let roster = Arc::new(TickRoster::new());
        let pool = Arc::new(LocationPool::new(
            ports.host.clone(),
            ports.locations.clone(),
            config.pool_watermark,
        ));
        let cooldowns = CooldownGate::new(ports.clock.clone());
        let countdowns = CountdownGate::new(ports.occupants.clone());
        let lifecycle = Arc::new(FarmWorldLifecycle::new(
            registry.clone(),
            roster.clone(),
            pool.clone(),
            ports.host.clone(),
            ports.occupants.clone(),
            ports.farm_worlds.clone(),
            ports.events.clone(),
            ports.clock.clone(),
            ports.random.clone(),
        ));
        let scheduler = Scheduler::new(
            registry.clone(),
            roster,
            lifecycle.clone(),
            ports.display.clone(),
            ports.clock.clone(),
            config.sweep_every_secs,
        );
        let visits = RandomTeleport::new(
            registry.clone(),
            pool.clone(),
            cooldowns,
            countdowns.clone(),
            ports.occupants.clone(),
            ports.events.clone(),
            ports.farm_worlds.clone(),
            config.countdown.settings(),
        );

        Self {
            config,
            registry,
            lifecycle,
            scheduler,
            countdowns,
            visits,
            pool,
            host: ports.host,
            farm_worlds: ports.farm_worlds,
            locations: ports.locations,
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<FarmWorldRegistry> {
        &self.registry
    }

    pub fn lifecycle(&self) -> &Arc<FarmWorldLifecycle> {
        &self.lifecycle
    }

    pub fn visits(&self) -> &RandomTeleport {
        &self.visits
    }

    /// Operator removal: tear the farm world down and drop its visit
    /// cooldowns, so a later world under the same name starts unburdened.
    pub async fn delete_farm_world(&self, name: &str) -> Result<(), LifecycleError> {
        let world = self
            .registry
            .resolve(name)
            .ok_or_else(|| LifecycleError::UnknownWorld(name.to_string()))?;
        let canonical = world.name().to_string();
        self.lifecycle.delete(&canonical).await?;
        self.visits.cooldowns().clear_farm_world(&canonical).await;
        Ok(())
    }

    /// Restore persisted state, merge it with the configured definitions,
    /// bring active worlds back up, and start the worker loops.
    ///
    /// Configured definitions are authoritative; persisted records only
    /// contribute their runtime state. A stored record without a matching
    /// definition is left untouched and skipped.
    pub async fn start(&self) -> Result<(), StoreError> {
        let mut stored: HashMap<String, _> = self
            .farm_worlds
            .load_all()
            .await?
            .into_iter()
            .map(|record| (record.definition.name.clone(), record))
            .collect();

        for definition in &self.config.farm_worlds {
            let world = match stored.remove(&definition.name) {
                Some(record) => Arc::new(FarmWorld::from_parts(
                    definition.clone(),
                    record.state,
                    record.spawn,
                )),
                None => Arc::new(FarmWorld::new(definition.clone())),
            };
            self.registry.insert(world);
        }
        for name in stored.keys() {
            tracing::warn!(farm_world = %name, "Stored farm world has no configured definition; skipping");
        }

        let mut rows: HashMap<String, Vec<LocationRecord>> = HashMap::new();
        for row in self.locations.load_all().await? {
            rows.entry(row.farm_world.clone()).or_default().push(row);
        }
        for (name, records) in rows {
            if let Some(world) = self.registry.get(&name) {
                self.pool.restore(&world, records).await;
            }
        }

        for world in self.registry.all() {
            if world.is_active().await {
                self.lifecycle.start_world(world);
            }
        }

        let mut workers = self.workers.lock().await;
        workers.push(self.scheduler.spawn());
        workers.push(self.countdowns.spawn());
        tracing::info!(
            farm_worlds = self.registry.len(),
            "Farm world engine started"
        );
        Ok(())
    }

    /// Stop the workers, persist every world, and unload loaded instances.
    ///
    /// The active flag is kept as-is so the next start resumes where this
    /// run left off.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock().await;
            workers.drain(..).collect()
        };
        for handle in handles {
            handle.abort();
        }

        for world in self.registry.all() {
            let record = world.record().await;
            if let Err(err) = self.farm_worlds.save(world.name(), &record).await {
                tracing::warn!(farm_world = %world.name(), error = %err, "Failed to persist farm world at shutdown");
            }

            let snapshot = world.snapshot().await;
            if !snapshot.loaded {
                continue;
            }
            let instances = snapshot
                .current_world_name
                .iter()
                .chain(snapshot.next_world_name.iter());
            for instance in instances {
                if let Err(err) = self.host.unload_instance(instance).await {
                    tracing::warn!(instance = %instance, error = %err, "Failed to unload instance at shutdown");
                }
            }
        }
        tracing::info!("Farm world engine stopped");
    }
}
