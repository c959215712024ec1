//! Farm world lifecycle - activation, rotation, pregeneration, deletion.
//!
//! Every transition takes the per-world ops lock first, so concurrent
//! transitions on the same farm world serialize. State and pool locks are
//! held only for short reads and writes inside a transition.

use std::sync::Arc;

use farmwrld_domain::{FarmWorldDefinition, SpawnPoint};

use crate::entities::{FarmWorld, FarmWorldRegistry};
use crate::infrastructure::ports::{
    ClockPort, EventBusPort, FarmWorldEvent, FarmWorldRepo, OccupantPort, ProvisionError,
    RandomPort, StoreError, WorldHostPort,
};
use crate::use_cases::locations::LocationPool;
use crate::use_cases::scheduler::TickRoster;

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Unknown farm world '{0}'")]
    UnknownWorld(String),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives farm worlds through their lifecycle against the host, the stores,
/// and the event bus.
#[derive(Clone)]
pub struct FarmWorldLifecycle {
    registry: Arc<FarmWorldRegistry>,
    roster: Arc<TickRoster>,
    pool: Arc<LocationPool>,
    host: Arc<dyn WorldHostPort>,
    occupants: Arc<dyn OccupantPort>,
    farm_worlds: Arc<dyn FarmWorldRepo>,
    events: Arc<dyn EventBusPort>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
}

impl FarmWorldLifecycle {
    pub fn new(
        registry: Arc<FarmWorldRegistry>,
        roster: Arc<TickRoster>,
        pool: Arc<LocationPool>,
        host: Arc<dyn WorldHostPort>,
        occupants: Arc<dyn OccupantPort>,
        farm_worlds: Arc<dyn FarmWorldRepo>,
        events: Arc<dyn EventBusPort>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            registry,
            roster,
            pool,
            host,
            occupants,
            farm_worlds,
            events,
            clock,
            random,
        }
    }

    /// Mark a farm world active and bring its instance up in the background.
    ///
    /// Activating an already-active world is a no-op.
    pub async fn activate(&self, name: &str) -> Result<(), LifecycleError> {
        let world = self.resolve(name)?;
        {
            let mut state = world.state().lock().await;
            if state.active {
                return Ok(());
            }
            state.active = true;
        }
        // The flag is already flipped; a failed save must not stall the start.
        if let Err(err) = self.persist(&world).await {
            tracing::warn!(farm_world = %world.name(), error = %err, "Failed to persist activation");
        }
        self.start_world(world);
        Ok(())
    }

    /// Bring up the instance for a world already flagged active: load the
    /// persisted instance when one exists, otherwise create a fresh one.
    /// Used by `activate` and by startup for worlds restored as active.
    pub(crate) fn start_world(&self, world: Arc<FarmWorld>) {
        let this = self.clone();
        tokio::spawn(async move {
            let _ops = world.ops().lock().await;

            let existing = {
                let state = world.state().lock().await;
                if !state.active {
                    return;
                }
                state.current_world_name.clone()
            };

            let brought_up = match existing {
                Some(instance) => this
                    .host
                    .load_instance(&instance, world.definition())
                    .await
                    .map(|_| instance),
                None => {
                    let template = pick_template(this.random.as_ref(), world.definition());
                    this.host.create_instance(world.definition(), template).await
                }
            };

            let instance = match brought_up {
                Ok(instance) => instance,
                Err(err) => {
                    tracing::error!(
                        farm_world = %world.name(),
                        error = %err,
                        "Failed to bring up farm world instance"
                    );
                    return;
                }
            };

            {
                let mut state = world.state().lock().await;
                // A loaded instance keeps its running timer; only a fresh
                // one is promoted.
                if state.current_world_name.is_none() {
                    state.promote(instance.clone(), this.clock.now());
                }
                state.loaded = true;
                state.enabled = true;
            }

            if let Err(err) = this.persist(&world).await {
                tracing::warn!(farm_world = %world.name(), error = %err, "Failed to persist farm world after start");
            }
            this.pool.prime(&world).await;
            this.roster.register(world.name()).await;
            this.publish(FarmWorldEvent::Activated {
                farm_world: world.name().to_string(),
            })
            .await;
            tracing::info!(farm_world = %world.name(), instance = %instance, "Farm world started");
        });
    }

    /// Flag a farm world inactive and unload its instances.
    ///
    /// Instances are unloaded, not destroyed: the current and next names stay
    /// in state so reactivation resumes the running timer.
    pub async fn deactivate(&self, name: &str) -> Result<(), LifecycleError> {
        let world = self.resolve(name)?;
        let _ops = world.ops().lock().await;

        let instances = {
            let mut state = world.state().lock().await;
            if !state.active {
                return Ok(());
            }
            state.active = false;
            state.enabled = false;
            state.loaded = false;
            let mut names: Vec<String> = Vec::new();
            names.extend(state.current_world_name.clone());
            names.extend(state.next_world_name.clone());
            names
        };

        self.roster.deregister(world.name()).await;
        if let Err(err) = self.persist(&world).await {
            tracing::warn!(farm_world = %world.name(), error = %err, "Failed to persist deactivation");
        }
        self.publish(FarmWorldEvent::Deactivated {
            farm_world: world.name().to_string(),
        })
        .await;

        let host = self.host.clone();
        let name = world.name().to_string();
        tokio::spawn(async move {
            for instance in instances {
                if let Err(err) = host.unload_instance(&instance).await {
                    tracing::warn!(farm_world = %name, instance = %instance, error = %err, "Failed to unload instance");
                }
            }
        });
        tracing::info!(farm_world = %world.name(), "Farm world deactivated");
        Ok(())
    }

    /// Swap the current instance for a new one.
    ///
    /// The replacement is the explicit argument when given, else the
    /// pregenerated instance, else a fresh inline creation. Occupants of the
    /// outgoing instance are relocated into the incoming one before the old
    /// instance is torn down.
    pub async fn rotate(
        &self,
        name: &str,
        replacement: Option<String>,
    ) -> Result<String, LifecycleError> {
        let world = self.resolve(name)?;
        let _ops = world.ops().lock().await;

        let pregenerated = {
            let state = world.state().lock().await;
            state.next_world_name.clone()
        };

        let (incoming, orphaned) = match replacement {
            Some(instance) => {
                let orphaned = pregenerated.filter(|next| next != &instance);
                (instance, orphaned)
            }
            None => match pregenerated {
                Some(next) => (next, None),
                None => {
                    tracing::warn!(
                        farm_world = %world.name(),
                        "No pregenerated instance at rotation; creating inline"
                    );
                    let template = pick_template(self.random.as_ref(), world.definition());
                    let fresh = self
                        .host
                        .create_instance(world.definition(), template)
                        .await?;
                    (fresh, None)
                }
            },
        };

        let old = {
            let mut state = world.state().lock().await;
            let old = state.promote(incoming.clone(), self.clock.now());
            state.loaded = true;
            old
        };

        tracing::info!(farm_world = %world.name(), old = ?old, new = %incoming, "Rotating farm world");
        self.publish(FarmWorldEvent::WorldChanged {
            farm_world: world.name().to_string(),
            old_world: old.clone(),
            new_world: incoming.clone(),
        })
        .await;

        if let Err(err) = self.pool.clear(&world).await {
            tracing::warn!(farm_world = %world.name(), error = %err, "Failed to clear location pool");
        }
        self.pool.prime(&world).await;

        if let Some(old) = old {
            self.evacuate(&world, &old).await;
            self.dispatch_destroy(world.name(), old);
        }
        if let Some(orphaned) = orphaned {
            self.dispatch_destroy(world.name(), orphaned);
        }

        self.persist(&world).await?;
        Ok(incoming)
    }

    /// Create the next instance ahead of the reset, at most one creation in
    /// flight per farm world. A failed attempt releases the slot so the next
    /// scheduler pass retries.
    pub async fn pre_generate_next(&self, name: &str) -> Result<(), LifecycleError> {
        let world = self.resolve(name)?;
        {
            let state = world.state().lock().await;
            if state.next_world_name.is_some() {
                return Ok(());
            }
        }
        if !world.try_begin_pregeneration() {
            return Ok(());
        }

        let this = self.clone();
        tokio::spawn(async move {
            let template = pick_template(this.random.as_ref(), world.definition());
            match this.host.create_instance(world.definition(), template).await {
                Ok(instance) => {
                    {
                        let mut state = world.state().lock().await;
                        state.next_world_name = Some(instance.clone());
                    }
                    if let Err(err) = this.persist(&world).await {
                        tracing::warn!(
                            farm_world = %world.name(),
                            error = %err,
                            "Failed to persist pregenerated instance"
                        );
                    }
                    tracing::info!(farm_world = %world.name(), instance = %instance, "Pregenerated next instance");
                }
                Err(err) => {
                    tracing::error!(farm_world = %world.name(), error = %err, "Pregeneration failed");
                }
            }
            world.end_pregeneration();
        });
        Ok(())
    }

    /// Tear a farm world down completely: destroy its instances, drop its
    /// persisted record and pooled locations, and remove it from the
    /// registry.
    pub async fn delete(&self, name: &str) -> Result<(), LifecycleError> {
        let world = self.resolve(name)?;
        let _ops = world.ops().lock().await;

        let instances = {
            let mut state = world.state().lock().await;
            state.active = false;
            state.enabled = false;
            state.loaded = false;
            let mut names: Vec<String> = Vec::new();
            names.extend(state.current_world_name.take());
            names.extend(state.next_world_name.take());
            state.created_at = None;
            names
        };

        self.roster.deregister(world.name()).await;
        if let Err(err) = self.pool.clear(&world).await {
            tracing::warn!(farm_world = %world.name(), error = %err, "Failed to clear location pool");
        }
        for instance in instances {
            if let Err(err) = self.host.destroy_instance(&instance).await {
                tracing::warn!(farm_world = %world.name(), instance = %instance, error = %err, "Failed to destroy instance");
            }
        }
        self.farm_worlds.delete(world.name()).await?;
        self.registry.remove(world.name());
        tracing::info!(farm_world = %world.name(), "Farm world deleted");
        Ok(())
    }

    /// Pin the arrival spawn for the current instance.
    pub async fn set_spawn(&self, name: &str, spawn: SpawnPoint) -> Result<(), LifecycleError> {
        let world = self.resolve(name)?;
        world.set_spawn_override(Some(spawn.clone())).await;
        if let Some(instance) = world.current_world().await {
            self.farm_worlds.save_spawn(&instance, &spawn).await?;
        }
        self.persist(&world).await?;
        Ok(())
    }

    async fn evacuate(&self, world: &Arc<FarmWorld>, instance: &str) {
        let actors = self.occupants.occupants_of(instance).await;
        for actor in actors {
            let target = match self.pool.take(world).await {
                Ok(target) => target,
                Err(err) => {
                    tracing::warn!(
                        farm_world = %world.name(),
                        actor = %actor,
                        error = %err,
                        "No relocation target for occupant"
                    );
                    continue;
                }
            };
            if let Err(err) = self.occupants.teleport(&actor, &target).await {
                tracing::warn!(farm_world = %world.name(), actor = %actor, error = %err, "Failed to relocate occupant");
            }
        }
    }

    fn dispatch_destroy(&self, farm_world: &str, instance: String) {
        let host = self.host.clone();
        let farm_world = farm_world.to_string();
        tokio::spawn(async move {
            if let Err(err) = host.destroy_instance(&instance).await {
                tracing::warn!(farm_world = %farm_world, instance = %instance, error = %err, "Failed to destroy instance");
            }
        });
    }

    fn resolve(&self, name: &str) -> Result<Arc<FarmWorld>, LifecycleError> {
        self.registry
            .resolve(name)
            .ok_or_else(|| LifecycleError::UnknownWorld(name.to_string()))
    }

    async fn persist(&self, world: &Arc<FarmWorld>) -> Result<(), StoreError> {
        let record = world.record().await;
        self.farm_worlds.save(world.name(), &record).await
    }

    async fn publish(&self, event: FarmWorldEvent) {
        if let Err(err) = self.events.publish(event).await {
            tracing::warn!(error = %err, "Event publish failed");
        }
    }
}

fn pick_template(random: &dyn RandomPort, definition: &FarmWorldDefinition) -> Option<String> {
    let templates = definition.templates.as_ref()?;
    if templates.is_empty() {
        return None;
    }
    let index = random.gen_range(0, templates.len() as i32 - 1) as usize;
    templates.get(index).cloned()
}
