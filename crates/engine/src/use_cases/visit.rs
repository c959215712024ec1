//! Gated random-teleport visits.
//!
//! A visit walks the full gauntlet: resolve the requested name, require an
//! active world, pass the cooldown gate, hold still through the countdown,
//! then land on a pooled location. Spawn teleports bypass the gates and go
//! straight to the pinned spawn.

use std::sync::Arc;

use farmwrld_domain::ActorId;

use crate::entities::FarmWorldRegistry;
use crate::infrastructure::ports::{
    EventBusPort, FarmWorldEvent, FarmWorldRepo, OccupantPort, ProvisionError, StoreError,
};
use crate::use_cases::cooldown::CooldownGate;
use crate::use_cases::countdown::{
    CancelReason, CountdownError, CountdownGate, CountdownOutcome, CountdownSettings, DoneCallback,
};
use crate::use_cases::locations::LocationPool;

#[derive(Debug, thiserror::Error)]
pub enum VisitError {
    #[error("Unknown farm world '{0}'")]
    UnknownWorld(String),
    #[error("Farm world '{0}' is not active")]
    Inactive(String),
    #[error("Farm world '{0}' has no current instance")]
    NoCurrentWorld(String),
    #[error("No teleport location available for '{0}'")]
    NoLocationAvailable(String),
    #[error("Visit is on cooldown for another {remaining_secs}s")]
    OnCooldown { remaining_secs: i64 },
    #[error("A countdown is already running for this actor")]
    CountdownRunning,
    #[error("Actor is not connected")]
    ActorOffline,
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Runs the visit flow for actors asking to enter a farm world.
#[derive(Clone)]
pub struct RandomTeleport {
    registry: Arc<FarmWorldRegistry>,
    pool: Arc<LocationPool>,
    cooldowns: CooldownGate,
    countdowns: CountdownGate,
    occupants: Arc<dyn OccupantPort>,
    events: Arc<dyn EventBusPort>,
    farm_worlds: Arc<dyn FarmWorldRepo>,
    settings: CountdownSettings,
}

impl RandomTeleport {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<FarmWorldRegistry>,
        pool: Arc<LocationPool>,
        cooldowns: CooldownGate,
        countdowns: CountdownGate,
        occupants: Arc<dyn OccupantPort>,
        events: Arc<dyn EventBusPort>,
        farm_worlds: Arc<dyn FarmWorldRepo>,
        settings: CountdownSettings,
    ) -> Self {
        Self {
            registry,
            pool,
            cooldowns,
            countdowns,
            occupants,
            events,
            farm_worlds,
            settings,
        }
    }

    pub fn cooldowns(&self) -> &CooldownGate {
        &self.cooldowns
    }

    /// Start a gated visit: checks the world and the cooldown, then arms the
    /// countdown. The teleport itself happens when the countdown completes.
    pub async fn begin(&self, actor: ActorId, requested: &str) -> Result<(), VisitError> {
        let world = self
            .registry
            .resolve(requested)
            .ok_or_else(|| VisitError::UnknownWorld(requested.to_string()))?;
        if !world.is_active().await {
            return Err(VisitError::Inactive(world.name().to_string()));
        }
        if let Some(remaining) = self.cooldowns.remaining(actor, world.name()).await {
            return Err(VisitError::OnCooldown {
                remaining_secs: remaining.num_seconds(),
            });
        }

        let flow = self.clone();
        let farm_world = world.name().to_string();
        let callback: DoneCallback = Box::new(move |outcome| {
            tokio::spawn(async move {
                flow.finish(actor, &farm_world, outcome).await;
            });
        });
        self.countdowns
            .start(actor, self.settings, callback)
            .await
            .map_err(|err| match err {
                CountdownError::AlreadyRunning => VisitError::CountdownRunning,
                CountdownError::Offline => VisitError::ActorOffline,
            })
    }

    /// Abort an actor's pending visit.
    pub fn cancel(&self, actor: ActorId) -> bool {
        self.countdowns.cancel(actor, CancelReason::Aborted)
    }

    /// Ungated teleport to the pinned spawn of the current instance, falling
    /// back to a pooled location when no spawn is pinned.
    pub async fn to_spawn(&self, actor: ActorId, requested: &str) -> Result<(), VisitError> {
        let world = self
            .registry
            .resolve(requested)
            .ok_or_else(|| VisitError::UnknownWorld(requested.to_string()))?;
        if !self.occupants.is_connected(&actor).await {
            return Err(VisitError::ActorOffline);
        }
        let target = match world.spawn_point(self.farm_worlds.as_ref()).await {
            Some(target) => target,
            None => self.pool.take(&world).await?,
        };
        self.occupants.teleport(&actor, &target).await?;
        Ok(())
    }

    async fn finish(&self, actor: ActorId, farm_world: &str, outcome: CountdownOutcome) {
        match outcome {
            CountdownOutcome::Completed => {
                if let Err(err) = self.complete(actor, farm_world).await {
                    tracing::warn!(
                        farm_world = %farm_world,
                        actor = %actor,
                        error = %err,
                        "Visit completion failed"
                    );
                }
            }
            CountdownOutcome::Cancelled(reason) => {
                self.publish(FarmWorldEvent::CountdownCancelled {
                    actor,
                    farm_world: farm_world.to_string(),
                    reason: reason.as_str().to_string(),
                })
                .await;
            }
        }
    }

    async fn complete(&self, actor: ActorId, farm_world: &str) -> Result<(), VisitError> {
        let world = self
            .registry
            .resolve(farm_world)
            .ok_or_else(|| VisitError::UnknownWorld(farm_world.to_string()))?;
        if !world.is_active().await {
            return Err(VisitError::Inactive(world.name().to_string()));
        }

        let target = self.pool.take(&world).await?;
        self.occupants.teleport(&actor, &target).await?;
        self.cooldowns
            .trigger(actor, world.name(), world.definition().cooldown)
            .await;
        self.publish(FarmWorldEvent::VisitCompleted {
            actor,
            farm_world: world.name().to_string(),
            world: target.world,
        })
        .await;
        Ok(())
    }

    async fn publish(&self, event: FarmWorldEvent) {
        if let Err(err) = self.events.publish(event).await {
            tracing::warn!(error = %err, "Event publish failed");
        }
    }
}
