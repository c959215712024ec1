// Port traits define the full contract - many methods are for future use
#![allow(dead_code)]

//! Ports onto the world host: instance provisioning and occupant presence.

use async_trait::async_trait;
use farmwrld_domain::{ActorId, Border, FarmWorldDefinition, Position, WorldLocation};

use super::error::ProvisionError;

/// Instance provisioning against the world host.
///
/// The host owns instance naming: `create_instance` returns the generated
/// name and every creation yields a distinct instance.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorldHostPort: Send + Sync {
    /// Provision a brand-new instance for `definition`, optionally copying
    /// the named template instead of generating terrain. Returns the
    /// instance name.
    async fn create_instance(
        &self,
        definition: &FarmWorldDefinition,
        template: Option<String>,
    ) -> Result<String, ProvisionError>;

    /// Ensure an already-provisioned instance is loaded.
    async fn load_instance(
        &self,
        name: &str,
        definition: &FarmWorldDefinition,
    ) -> Result<(), ProvisionError>;

    /// Unload an instance, keeping its data for a later load.
    async fn unload_instance(&self, name: &str) -> Result<(), ProvisionError>;

    /// Unload an instance and delete its data.
    async fn destroy_instance(&self, name: &str) -> Result<(), ProvisionError>;

    /// Sample one safe position inside `world`, constrained by `border`.
    async fn random_safe_location(
        &self,
        world: &str,
        border: Option<Border>,
    ) -> Result<Position, ProvisionError>;
}

/// Occupant presence and movement in the world host.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OccupantPort: Send + Sync {
    /// Actors currently inside the named instance.
    async fn occupants_of(&self, world: &str) -> Vec<ActorId>;

    async fn is_connected(&self, actor: &ActorId) -> bool;

    /// Where the actor currently stands; None when disconnected.
    async fn position_of(&self, actor: &ActorId) -> Option<WorldLocation>;

    async fn teleport(&self, actor: &ActorId, target: &WorldLocation)
        -> Result<(), ProvisionError>;
}
