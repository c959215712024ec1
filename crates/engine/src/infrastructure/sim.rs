//! Simulated world host and occupant tracker.
//!
//! Stands in for a real game server: instances are entries in a map, safe
//! locations are sampled inside the border, and actors are teleported by
//! rewriting their tracked location. Drives the demo daemon and the
//! integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use farmwrld_domain::{ActorId, Border, FarmWorldDefinition, Position, WorldLocation};

use crate::infrastructure::ports::{
    OccupantPort, ProvisionError, RandomPort, WorldHostPort,
};

const SURFACE_Y: f64 = 64.0;
const DEFAULT_HALF_RANGE: f64 = 256.0;

struct SimWorld {
    loaded: bool,
}

/// In-process stand-in for the world host and the occupant roster.
pub struct SimWorldHost {
    random: Arc<dyn RandomPort>,
    worlds: DashMap<String, SimWorld>,
    actors: DashMap<ActorId, WorldLocation>,
}

impl SimWorldHost {
    pub fn new(random: Arc<dyn RandomPort>) -> Self {
        Self {
            random,
            worlds: DashMap::new(),
            actors: DashMap::new(),
        }
    }

    pub fn connect_actor(&self, actor: ActorId, location: WorldLocation) {
        self.actors.insert(actor, location);
    }

    pub fn disconnect_actor(&self, actor: &ActorId) {
        self.actors.remove(actor);
    }

    pub fn move_actor(&self, actor: &ActorId, location: WorldLocation) {
        if let Some(mut entry) = self.actors.get_mut(actor) {
            *entry = location;
        }
    }

    pub fn world_exists(&self, name: &str) -> bool {
        self.worlds.contains_key(name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.worlds.get(name).map(|world| world.loaded).unwrap_or(false)
    }

    pub fn instance_names(&self) -> Vec<String> {
        self.worlds.iter().map(|entry| entry.key().clone()).collect()
    }

    fn sample(&self, border: Option<Border>) -> Position {
        let (half, center_x, center_z) = match border {
            Some(border) => (border.half_size(), border.center_x, border.center_z),
            None => (DEFAULT_HALF_RANGE, 0.0, 0.0),
        };
        let span = half.max(1.0) as i32;
        let x = f64::from(self.random.gen_range(-span, span)) + center_x;
        let z = f64::from(self.random.gen_range(-span, span)) + center_z;
        Position::new(x, SURFACE_Y, z)
    }
}

#[async_trait]
impl WorldHostPort for SimWorldHost {
    async fn create_instance(
        &self,
        definition: &FarmWorldDefinition,
        _template: Option<String>,
    ) -> Result<String, ProvisionError> {
        let suffix = self.random.gen_uuid().simple().to_string();
        let instance = format!("{}_{}", definition.name, &suffix[..8]);
        self.worlds.insert(instance.clone(), SimWorld { loaded: true });
        Ok(instance)
    }

    async fn load_instance(
        &self,
        name: &str,
        _definition: &FarmWorldDefinition,
    ) -> Result<(), ProvisionError> {
        self.worlds
            .entry(name.to_string())
            .and_modify(|world| world.loaded = true)
            .or_insert(SimWorld { loaded: true });
        Ok(())
    }

    async fn unload_instance(&self, name: &str) -> Result<(), ProvisionError> {
        match self.worlds.get_mut(name) {
            Some(mut world) => {
                world.loaded = false;
                Ok(())
            }
            None => Err(ProvisionError::NotLoaded(name.to_string())),
        }
    }

    async fn destroy_instance(&self, name: &str) -> Result<(), ProvisionError> {
        self.worlds.remove(name);
        Ok(())
    }

    async fn random_safe_location(
        &self,
        world: &str,
        border: Option<Border>,
    ) -> Result<Position, ProvisionError> {
        let loaded = self
            .worlds
            .get(world)
            .map(|entry| entry.loaded)
            .unwrap_or(false);
        if !loaded {
            return Err(ProvisionError::NotLoaded(world.to_string()));
        }
        Ok(self.sample(border))
    }
}

#[async_trait]
impl OccupantPort for SimWorldHost {
    async fn occupants_of(&self, world: &str) -> Vec<ActorId> {
        self.actors
            .iter()
            .filter(|entry| entry.value().world == world)
            .map(|entry| *entry.key())
            .collect()
    }

    async fn is_connected(&self, actor: &ActorId) -> bool {
        self.actors.contains_key(actor)
    }

    async fn position_of(&self, actor: &ActorId) -> Option<WorldLocation> {
        self.actors.get(actor).map(|entry| entry.value().clone())
    }

    async fn teleport(
        &self,
        actor: &ActorId,
        location: &WorldLocation,
    ) -> Result<(), ProvisionError> {
        if !self.is_loaded(&location.world) {
            return Err(ProvisionError::teleport(format!(
                "target world '{}' is not loaded",
                location.world
            )));
        }
        match self.actors.get_mut(actor) {
            Some(mut entry) => {
                *entry = location.clone();
                Ok(())
            }
            None => Err(ProvisionError::teleport(format!(
                "actor {actor} is not connected"
            ))),
        }
    }
}
