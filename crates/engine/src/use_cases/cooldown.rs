//! Cooldown gate - per actor, per farm world visit throttling.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use farmwrld_domain::ActorId;

use crate::infrastructure::ports::ClockPort;

/// Tracks when each actor may visit each farm world again.
///
/// Expiry is lazy: entries are dropped when queried past their deadline, no
/// background sweeping. A zero cooldown never records an entry.
#[derive(Clone)]
pub struct CooldownGate {
    clock: Arc<dyn ClockPort>,
    entries: Arc<RwLock<HashMap<(ActorId, String), DateTime<Utc>>>>,
}

impl CooldownGate {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            clock,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Start the cooldown for an actor on a farm world.
    pub async fn trigger(&self, actor: ActorId, farm_world: &str, seconds: u32) {
        if seconds == 0 {
            return;
        }
        let until = self.clock.now() + Duration::seconds(i64::from(seconds));
        let mut entries = self.entries.write().await;
        entries.insert((actor, farm_world.to_string()), until);
    }

    /// Remaining cooldown, if any. Expired entries are removed here.
    pub async fn remaining(&self, actor: ActorId, farm_world: &str) -> Option<Duration> {
        let key = (actor, farm_world.to_string());
        let now = self.clock.now();

        let until = {
            let entries = self.entries.read().await;
            entries.get(&key).copied()?
        };

        if until <= now {
            let mut entries = self.entries.write().await;
            entries.remove(&key);
            return None;
        }
        Some(until - now)
    }

    /// Operator reset for a single actor on a single farm world.
    pub async fn clear(&self, actor: ActorId, farm_world: &str) -> bool {
        let mut entries = self.entries.write().await;
        entries.remove(&(actor, farm_world.to_string())).is_some()
    }

    /// Drop every cooldown recorded for a farm world.
    pub async fn clear_farm_world(&self, farm_world: &str) {
        let mut entries = self.entries.write().await;
        entries.retain(|(_, world), _| world != farm_world);
    }
}
