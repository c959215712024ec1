//! Reset scheduler.
//!
//! Two cadences share one update body. The per-second tick covers worlds on
//! the roster, giving fresh activations second-level timing and pushing
//! display refreshes. The coarse sweep walks every registered world and
//! catches whatever the roster no longer tracks; it never mutates the
//! roster. A world leaves the roster when it goes inactive, when its name no
//! longer resolves, or after a successful rotation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::entities::{FarmWorld, FarmWorldRegistry};
use crate::infrastructure::ports::{ClockPort, DisplayPort};
use crate::use_cases::lifecycle::FarmWorldLifecycle;

/// Names of the farm worlds receiving per-second attention.
#[derive(Default)]
pub struct TickRoster {
    names: RwLock<HashSet<String>>,
}

impl TickRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, name: &str) {
        let mut names = self.names.write().await;
        names.insert(name.to_string());
    }

    pub async fn deregister(&self, name: &str) {
        let mut names = self.names.write().await;
        names.remove(name);
    }

    pub async fn contains(&self, name: &str) -> bool {
        let names = self.names.read().await;
        names.contains(name)
    }

    pub async fn snapshot(&self) -> Vec<String> {
        let names = self.names.read().await;
        names.iter().cloned().collect()
    }
}

/// Drives due rotations and pregenerations off the clock.
#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<FarmWorldRegistry>,
    roster: Arc<TickRoster>,
    lifecycle: Arc<FarmWorldLifecycle>,
    display: Arc<dyn DisplayPort>,
    clock: Arc<dyn ClockPort>,
    sweep_every_secs: u64,
}

impl Scheduler {
    pub fn new(
        registry: Arc<FarmWorldRegistry>,
        roster: Arc<TickRoster>,
        lifecycle: Arc<FarmWorldLifecycle>,
        display: Arc<dyn DisplayPort>,
        clock: Arc<dyn ClockPort>,
        sweep_every_secs: u64,
    ) -> Self {
        Self {
            registry,
            roster,
            lifecycle,
            display,
            clock,
            sweep_every_secs,
        }
    }

    /// Per-second pass over the rostered worlds.
    pub async fn tick(&self) {
        let now = self.clock.now();
        for name in self.roster.snapshot().await {
            let Some(world) = self.registry.get(&name) else {
                self.roster.deregister(&name).await;
                continue;
            };
            self.update(&world, true, now).await;
        }
    }

    /// Coarse pass over every registered world.
    pub async fn sweep(&self) {
        let now = self.clock.now();
        for world in self.registry.all() {
            self.update(&world, false, now).await;
        }
    }

    async fn update(&self, world: &Arc<FarmWorld>, every_second: bool, now: DateTime<Utc>) {
        let (active, reset_due, pregeneration_due) = {
            let state = world.state().lock().await;
            let timer = world.definition().timer;
            (
                state.active,
                state.is_reset_due(timer, now),
                state.is_pregeneration_due(timer, now),
            )
        };

        if !active {
            if every_second {
                self.roster.deregister(world.name()).await;
            }
            return;
        }

        if reset_due {
            match self.lifecycle.rotate(world.name(), None).await {
                Ok(_) => {
                    if every_second {
                        self.roster.deregister(world.name()).await;
                    }
                }
                Err(err) => {
                    tracing::error!(farm_world = %world.name(), error = %err, "Rotation failed; will retry");
                }
            }
        } else if pregeneration_due {
            if let Err(err) = self.lifecycle.pre_generate_next(world.name()).await {
                tracing::warn!(farm_world = %world.name(), error = %err, "Pregeneration request failed");
            }
        }

        self.display.refresh(&world.status().await).await;
    }

    /// Worker loop: tick every second, sweep every `sweep_every_secs`.
    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut seconds: u64 = 0;
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                seconds = seconds.wrapping_add(1);
                scheduler.tick().await;
                if scheduler.sweep_every_secs > 0 && seconds % scheduler.sweep_every_secs == 0 {
                    scheduler.sweep().await;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{ManualClock, SystemRandom};
    use crate::infrastructure::ports::{
        FarmWorldRepo, FarmWorldStatus, LocationRepo, MockEventBusPort, MockFarmWorldRepo,
        RandomPort, StoreError,
    };
    use crate::infrastructure::sim::SimWorldHost;
    use crate::infrastructure::stores::MemoryStore;
    use crate::use_cases::locations::LocationPool;
    use async_trait::async_trait;
    use farmwrld_domain::{FarmWorldDefinition, FarmWorldState};
    use std::sync::Mutex;

    fn t0() -> DateTime<Utc> {
        "2024-05-01T10:00:00Z".parse().unwrap()
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    struct RecordingDisplay {
        statuses: Mutex<Vec<FarmWorldStatus>>,
    }

    impl RecordingDisplay {
        fn new() -> Self {
            Self {
                statuses: Mutex::new(Vec::new()),
            }
        }

        fn statuses(&self) -> Vec<FarmWorldStatus> {
            self.statuses.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DisplayPort for RecordingDisplay {
        async fn refresh(&self, status: &FarmWorldStatus) {
            self.statuses.lock().unwrap().push(status.clone());
        }
    }

    struct Harness {
        scheduler: Scheduler,
        registry: Arc<FarmWorldRegistry>,
        roster: Arc<TickRoster>,
        clock: Arc<ManualClock>,
        host: Arc<SimWorldHost>,
        display: Arc<RecordingDisplay>,
    }

    fn harness_with_repo(farm_worlds: Arc<dyn FarmWorldRepo>) -> Harness {
        let registry = Arc::new(FarmWorldRegistry::new());
        let roster = Arc::new(TickRoster::new());
        let clock = Arc::new(ManualClock::starting_at(t0()));
        let random: Arc<dyn RandomPort> = Arc::new(SystemRandom);
        let host = Arc::new(SimWorldHost::new(random.clone()));
        let locations: Arc<dyn LocationRepo> = Arc::new(MemoryStore::new());
        let pool = Arc::new(LocationPool::new(host.clone(), locations, 5));
        let mut events = MockEventBusPort::new();
        events.expect_publish().returning(|_| Ok(()));
        let lifecycle = Arc::new(FarmWorldLifecycle::new(
            registry.clone(),
            roster.clone(),
            pool,
            host.clone(),
            host.clone(),
            farm_worlds,
            Arc::new(events),
            clock.clone(),
            random,
        ));
        let display = Arc::new(RecordingDisplay::new());
        let scheduler = Scheduler::new(
            registry.clone(),
            roster.clone(),
            lifecycle,
            display.clone(),
            clock.clone(),
            60,
        );
        Harness {
            scheduler,
            registry,
            roster,
            clock,
            host,
            display,
        }
    }

    fn harness() -> Harness {
        harness_with_repo(Arc::new(MemoryStore::new()))
    }

    async fn seed_world(
        h: &Harness,
        active: bool,
        current: Option<&str>,
        next: Option<&str>,
        created: Option<DateTime<Utc>>,
    ) -> Arc<FarmWorld> {
        let definition = FarmWorldDefinition::new("farm", 10);
        for instance in current.iter().chain(next.iter()) {
            h.host.load_instance(instance, &definition).await.unwrap();
        }
        let state = FarmWorldState {
            active,
            current_world_name: current.map(Into::into),
            next_world_name: next.map(Into::into),
            created_at: created,
            ..FarmWorldState::default()
        };
        let world = Arc::new(FarmWorld::from_parts(definition, state, None));
        h.registry.insert(world.clone());
        world
    }

    #[tokio::test]
    async fn roster_tracks_registrations() {
        let roster = TickRoster::new();
        roster.register("farm").await;
        roster.register("farm").await;
        assert!(roster.contains("farm").await);
        assert_eq!(roster.snapshot().await, vec!["farm".to_string()]);

        roster.deregister("farm").await;
        assert!(!roster.contains("farm").await);
    }

    #[tokio::test]
    async fn due_world_rotates_and_leaves_the_roster() {
        let h = harness();
        let world = seed_world(
            &h,
            true,
            Some("farm_a1"),
            Some("farm_a2"),
            Some(t0() - chrono::Duration::minutes(10)),
        )
        .await;
        h.roster.register("farm").await;

        h.scheduler.tick().await;
        settle().await;

        let snapshot = world.snapshot().await;
        assert_eq!(snapshot.current_world_name.as_deref(), Some("farm_a2"));
        assert_eq!(snapshot.next_world_name, None);
        assert!(!h.roster.contains("farm").await);
        assert!(!h.host.world_exists("farm_a1"));
    }

    #[tokio::test]
    async fn pregeneration_starts_exactly_at_the_lead_minute() {
        let h = harness();
        let world = seed_world(&h, true, Some("farm_a1"), None, Some(t0())).await;
        h.roster.register("farm").await;

        h.clock
            .set(t0() + chrono::Duration::minutes(8) + chrono::Duration::seconds(59));
        h.scheduler.tick().await;
        settle().await;
        assert_eq!(world.snapshot().await.next_world_name, None);

        h.clock.set(t0() + chrono::Duration::minutes(9));
        h.scheduler.tick().await;
        settle().await;

        let snapshot = world.snapshot().await;
        assert!(snapshot
            .next_world_name
            .as_deref()
            .is_some_and(|next| next.starts_with("farm_")));
        assert_eq!(snapshot.current_world_name.as_deref(), Some("farm_a1"));
        assert!(h.roster.contains("farm").await);
    }

    #[tokio::test]
    async fn reset_fires_exactly_at_the_timer() {
        let h = harness();
        let world = seed_world(&h, true, Some("farm_a1"), Some("farm_a2"), Some(t0())).await;
        h.roster.register("farm").await;

        h.clock
            .set(t0() + chrono::Duration::minutes(9) + chrono::Duration::seconds(59));
        h.scheduler.tick().await;
        assert_eq!(
            world.snapshot().await.current_world_name.as_deref(),
            Some("farm_a1")
        );

        h.clock.set(t0() + chrono::Duration::minutes(10));
        h.scheduler.tick().await;
        assert_eq!(
            world.snapshot().await.current_world_name.as_deref(),
            Some("farm_a2")
        );
    }

    #[tokio::test]
    async fn inactive_worlds_are_deregistered() {
        let h = harness();
        seed_world(&h, false, Some("farm_a1"), None, Some(t0())).await;
        h.roster.register("farm").await;

        h.scheduler.tick().await;
        assert!(!h.roster.contains("farm").await);
    }

    #[tokio::test]
    async fn unknown_names_are_dropped_from_the_roster() {
        let h = harness();
        h.roster.register("ghost").await;

        h.scheduler.tick().await;
        assert!(!h.roster.contains("ghost").await);
    }

    #[tokio::test]
    async fn sweep_rotates_worlds_the_roster_no_longer_tracks() {
        let h = harness();
        let world = seed_world(
            &h,
            true,
            Some("farm_a1"),
            Some("farm_a2"),
            Some(t0() - chrono::Duration::minutes(10)),
        )
        .await;

        h.scheduler.sweep().await;
        settle().await;

        assert_eq!(
            world.snapshot().await.current_world_name.as_deref(),
            Some("farm_a2")
        );
        assert!(!h.roster.contains("farm").await);
    }

    #[tokio::test]
    async fn failed_rotation_keeps_the_world_registered() {
        let mut farm_worlds = MockFarmWorldRepo::new();
        farm_worlds
            .expect_save()
            .returning(|_, _| Err(StoreError::database("save", "disk full")));
        let h = harness_with_repo(Arc::new(farm_worlds));
        seed_world(
            &h,
            true,
            Some("farm_a1"),
            Some("farm_a2"),
            Some(t0() - chrono::Duration::minutes(10)),
        )
        .await;
        h.roster.register("farm").await;

        h.scheduler.tick().await;
        settle().await;

        assert!(h.roster.contains("farm").await);
    }

    #[tokio::test]
    async fn display_receives_a_status_each_tick() {
        let h = harness();
        seed_world(&h, true, Some("farm_a1"), None, Some(t0())).await;
        h.roster.register("farm").await;

        h.scheduler.tick().await;
        h.scheduler.tick().await;

        let statuses = h.display.statuses();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].farm_world, "farm");
        assert!(statuses[0].active);
        assert_eq!(statuses[0].current_world.as_deref(), Some("farm_a1"));
        assert_eq!(
            statuses[0].reset_at,
            Some(t0() + chrono::Duration::minutes(10))
        );
    }
}
