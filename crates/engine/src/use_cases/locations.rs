//! Location pool - FIFO stock of safe teleport targets per farm world.

use std::sync::Arc;

use farmwrld_domain::{LocationId, WorldLocation};

use crate::entities::FarmWorld;
use crate::infrastructure::ports::{LocationRecord, LocationRepo, StoreError, WorldHostPort};
use crate::use_cases::visit::VisitError;

/// Maintains the per-world FIFO pools, their persistence mirror, and the
/// replenishment watermark.
#[derive(Clone)]
pub struct LocationPool {
    host: Arc<dyn WorldHostPort>,
    locations: Arc<dyn LocationRepo>,
    watermark: usize,
}

impl LocationPool {
    pub fn new(host: Arc<dyn WorldHostPort>, locations: Arc<dyn LocationRepo>, watermark: usize) -> Self {
        Self {
            host,
            locations,
            watermark,
        }
    }

    pub fn watermark(&self) -> usize {
        self.watermark
    }

    /// Pop the oldest pooled location for the world's current instance.
    ///
    /// An empty pool falls back to sampling the host inline so the visit can
    /// still proceed. A take that leaves the pool below the watermark
    /// dispatches exactly one replenishment request; one request per take,
    /// deliberately without deduplication.
    pub async fn take(&self, world: &Arc<FarmWorld>) -> Result<WorldLocation, VisitError> {
        let current = world
            .current_world()
            .await
            .ok_or_else(|| VisitError::NoCurrentWorld(world.name().to_string()))?;

        let popped = {
            let mut pool = world.pool().lock().await;
            pool.pop_front()
        };

        let Some((id, location)) = popped else {
            return self.sample_direct(world, &current).await;
        };

        if let Err(err) = self.locations.delete(id).await {
            tracing::warn!(world = %world.name(), error = %err, "Failed to delete consumed location record");
        }

        if location.world != current {
            // Entry belongs to a previous instance; unusable.
            return self.sample_direct(world, &current).await;
        }

        let below_watermark = { world.pool().lock().await.len() } < self.watermark;
        if below_watermark {
            self.dispatch_replenish(world.clone(), 1);
        }

        Ok(location)
    }

    /// Fill the pool up to the watermark for the current instance.
    pub async fn prime(&self, world: &Arc<FarmWorld>) {
        let missing = {
            let pool = world.pool().lock().await;
            self.watermark.saturating_sub(pool.len())
        };
        if missing > 0 {
            self.dispatch_replenish(world.clone(), missing);
        }
    }

    /// Operator insert at the back of the pool.
    pub async fn add(
        &self,
        world: &Arc<FarmWorld>,
        location: WorldLocation,
    ) -> Result<LocationId, VisitError> {
        let id = LocationId::new();
        {
            let mut pool = world.pool().lock().await;
            pool.insert(id, location.clone());
        }
        self.locations.save(world.name(), id, &location).await?;
        Ok(id)
    }

    pub async fn remove(&self, world: &Arc<FarmWorld>, id: LocationId) -> Result<bool, VisitError> {
        let removed = {
            let mut pool = world.pool().lock().await;
            pool.remove(&id).is_some()
        };
        if removed {
            self.locations.delete(id).await?;
        }
        Ok(removed)
    }

    /// Drop every pooled location and its persistence mirror.
    pub async fn clear(&self, world: &Arc<FarmWorld>) -> Result<(), StoreError> {
        {
            let mut pool = world.pool().lock().await;
            pool.clear();
        }
        self.locations.delete_all_for(world.name()).await
    }

    /// Startup restore from persisted rows; writes nothing back.
    pub async fn restore(&self, world: &Arc<FarmWorld>, records: Vec<LocationRecord>) {
        let mut pool = world.pool().lock().await;
        for record in records {
            pool.insert(record.id, record.location);
        }
    }

    async fn sample_direct(
        &self,
        world: &Arc<FarmWorld>,
        current: &str,
    ) -> Result<WorldLocation, VisitError> {
        let border = world.definition().border;
        match self.host.random_safe_location(current, border).await {
            Ok(position) => Ok(WorldLocation::new(current, position)),
            Err(err) => {
                tracing::warn!(world = %world.name(), error = %err, "Direct location sampling failed");
                Err(VisitError::NoLocationAvailable(world.name().to_string()))
            }
        }
    }

    fn dispatch_replenish(&self, world: Arc<FarmWorld>, count: usize) {
        let host = self.host.clone();
        let locations = self.locations.clone();
        tokio::spawn(async move {
            for _ in 0..count {
                if let Err(err) = Self::generate_into(host.as_ref(), locations.as_ref(), &world).await
                {
                    tracing::warn!(world = %world.name(), error = %err, "Location replenishment failed");
                }
            }
        });
    }

    async fn generate_into(
        host: &dyn WorldHostPort,
        locations: &dyn LocationRepo,
        world: &FarmWorld,
    ) -> Result<(), StoreError> {
        let Some(current) = world.current_world().await else {
            return Ok(());
        };
        let border = world.definition().border;
        let position = match host.random_safe_location(&current, border).await {
            Ok(position) => position,
            Err(err) => {
                tracing::warn!(world = %world.name(), error = %err, "Safe-location sampling failed");
                return Ok(());
            }
        };

        let id = LocationId::new();
        let location = WorldLocation::new(current, position);
        {
            let mut pool = world.pool().lock().await;
            if !pool.insert(id, location.clone()) {
                return Ok(());
            }
        }
        locations.save(world.name(), id, &location).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::{MockLocationRepo, ProvisionError};
    use async_trait::async_trait;
    use farmwrld_domain::{Border, FarmWorldDefinition, FarmWorldState, Position};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Host fake that counts safe-location requests.
    struct CountingHost {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingHost {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WorldHostPort for CountingHost {
        async fn create_instance(
            &self,
            _definition: &FarmWorldDefinition,
            _template: Option<String>,
        ) -> Result<String, ProvisionError> {
            unimplemented!()
        }

        async fn load_instance(
            &self,
            _name: &str,
            _definition: &FarmWorldDefinition,
        ) -> Result<(), ProvisionError> {
            unimplemented!()
        }

        async fn unload_instance(&self, _name: &str) -> Result<(), ProvisionError> {
            unimplemented!()
        }

        async fn destroy_instance(&self, _name: &str) -> Result<(), ProvisionError> {
            unimplemented!()
        }

        async fn random_safe_location(
            &self,
            world: &str,
            _border: Option<Border>,
        ) -> Result<Position, ProvisionError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProvisionError::no_safe_location(world, "unlucky"));
            }
            Ok(Position::new(n as f64, 64.0, 0.0))
        }
    }

    fn active_world(current: &str) -> Arc<FarmWorld> {
        let state = FarmWorldState {
            active: true,
            current_world_name: Some(current.into()),
            ..FarmWorldState::default()
        };
        Arc::new(FarmWorld::from_parts(
            FarmWorldDefinition::new("farm", 10),
            state,
            None,
        ))
    }

    async fn preload(world: &Arc<FarmWorld>, current: &str, count: usize) -> Vec<LocationId> {
        let mut pool = world.pool().lock().await;
        (0..count)
            .map(|i| {
                let id = LocationId::new();
                pool.insert(id, WorldLocation::new(current, Position::new(i as f64, 64.0, 0.0)));
                id
            })
            .collect()
    }

    fn relaxed_repo() -> MockLocationRepo {
        let mut repo = MockLocationRepo::new();
        repo.expect_delete().returning(|_| Ok(()));
        repo.expect_save().returning(|_, _, _| Ok(()));
        repo
    }

    #[tokio::test]
    async fn takes_below_watermark_dispatch_one_request_each() {
        let host = Arc::new(CountingHost::new());
        let pool = LocationPool::new(host.clone(), Arc::new(relaxed_repo()), 5);
        let world = active_world("farm_a1");
        preload(&world, "farm_a1", 8).await;

        for _ in 0..10 {
            pool.take(&world).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        // 10 takes from 8 stocked with watermark 5: the first three stay at
        // or above the watermark, every later take requests exactly one.
        assert_eq!(host.calls(), 7);
    }

    #[tokio::test]
    async fn take_pops_oldest_and_deletes_its_record() {
        let host = Arc::new(CountingHost::new());
        let world = active_world("farm_a1");
        let ids = preload(&world, "farm_a1", 6).await;
        let first = ids[0];

        let mut repo = MockLocationRepo::new();
        repo.expect_delete()
            .withf(move |id| *id == first)
            .times(1)
            .returning(|_| Ok(()));

        let pool = LocationPool::new(host.clone(), Arc::new(repo), 5);
        let taken = pool.take(&world).await.unwrap();
        assert_eq!(taken.position.x, 0.0);
        assert_eq!(host.calls(), 0);
    }

    #[tokio::test]
    async fn empty_pool_samples_host_directly() {
        let host = Arc::new(CountingHost::new());
        let pool = LocationPool::new(host.clone(), Arc::new(relaxed_repo()), 5);
        let world = active_world("farm_a1");

        let taken = pool.take(&world).await.unwrap();
        assert_eq!(taken.world, "farm_a1");
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Direct sampling only; the empty-pool path does not replenish.
        assert_eq!(host.calls(), 1);
    }

    #[tokio::test]
    async fn empty_pool_and_failing_host_is_no_location_available() {
        let host = Arc::new(CountingHost::failing());
        let pool = LocationPool::new(host, Arc::new(relaxed_repo()), 5);
        let world = active_world("farm_a1");

        let err = pool.take(&world).await.unwrap_err();
        assert!(matches!(err, VisitError::NoLocationAvailable(_)));
    }

    #[tokio::test]
    async fn take_without_current_world_fails() {
        let host = Arc::new(CountingHost::new());
        let pool = LocationPool::new(host, Arc::new(relaxed_repo()), 5);
        let world = Arc::new(FarmWorld::new(FarmWorldDefinition::new("farm", 10)));

        let err = pool.take(&world).await.unwrap_err();
        assert!(matches!(err, VisitError::NoCurrentWorld(_)));
    }

    #[tokio::test]
    async fn entry_from_previous_instance_is_discarded() {
        let host = Arc::new(CountingHost::new());
        let pool = LocationPool::new(host.clone(), Arc::new(relaxed_repo()), 5);
        let world = active_world("farm_a2");
        preload(&world, "farm_a1", 1).await;

        let taken = pool.take(&world).await.unwrap();
        assert_eq!(taken.world, "farm_a2");
        assert_eq!(host.calls(), 1);
    }

    #[tokio::test]
    async fn prime_fills_up_to_the_watermark() {
        let host = Arc::new(CountingHost::new());
        let pool = LocationPool::new(host.clone(), Arc::new(relaxed_repo()), 5);
        let world = active_world("farm_a1");

        pool.prime(&world).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(host.calls(), 5);
        assert_eq!(world.pool().lock().await.len(), 5);
    }

    #[tokio::test]
    async fn restore_keeps_persisted_order() {
        let host = Arc::new(CountingHost::new());
        let pool = LocationPool::new(host, Arc::new(relaxed_repo()), 5);
        let world = active_world("farm_a1");

        let records: Vec<LocationRecord> = (0..3)
            .map(|i| LocationRecord {
                id: LocationId::new(),
                farm_world: "farm".into(),
                location: WorldLocation::new("farm_a1", Position::new(i as f64, 64.0, 0.0)),
            })
            .collect();
        let expected: Vec<LocationId> = records.iter().map(|r| r.id).collect();

        pool.restore(&world, records).await;

        let guard = world.pool().lock().await;
        let seen: Vec<LocationId> = guard.ids().copied().collect();
        assert_eq!(seen, expected);
    }
}
