//! Pre-teleport countdown gate.
//!
//! A visit does not teleport immediately: the actor must hold still for a few
//! seconds first. Each actor has at most one running countdown; the outcome
//! is delivered through a one-shot callback, fired exactly once whether the
//! countdown completes, is cancelled by movement or disconnect, or is
//! aborted explicitly.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;

use farmwrld_domain::{ActorId, WorldLocation};

use crate::infrastructure::ports::OccupantPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Moved,
    ActorLeft,
    Aborted,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::Moved => "moved",
            CancelReason::ActorLeft => "actor_left",
            CancelReason::Aborted => "aborted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownOutcome {
    Completed,
    Cancelled(CancelReason),
}

#[derive(Debug, thiserror::Error)]
pub enum CountdownError {
    #[error("A countdown is already running for this actor")]
    AlreadyRunning,
    #[error("Actor is not connected")]
    Offline,
}

/// Movement tolerance and duration for a countdown.
#[derive(Debug, Clone, Copy)]
pub struct CountdownSettings {
    pub seconds: u32,
    pub permitted_distance: f64,
    pub movement_allowed: bool,
}

impl Default for CountdownSettings {
    fn default() -> Self {
        Self {
            seconds: 5,
            permitted_distance: 0.7,
            movement_allowed: false,
        }
    }
}

pub type DoneCallback = Box<dyn FnOnce(CountdownOutcome) + Send>;

struct CountdownSession {
    remaining: u32,
    settings: CountdownSettings,
    anchor: WorldLocation,
    on_done: Option<DoneCallback>,
}

/// Runs every active countdown off a shared one-second tick.
#[derive(Clone)]
pub struct CountdownGate {
    occupants: Arc<dyn OccupantPort>,
    sessions: Arc<DashMap<ActorId, CountdownSession>>,
}

impl CountdownGate {
    pub fn new(occupants: Arc<dyn OccupantPort>) -> Self {
        Self {
            occupants,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Begin a countdown for an actor, anchored at their current position.
    ///
    /// Zero configured seconds completes inline without recording a session.
    pub async fn start(
        &self,
        actor: ActorId,
        settings: CountdownSettings,
        on_done: DoneCallback,
    ) -> Result<(), CountdownError> {
        if self.sessions.contains_key(&actor) {
            return Err(CountdownError::AlreadyRunning);
        }
        if !self.occupants.is_connected(&actor).await {
            return Err(CountdownError::Offline);
        }
        let Some(anchor) = self.occupants.position_of(&actor).await else {
            return Err(CountdownError::Offline);
        };

        if settings.seconds == 0 {
            on_done(CountdownOutcome::Completed);
            return Ok(());
        }

        let session = CountdownSession {
            remaining: settings.seconds,
            settings,
            anchor,
            on_done: Some(on_done),
        };
        match self.sessions.entry(actor) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(CountdownError::AlreadyRunning),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(())
            }
        }
    }

    pub fn is_running(&self, actor: ActorId) -> bool {
        self.sessions.contains_key(&actor)
    }

    /// Abort an actor's countdown. Returns false when none was running.
    pub fn cancel(&self, actor: ActorId, reason: CancelReason) -> bool {
        self.finish(actor, CountdownOutcome::Cancelled(reason))
    }

    /// Advance every running countdown by one second.
    pub async fn tick_all(&self) {
        let actors: Vec<ActorId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for actor in actors {
            self.tick_one(actor).await;
        }
    }

    async fn tick_one(&self, actor: ActorId) {
        if !self.occupants.is_connected(&actor).await {
            self.finish(actor, CountdownOutcome::Cancelled(CancelReason::ActorLeft));
            return;
        }
        let Some(position) = self.occupants.position_of(&actor).await else {
            self.finish(actor, CountdownOutcome::Cancelled(CancelReason::ActorLeft));
            return;
        };

        // Outcome is decided under the map guard, delivered after it drops.
        let outcome = {
            let Some(mut session) = self.sessions.get_mut(&actor) else {
                return;
            };

            if !session.settings.movement_allowed {
                let changed_world = position.world != session.anchor.world;
                let drift = position.position.distance(&session.anchor.position);
                if changed_world || drift > session.settings.permitted_distance {
                    Some(CountdownOutcome::Cancelled(CancelReason::Moved))
                } else {
                    session.remaining = session.remaining.saturating_sub(1);
                    (session.remaining == 0).then_some(CountdownOutcome::Completed)
                }
            } else {
                session.remaining = session.remaining.saturating_sub(1);
                (session.remaining == 0).then_some(CountdownOutcome::Completed)
            }
        };

        if let Some(outcome) = outcome {
            self.finish(actor, outcome);
        }
    }

    /// One-second worker loop driving `tick_all`.
    pub fn spawn(&self) -> tokio::task::JoinHandle<()> {
        let gate = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                gate.tick_all().await;
            }
        })
    }

    fn finish(&self, actor: ActorId, outcome: CountdownOutcome) -> bool {
        let Some((_, mut session)) = self.sessions.remove(&actor) else {
            return false;
        };
        if let Some(on_done) = session.on_done.take() {
            on_done(outcome);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockOccupantPort;
    use farmwrld_domain::Position;
    use std::sync::Mutex;

    fn settings(seconds: u32) -> CountdownSettings {
        CountdownSettings {
            seconds,
            permitted_distance: 0.7,
            movement_allowed: false,
        }
    }

    fn anchor() -> WorldLocation {
        WorldLocation::new("farm_a1", Position::new(0.0, 64.0, 0.0))
    }

    fn recorder() -> (Arc<Mutex<Vec<CountdownOutcome>>>, DoneCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: DoneCallback = Box::new(move |outcome| sink.lock().unwrap().push(outcome));
        (seen, callback)
    }

    fn steady_occupants(position: WorldLocation) -> MockOccupantPort {
        let mut occupants = MockOccupantPort::new();
        occupants.expect_is_connected().returning(|_| true);
        occupants
            .expect_position_of()
            .returning(move |_| Some(position.clone()));
        occupants
    }

    #[tokio::test]
    async fn completes_after_configured_seconds() {
        let gate = CountdownGate::new(Arc::new(steady_occupants(anchor())));
        let actor = ActorId::new();
        let (seen, callback) = recorder();

        gate.start(actor, settings(3), callback).await.unwrap();
        gate.tick_all().await;
        gate.tick_all().await;
        assert!(seen.lock().unwrap().is_empty());

        gate.tick_all().await;
        assert_eq!(*seen.lock().unwrap(), vec![CountdownOutcome::Completed]);
        assert!(!gate.is_running(actor));
    }

    #[tokio::test]
    async fn zero_seconds_completes_inline() {
        let gate = CountdownGate::new(Arc::new(steady_occupants(anchor())));
        let actor = ActorId::new();
        let (seen, callback) = recorder();

        gate.start(actor, settings(0), callback).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![CountdownOutcome::Completed]);
        assert!(!gate.is_running(actor));
    }

    #[tokio::test]
    async fn second_start_for_same_actor_is_rejected() {
        let gate = CountdownGate::new(Arc::new(steady_occupants(anchor())));
        let actor = ActorId::new();
        let (_seen, callback) = recorder();
        gate.start(actor, settings(5), callback).await.unwrap();

        let (other_seen, other_callback) = recorder();
        let err = gate.start(actor, settings(5), other_callback).await.unwrap_err();
        assert!(matches!(err, CountdownError::AlreadyRunning));
        assert!(other_seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_actor_is_rejected() {
        let mut occupants = MockOccupantPort::new();
        occupants.expect_is_connected().returning(|_| false);
        let gate = CountdownGate::new(Arc::new(occupants));
        let (_seen, callback) = recorder();

        let err = gate.start(ActorId::new(), settings(5), callback).await.unwrap_err();
        assert!(matches!(err, CountdownError::Offline));
    }

    #[tokio::test]
    async fn drift_beyond_permitted_distance_cancels() {
        let mut occupants = MockOccupantPort::new();
        occupants.expect_is_connected().returning(|_| true);
        occupants
            .expect_position_of()
            .times(1)
            .returning(|_| Some(anchor()));
        occupants.expect_position_of().returning(|_| {
            Some(WorldLocation::new("farm_a1", Position::new(1.0, 64.0, 0.0)))
        });

        let gate = CountdownGate::new(Arc::new(occupants));
        let actor = ActorId::new();
        let (seen, callback) = recorder();

        gate.start(actor, settings(5), callback).await.unwrap();
        gate.tick_all().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![CountdownOutcome::Cancelled(CancelReason::Moved)]
        );
        assert!(!gate.is_running(actor));
    }

    #[tokio::test]
    async fn drift_within_permitted_distance_continues() {
        let mut occupants = MockOccupantPort::new();
        occupants.expect_is_connected().returning(|_| true);
        occupants
            .expect_position_of()
            .times(1)
            .returning(|_| Some(anchor()));
        occupants.expect_position_of().returning(|_| {
            Some(WorldLocation::new("farm_a1", Position::new(0.5, 64.0, 0.0)))
        });

        let gate = CountdownGate::new(Arc::new(occupants));
        let actor = ActorId::new();
        let (seen, callback) = recorder();

        gate.start(actor, settings(2), callback).await.unwrap();
        gate.tick_all().await;
        assert!(seen.lock().unwrap().is_empty());

        gate.tick_all().await;
        assert_eq!(*seen.lock().unwrap(), vec![CountdownOutcome::Completed]);
    }

    #[tokio::test]
    async fn world_change_cancels_even_without_drift() {
        let mut occupants = MockOccupantPort::new();
        occupants.expect_is_connected().returning(|_| true);
        occupants
            .expect_position_of()
            .times(1)
            .returning(|_| Some(anchor()));
        occupants
            .expect_position_of()
            .returning(|_| Some(WorldLocation::new("lobby", Position::new(0.0, 64.0, 0.0))));

        let gate = CountdownGate::new(Arc::new(occupants));
        let actor = ActorId::new();
        let (seen, callback) = recorder();

        gate.start(actor, settings(5), callback).await.unwrap();
        gate.tick_all().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![CountdownOutcome::Cancelled(CancelReason::Moved)]
        );
    }

    #[tokio::test]
    async fn movement_allowed_ignores_any_drift() {
        let mut occupants = MockOccupantPort::new();
        occupants.expect_is_connected().returning(|_| true);
        occupants
            .expect_position_of()
            .times(1)
            .returning(|_| Some(anchor()));
        occupants.expect_position_of().returning(|_| {
            Some(WorldLocation::new("farm_a1", Position::new(40.0, 70.0, -12.0)))
        });

        let gate = CountdownGate::new(Arc::new(occupants));
        let actor = ActorId::new();
        let (seen, callback) = recorder();

        let mut relaxed = settings(1);
        relaxed.movement_allowed = true;
        gate.start(actor, relaxed, callback).await.unwrap();
        gate.tick_all().await;

        assert_eq!(*seen.lock().unwrap(), vec![CountdownOutcome::Completed]);
    }

    #[tokio::test]
    async fn disconnect_cancels_with_actor_left() {
        let mut occupants = MockOccupantPort::new();
        occupants.expect_is_connected().times(1).returning(|_| true);
        occupants.expect_is_connected().returning(|_| false);
        occupants
            .expect_position_of()
            .returning(|_| Some(anchor()));

        let gate = CountdownGate::new(Arc::new(occupants));
        let actor = ActorId::new();
        let (seen, callback) = recorder();

        gate.start(actor, settings(5), callback).await.unwrap();
        gate.tick_all().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![CountdownOutcome::Cancelled(CancelReason::ActorLeft)]
        );
    }

    #[tokio::test]
    async fn callback_fires_exactly_once() {
        let gate = CountdownGate::new(Arc::new(steady_occupants(anchor())));
        let actor = ActorId::new();
        let (seen, callback) = recorder();

        gate.start(actor, settings(5), callback).await.unwrap();
        assert!(gate.cancel(actor, CancelReason::Aborted));

        gate.tick_all().await;
        assert!(!gate.cancel(actor, CancelReason::Aborted));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![CountdownOutcome::Cancelled(CancelReason::Aborted)]
        );
    }
}
