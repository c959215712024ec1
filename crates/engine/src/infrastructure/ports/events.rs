// Port traits define the full contract - many methods are for future use
#![allow(dead_code)]

//! Notification and presentation ports.
//!
//! Events are published after lifecycle state changes. They are
//! coarse-grained, serializable, and suitable for fan-out to chat, signs,
//! scoreboards, or cross-process consumers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use farmwrld_domain::ActorId;
use serde::{Deserialize, Serialize};

use super::error::EventBusError;

/// Lifecycle events published through the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FarmWorldEvent {
    /// A farm world was switched on and its instance is ready
    Activated { farm_world: String },

    /// A farm world was switched off
    Deactivated { farm_world: String },

    /// Rotation promoted a new current instance
    WorldChanged {
        farm_world: String,
        old_world: Option<String>,
        new_world: String,
    },

    /// A pre-teleport countdown ended without completing
    CountdownCancelled {
        actor: ActorId,
        farm_world: String,
        reason: String,
    },

    /// A gated visit finished with a successful teleport
    VisitCompleted {
        actor: ActorId,
        farm_world: String,
        world: String,
    },
}

impl FarmWorldEvent {
    /// Get the event type as a string (for logging, storage, filtering)
    pub fn event_type(&self) -> &'static str {
        match self {
            FarmWorldEvent::Activated { .. } => "Activated",
            FarmWorldEvent::Deactivated { .. } => "Deactivated",
            FarmWorldEvent::WorldChanged { .. } => "WorldChanged",
            FarmWorldEvent::CountdownCancelled { .. } => "CountdownCancelled",
            FarmWorldEvent::VisitCompleted { .. } => "VisitCompleted",
        }
    }

    /// Farm world this event belongs to.
    pub fn farm_world(&self) -> &str {
        match self {
            FarmWorldEvent::Activated { farm_world }
            | FarmWorldEvent::Deactivated { farm_world }
            | FarmWorldEvent::WorldChanged { farm_world, .. }
            | FarmWorldEvent::CountdownCancelled { farm_world, .. }
            | FarmWorldEvent::VisitCompleted { farm_world, .. } => farm_world.as_str(),
        }
    }
}

/// Port for publishing lifecycle events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBusPort: Send + Sync {
    /// Publish an event to the bus.
    ///
    /// This is a best-effort operation; failures should be logged but
    /// typically should not break the main application flow.
    async fn publish(&self, event: FarmWorldEvent) -> Result<(), EventBusError>;
}

/// Presentation snapshot pushed to display surfaces once per scheduler pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmWorldStatus {
    pub farm_world: String,
    pub active: bool,
    pub current_world: Option<String>,
    /// Instant the running timer elapses; None while no instance is promoted.
    pub reset_at: Option<DateTime<Utc>>,
}

/// Port for display surfaces (signs, scoreboards) living outside the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DisplayPort: Send + Sync {
    async fn refresh(&self, status: &FarmWorldStatus);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tag_with_variant_name() {
        let event = FarmWorldEvent::WorldChanged {
            farm_world: "farm".into(),
            old_world: Some("farm_a1".into()),
            new_world: "farm_a2".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"WorldChanged""#));
        assert_eq!(event.event_type(), "WorldChanged");
        assert_eq!(event.farm_world(), "farm");
    }

    #[test]
    fn events_round_trip() {
        let event = FarmWorldEvent::Activated {
            farm_world: "nether-farm".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: FarmWorldEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
