//! Use cases - farm world orchestration.
//!
//! Each module covers one concern of the lifecycle. Use cases orchestrate
//! across the entities and the ports to fulfill the operator- and
//! actor-facing flows.

pub mod cooldown;
pub mod countdown;
pub mod lifecycle;
pub mod locations;
pub mod scheduler;
pub mod visit;

// Re-export main types
pub use cooldown::CooldownGate;
pub use countdown::{
    CancelReason, CountdownError, CountdownGate, CountdownOutcome, CountdownSettings,
};
pub use lifecycle::{FarmWorldLifecycle, LifecycleError};
pub use locations::LocationPool;
pub use scheduler::{Scheduler, TickRoster};
pub use visit::{RandomTeleport, VisitError};
