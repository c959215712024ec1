//! # FarmWrld Domain
//!
//! Vocabulary types for farm worlds: definitions, runtime state, positions,
//! and the pooled-location cache. Pure data and timing rules with no IO; the
//! engine crate supplies persistence, scheduling, and the world host.

pub mod cache;
pub mod error;
pub mod farm_world;
pub mod ids;
pub mod location;

pub use cache::LocationCache;
pub use error::DomainError;
pub use farm_world::{minute_floor, FarmWorldDefinition, FarmWorldState};
pub use ids::{ActorId, LocationId};
pub use location::{Border, Environment, Position, SpawnPoint, WorldLocation};
