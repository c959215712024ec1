//! Entity modules - Farm world state encapsulation.
//!
//! Entities hold the guarded runtime state; use cases orchestrate them
//! through the infrastructure ports.

pub mod farm_world;
pub mod registry;

pub use farm_world::FarmWorld;
pub use registry::FarmWorldRegistry;
