// Port traits define the full contract - many methods are for future use
#![allow(dead_code)]

//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete
//! types. Ports exist for:
//! - The world host (instances could live in a remote game server)
//! - Persistence (could swap SQLite -> Postgres)
//! - Notifications and displays (presentation lives outside the engine)
//! - Clock/Random (for testing)

mod error;
mod events;
mod hosts;
mod repos;
mod testing;

pub use error::*;
pub use events::*;
pub use hosts::*;
pub use repos::*;
pub use testing::*;
