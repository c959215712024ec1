//! FarmWrld Engine - farm world lifecycle, scheduling, and persistence.
//!
//! The engine owns a registry of configured farm worlds and drives their
//! activation, timed rotation, pre-generation, and gated visits against a
//! world host reached through ports.

pub mod app;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod use_cases;


pub use app::{Engine, EnginePorts};
pub use config::EngineConfig;
