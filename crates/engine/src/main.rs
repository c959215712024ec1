//! FarmWrld Engine - Main entry point.
//!
//! Demo daemon: runs the engine against the simulated world host, with
//! events and display refreshes written to the log.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use farmwrld_engine::app::{Engine, EnginePorts};
use farmwrld_engine::config::EngineConfig;
use farmwrld_engine::infrastructure::clock::{SystemClock, SystemRandom};
use farmwrld_engine::infrastructure::ports::{
    ClockPort, DisplayPort, EventBusError, EventBusPort, FarmWorldEvent, FarmWorldRepo,
    FarmWorldStatus, LocationRepo, RandomPort,
};
use farmwrld_engine::infrastructure::sim::SimWorldHost;
use farmwrld_engine::infrastructure::stores::{MemoryStore, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farmwrld_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FarmWrld Engine");

    // Load configuration; a missing file is written out with defaults.
    let config_path =
        std::env::var("FARMWRLD_CONFIG").unwrap_or_else(|_| "farmwrld.json".into());
    let config = EngineConfig::load_or_init(Path::new(&config_path))?;

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);
    let random: Arc<dyn RandomPort> = Arc::new(SystemRandom);
    let host = Arc::new(SimWorldHost::new(random.clone()));

    let (farm_worlds, locations): (Arc<dyn FarmWorldRepo>, Arc<dyn LocationRepo>) =
        match &config.store_path {
            Some(path) => {
                tracing::info!(path = %path, "Opening sqlite store");
                let store = Arc::new(SqliteStore::new(path, clock.clone()).await?);
                (store.clone(), store)
            }
            None => {
                tracing::info!("No store path configured, state will not survive restarts");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
        };

    let engine = Engine::new(
        config,
        EnginePorts {
            host: host.clone(),
            occupants: host,
            farm_worlds,
            locations,
            events: Arc::new(LogEventBus),
            display: Arc::new(LogDisplay),
            clock,
            random,
        },
    );

    engine.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    engine.shutdown().await;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

/// Event bus of the demo daemon: every lifecycle event goes to the log.
struct LogEventBus;

#[async_trait]
impl EventBusPort for LogEventBus {
    async fn publish(&self, event: FarmWorldEvent) -> Result<(), EventBusError> {
        tracing::info!(
            event = event.event_type(),
            farm_world = %event.farm_world(),
            "Lifecycle event"
        );
        Ok(())
    }
}

/// Display surface of the demo daemon: status snapshots go to the debug log.
struct LogDisplay;

#[async_trait]
impl DisplayPort for LogDisplay {
    async fn refresh(&self, status: &FarmWorldStatus) {
        tracing::debug!(
            farm_world = %status.farm_world,
            active = status.active,
            current = ?status.current_world,
            reset_at = ?status.reset_at,
            "Status refresh"
        );
    }
}
