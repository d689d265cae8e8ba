//! Engine binary for the city simulation.
//!
//! Wires configuration, the store, the starting city, and the tick loop
//! together, then runs until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `citysim-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Open the configured store: resume or found a city in `PostgreSQL`,
//!    or found one in memory
//! 4. Seed the starting grid for a newly founded city
//! 5. Build the engine and attach the event logger
//! 6. Start the tick loop and wait for Ctrl-C
//! 7. Stop the loop and log the final state

mod error;

use std::path::Path;
use std::sync::Arc;

use citysim_core::SimulationEngine;
use citysim_core::config::{LoggingConfig, SimulationConfig, StoreKind};
use citysim_core::starting_city::seed_starting_city;
use citysim_db::{CityStore, InMemoryStore, PgStore, connect_pool};
use citysim_types::{City, EngineEvent};
use rust_decimal::Decimal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "citysim-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, from_file) = load_config()?;
    init_logging(&config.logging);

    info!(
        from_file,
        city = config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        store = ?config.infrastructure.store,
        "citysim-engine starting"
    );

    match config.infrastructure.store {
        StoreKind::Memory => {
            let store = InMemoryStore::new(founded_city(&config));
            seed_starting_city(&store, config.world.grid_radius).await?;
            run(Arc::new(store), &config).await?;
        }
        StoreKind::Postgres => {
            let store = open_postgres(&config).await?;
            run(Arc::new(store), &config).await?;
        }
    }

    info!("citysim-engine shutdown complete");
    Ok(())
}

/// Load `citysim-config.yaml`, falling back to defaults when it is missing.
///
/// The flag reports whether the file was found.
fn load_config() -> Result<(SimulationConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((SimulationConfig::from_file(config_path)?, true))
    } else {
        Ok((SimulationConfig::default(), false))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn founded_city(config: &SimulationConfig) -> City {
    City::founded(
        &config.world.name,
        Decimal::from(config.world.starting_treasury),
    )
}

/// Resume the most recent city with the configured name, or found and seed
/// a new one.
async fn open_postgres(config: &SimulationConfig) -> Result<PgStore, EngineError> {
    let infra = &config.infrastructure;
    let pool = connect_pool(&infra.postgres_url, infra.max_connections).await?;
    let (store, created) = PgStore::open_city(pool, &founded_city(config)).await?;
    if created {
        seed_starting_city(&store, config.world.grid_radius).await?;
    }
    Ok(store)
}

/// Run the engine over `store` until Ctrl-C.
async fn run<S: CityStore>(store: Arc<S>, config: &SimulationConfig) -> Result<(), EngineError> {
    let engine = SimulationEngine::new(store, config).await?;

    let mut events = engine.subscribe();
    let logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    engine.start().await;
    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    engine.stop().await;

    let state = engine.state().await?;
    info!(
        tick = state.tick,
        day = state.time.day,
        year = state.time.year,
        population = state.population.total,
        employed = state.population.employed,
        buildings = state.buildings,
        open_crimes = state.open_crimes,
        treasury = %state.city.treasury,
        "final city state"
    );
    logger.abort();
    Ok(())
}

fn log_event(event: &EngineEvent) {
    match event {
        EngineEvent::Tick(tick) => {
            debug!(tick = tick.tick, hour = tick.time.hour, day = tick.time.day, "tick");
            for domain in &tick.events {
                match serde_json::to_string(domain) {
                    Ok(details) => info!(tick = tick.tick, event = domain.name(), %details),
                    Err(e) => warn!(event = domain.name(), error = %e, "unserializable event"),
                }
            }
        }
        other => info!(event = other.name(), "engine event"),
    }
}
