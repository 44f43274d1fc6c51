//! Replay server binary for the tick replay service.
//!
//! This is the main entry point that wires together the tick log, the
//! replay engine, and the `WebSocket` server. It loads configuration,
//! connects to `PostgreSQL`, and serves the replay stream until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `tickreplay-config.yaml`
//!    (or the path in `TICKREPLAY_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Resolve the replay target (instrument and start time)
//! 4. Connect to `PostgreSQL`
//! 5. Build the replay engine and connection controller
//! 6. Serve the replay stream until shutdown
//! 7. Close the database pool

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use tickreplay_core::config::{LoggingConfig, ServiceConfig};
use tickreplay_core::controller::ReplayController;
use tickreplay_core::engine::{EngineSettings, ReplayEngine};
use tickreplay_db::{PostgresConfig, PostgresPool, TickStore};
use tickreplay_server::{AppState, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file used when `TICKREPLAY_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "tickreplay-config.yaml";

/// Application entry point for the replay server.
///
/// # Errors
///
/// Returns an error if any initialization step or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config_path = config_path();
    let config = ServiceConfig::load_or_default(&config_path).map_err(EngineError::from)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        config = %config_path.display(),
        instrument = config.replay.instrument,
        start_time = config.replay.start_time,
        emission_quantum_ms = config.replay.emission_quantum_ms,
        stream_mode = ?config.replay.stream_mode,
        "tickreplay-engine starting"
    );

    // 3. Resolve the replay target.
    let instrument = config.replay.instrument().map_err(EngineError::from)?;
    let start_time = config.replay.start_time().map_err(EngineError::from)?;

    // 4. Connect to PostgreSQL.
    let pg_config = PostgresConfig::from_infrastructure(&config.infrastructure);
    let pg = PostgresPool::connect(&pg_config)
        .await
        .map_err(EngineError::from)?;
    let store = TickStore::new(pg.pool().clone())
        .with_max_window_records(config.replay.max_window_records);

    // 5. Build the engine and controller.
    let settings = EngineSettings::from_config(&config.replay);
    let engine = Arc::new(ReplayEngine::new(Arc::new(store), settings));
    let controller = ReplayController::new(engine, instrument, start_time);
    let state = Arc::new(AppState::new(
        controller,
        &config.infrastructure.websocket_path,
    ));
    info!(
        prefetch_range_seconds = settings.prefetch_range_seconds,
        prefetch_grace_seconds = settings.prefetch_grace_seconds,
        initial_window_seconds = settings.initial_window_seconds,
        "Replay engine ready"
    );

    // 6. Serve until shutdown.
    let server_config = ServerConfig {
        host: config.infrastructure.host.clone(),
        port: config.infrastructure.port,
    };
    let served = tickreplay_server::start_server(&server_config, state).await;

    // 7. Clean up.
    pg.close().await;
    served.map_err(EngineError::from)?;
    info!("tickreplay-engine stopped");
    Ok(())
}

/// Resolve the configuration file path.
fn config_path() -> PathBuf {
    std::env::var_os("TICKREPLAY_CONFIG").map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
