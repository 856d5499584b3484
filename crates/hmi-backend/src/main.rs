//! HMI telemetry backend binary.
//!
//! This is the main entry point that wires together the entity store,
//! the state coordinator, the broadcast hub, the persistence writer, and
//! the HTTP server. It loads configuration, initializes all subsystems,
//! and serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `hmi-config.yaml` (or `HMI_CONFIG`) plus
//!    environment overrides
//! 2. Initialize structured logging (tracing)
//! 3. Open `SQLite` and create, evolve, and seed the schema
//! 4. Load the initial snapshot from the store
//! 5. Spawn the persistence writer
//! 6. Create the broadcast hub
//! 7. Create the state coordinator with both as listeners
//! 8. Serve HTTP until `Ctrl-C`
//! 9. Drain the persistence queue and close the store

mod error;

use std::sync::Arc;
use std::time::Duration;

use hmi_core::config::{ConfigError, HmiConfig, LoggingConfig};
use hmi_core::coordinator::{CommitListener, CoordinatorConfig, StateCoordinator};
use hmi_db::{PersistenceWriter, PlantStore, SqliteConfig, SqliteStore};
use hmi_server::{AppState, BroadcastHub};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::BackendError;

/// How long shutdown waits for queued writes to reach the store.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step fails or the server
/// cannot bind.
#[tokio::main]
async fn main() -> Result<(), BackendError> {
    let config = HmiConfig::load();

    // Logging comes up even when the config is broken, so the failure
    // itself is logged.
    let logging = config
        .as_ref()
        .map_or_else(|_| LoggingConfig::default(), |c| c.logging.clone());
    init_tracing(&logging)?;

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = &result {
        tracing::error!(error = %e, "hmi-backend failed");
    }
    result
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(config: &LoggingConfig) -> Result<(), BackendError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| BackendError::Logging {
        message: e.to_string(),
    })
}

async fn run(config: HmiConfig) -> Result<(), BackendError> {
    info!("hmi-backend starting");
    info!(
        host = config.server.host,
        port = config.server.port,
        sqlite_path = config.storage.sqlite_path,
        low_threshold = config.alerts.low_threshold,
        high_threshold = config.alerts.high_threshold,
        require_token = config.auth.require_token,
        "Configuration loaded"
    );
    let thresholds = config.alerts.thresholds().map_err(ConfigError::from)?;

    // Storage. Failure here is fatal: without a snapshot there is nothing
    // to serve.
    let store = SqliteStore::connect(
        &SqliteConfig::new(&config.storage.sqlite_path)
            .with_max_connections(config.storage.max_connections),
    )
    .await?;
    store.init_schema().await?;
    let initial = PlantStore::new(store.pool()).load_state().await?;

    // Listeners, then the coordinator that feeds them.
    let (writer, writer_handle) = PersistenceWriter::spawn(store.clone());
    let hub = BroadcastHub::new(config.broadcast.capacity);
    let listeners: Vec<Arc<dyn CommitListener>> =
        vec![Arc::new(hub.clone()), Arc::new(writer)];
    let coordinator = Arc::new(StateCoordinator::new(
        initial,
        CoordinatorConfig {
            thresholds,
            pump_map: config.plant.pump_map.clone(),
        },
        listeners,
    ));
    info!(
        pump_map = ?config.plant.pump_map,
        "State coordinator ready"
    );

    let state = Arc::new(AppState::new(
        coordinator,
        hub,
        store.clone(),
        config.auth.clone(),
    ));

    let served = hmi_server::start_server(&config.server, state, hmi_server::shutdown_signal()).await;

    // The router and its state are gone once the server returns, which
    // drops the coordinator and with it the last writer handle.
    match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, writer_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Persistence writer task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = WRITER_DRAIN_TIMEOUT.as_secs(),
            "Persistence writer did not drain in time; pending writes dropped"
        ),
    }
    store.close().await;

    served?;
    info!("hmi-backend shutdown complete");
    Ok(())
}
