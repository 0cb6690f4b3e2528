//! Server binary for the Bermudia game economy.
//!
//! Wires configuration, content, the record store, the notification hub,
//! the correction job and the player API together, then serves until
//! `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `bermudia-config.yaml`
//! 3. Load the content catalog
//! 4. Connect to `PostgreSQL` and run migrations, or fall back to the
//!    in-memory store when no database URL is configured
//! 5. Start the correction job
//! 6. Serve the player API until shutdown
//! 7. Stop the correction job and close the pool

mod error;

use std::path::Path;
use std::sync::Arc;

use bermudia_api::AppState;
use bermudia_core::{AppConfig, Catalog, CorrectionJob, GameService, Hub, ServiceSettings};
use bermudia_db::{GameStore, MemoryStore, PgStore};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Path of the configuration file, relative to the working directory.
const CONFIG_PATH: &str = "bermudia-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    init_tracing();
    info!("bermudia-server starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        host = config.server.host,
        port = config.server.port,
        dev_mode = config.dev_mode,
        auto_correct = config.grading.auto_correct,
        deadline_ms = config.store.deadline_ms,
        "Configuration loaded"
    );

    if config.grader_routes_open() {
        if config.dev_mode {
            warn!("No grader token configured, grader routes are open");
        } else {
            warn!(
                "No grader token configured outside dev mode, anyone can grade answers and \
                 pause the game; set BERMUDIA_GRADER_TOKEN"
            );
        }
    }

    // 3. Load content.
    let catalog = Catalog::from_file(&config.content_path).map_err(ServerError::from)?;
    info!(content = %config.content_path.display(), "Content catalog loaded");

    // 4. Pick a store and run.
    match config.database.url.clone() {
        Some(url) => {
            let store = PgStore::connect(&url, config.database.max_connections)
                .await
                .map_err(ServerError::from)?;
            store.migrate().await.map_err(ServerError::from)?;
            info!("PostgreSQL connected and migrated");
            let result = run(store.clone(), catalog, &config).await;
            store.close().await;
            result?;
        }
        None => {
            warn!("No database URL configured, using the in-memory store");
            run(MemoryStore::new(), catalog, &config).await?;
        }
    }

    info!("bermudia-server shutdown complete");
    Ok(())
}

/// Initialize the tracing subscriber. `LOG_FORMAT=json` switches to JSON
/// lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");
    if json {
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

/// Load configuration from `bermudia-config.yaml`, or defaults with
/// environment overrides when the file is absent.
fn load_config() -> Result<AppConfig, ServerError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(AppConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        let mut config = AppConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Serve until `Ctrl-C`, running the correction job alongside.
async fn run<S: GameStore>(
    store: S,
    catalog: Catalog,
    config: &AppConfig,
) -> Result<(), ServerError> {
    let hub = Arc::new(Hub::new(config.hub.send_timeout()));
    let service = GameService::new(
        Arc::new(store),
        Arc::new(catalog),
        hub,
        ServiceSettings::from_config(config),
    );

    // 5. Start the correction job.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let job = CorrectionJob::from_config(service.clone(), config);
    let job_handle = tokio::spawn(job.run(shutdown_rx));

    // 6. Serve.
    let state = Arc::new(
        AppState::new(service).with_grader_token(config.grader_token().map(str::to_owned)),
    );
    let served = bermudia_api::start_server(
        &config.server.host,
        config.server.port,
        state,
        shutdown_signal(),
    )
    .await;

    // 7. Stop the job; a round in progress finishes first.
    let _ = shutdown_tx.send(true);
    if let Err(e) = job_handle.await {
        warn!(error = %e, "Correction job ended abnormally");
    }

    served.map_err(ServerError::from)
}

/// Resolve when the process receives `Ctrl-C`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
