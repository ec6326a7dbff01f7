//! GeoTrack Server: device lifecycle and location tracking engine.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use geotrack_api::{AppState, Stores};
use geotrack_core::config::{AppConfig, StoreProvider};
use geotrack_core::error::AppError;
use geotrack_database::repositories::{DeviceRepository, LocationRepository, RequestRepository};
use geotrack_database::{DatabasePool, MemoryStore};
use geotrack_service::LogNotifier;

#[tokio::main]
async fn main() {
    let env = std::env::var("GEOTRACK_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(%env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting GeoTrack v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Stores ───────────────────────────────────────────
    let stores = build_stores(&config).await?;

    // ── Step 2: Services and state ───────────────────────────────
    let state = AppState::new(config, stores, Arc::new(LogNotifier))?;
    tracing::info!("Services initialized");

    // ── Step 3: Serve ────────────────────────────────────────────
    geotrack_api::run_server(state).await
}

/// Build the store seams for the configured provider.
async fn build_stores(config: &AppConfig) -> Result<Stores, AppError> {
    match config.database.provider {
        StoreProvider::Postgres => {
            tracing::info!("Connecting to database...");
            let db = DatabasePool::connect(&config.database).await?;

            tracing::info!("Running database migrations...");
            geotrack_database::migration::run_migrations(db.pool())
                .await?;
            tracing::info!("Database migrations complete");

            Ok(Stores {
                devices: Arc::new(DeviceRepository::new(db.pool().clone())),
                requests: Arc::new(RequestRepository::new(db.pool().clone())),
                locations: Arc::new(LocationRepository::new(db.pool().clone())),
            })
        }
        StoreProvider::Memory => {
            tracing::warn!("Using the in-memory store; data will not survive a restart");
            let store = Arc::new(MemoryStore::new());
            Ok(Stores {
                devices: store.clone(),
                requests: store.clone(),
                locations: store,
            })
        }
    }
}
