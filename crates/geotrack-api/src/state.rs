//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use geotrack_core::config::AppConfig;
use geotrack_core::error::AppError;
use geotrack_core::traits::EventNotifier;
use geotrack_database::{DeviceStore, LocationStore, RequestStore};
use geotrack_service::{
    CredentialService, DeviceService, EventDispatcher, HistoryService, IngestionService,
    RequestService,
};

use crate::auth::TokenDecoder;

/// The three store seams, backed by PostgreSQL or by the in-memory store.
#[derive(Clone)]
pub struct Stores {
    /// Device directory.
    pub devices: Arc<dyn DeviceStore>,
    /// Device requests.
    pub requests: Arc<dyn RequestStore>,
    /// Location records and history.
    pub locations: Arc<dyn LocationStore>,
}

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Process start, for uptime reporting
    pub started_at: Instant,

    // ── Infrastructure ───────────────────────────────────────
    /// Device store, used for health checks
    pub device_store: Arc<dyn DeviceStore>,
    /// Bearer token validator
    pub token_decoder: Arc<TokenDecoder>,

    // ── Services ─────────────────────────────────────────────
    /// Request workflow
    pub request_service: Arc<RequestService>,
    /// Device directory
    pub device_service: Arc<DeviceService>,
    /// QR credentials
    pub credential_service: Arc<CredentialService>,
    /// Location ingestion
    pub ingestion_service: Arc<IngestionService>,
    /// History queries
    pub history_service: Arc<HistoryService>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("token_decoder", &self.token_decoder)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire every service from configuration, stores and a notifier.
    pub fn new(
        config: AppConfig,
        stores: Stores,
        notifier: Arc<dyn EventNotifier>,
    ) -> Result<Self, AppError> {
        let token_decoder = Arc::new(TokenDecoder::new(&config.auth)?);
        let dispatcher = EventDispatcher::new(notifier);

        let request_service = Arc::new(RequestService::new(
            Arc::clone(&stores.requests),
            Arc::clone(&stores.devices),
            dispatcher.clone(),
            config.credential.clone(),
        ));
        let device_service = Arc::new(DeviceService::new(
            Arc::clone(&stores.devices),
            dispatcher.clone(),
            &config.tracking,
        ));
        let credential_service = Arc::new(CredentialService::new(
            Arc::clone(&stores.devices),
            dispatcher,
            config.credential.clone(),
            &config.tracking,
        ));
        let ingestion_service = Arc::new(IngestionService::new(
            Arc::clone(&stores.devices),
            Arc::clone(&stores.locations),
            config.tracking.clone(),
        ));
        let history_service = Arc::new(HistoryService::new(
            Arc::clone(&stores.devices),
            Arc::clone(&stores.locations),
            config.tracking.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            started_at: Instant::now(),
            device_store: stores.devices,
            token_decoder,
            request_service,
            device_service,
            credential_service,
            ingestion_service,
            history_service,
        })
    }
}
