//! Application builder and server loop.

use std::future::IntoFuture;
use std::time::Duration;

use axum::Router;
use tokio::sync::watch;
use tracing::{info, warn};

use geotrack_core::error::AppError;

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Serve the application until Ctrl+C or SIGTERM.
pub async fn run_server(state: AppState) -> Result<(), AppError> {
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let grace = Duration::from_secs(state.config.server.shutdown_grace_seconds);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    info!(%addr, "GeoTrack server listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    // In-flight requests get `grace` to finish once the signal arrives.
    let deadline = async move {
        if shutdown_rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
        info!(grace_seconds = grace.as_secs(), "Draining connections");
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server.into_future() => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))?;
        }
        _ = deadline => {
            warn!("Shutdown grace period elapsed, dropping remaining connections");
        }
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
