//! # geotrack-api
//!
//! HTTP API layer for GeoTrack built on Axum.
//!
//! Provides the REST endpoints, bearer-token verification, middleware
//! (CORS, logging, timeouts), extractors, DTOs, and error mapping.

pub mod app;
pub mod auth;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::ApiError;
pub use state::{AppState, Stores};
