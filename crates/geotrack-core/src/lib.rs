//! # geotrack-core
//!
//! Core crate for GeoTrack. Contains configuration schemas, geodetic
//! point validation and distance math, pagination types, domain events,
//! the notifier trait, and the unified error system.
//!
//! This crate has **no** internal dependencies on other GeoTrack crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
