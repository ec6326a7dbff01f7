//! Core type definitions used across the GeoTrack workspace.

pub mod geo;
pub mod pagination;

pub use geo::{EARTH_RADIUS_METERS, GeoPoint, round_meters};
pub use pagination::{PageRequest, PageResponse};
