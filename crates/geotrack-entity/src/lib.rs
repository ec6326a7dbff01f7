//! # geotrack-entity
//!
//! Domain entity models for GeoTrack. Every struct in this crate
//! represents a database table row or a domain value object. All entities
//! derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.
//!
//! Status fields are closed enumerations; the transition rules and the
//! history sequencing rules live next to the types as pure functions so
//! every store applies them identically.

pub mod device;
pub mod location;
pub mod request;
pub mod user;
