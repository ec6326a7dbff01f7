//! Actor roles supplied by the identity provider.

pub mod role;

pub use role::UserRole;
