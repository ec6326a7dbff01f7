//! PostgreSQL repository implementations of the store traits.

pub mod device;
pub mod location;
pub mod request;

pub use device::DeviceRepository;
pub use location::LocationRepository;
pub use request::RequestRepository;

use geotrack_core::error::{AppError, ErrorKind};

/// Wrap a sqlx error with context.
pub(crate) fn db_error(context: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| AppError::with_source(ErrorKind::Database, format!("{context}: {e}"), e)
}

/// Check for a PostgreSQL unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}
