//! Convenience result type alias for GeoTrack.

use crate::error::AppError;

/// A specialized `Result` type for GeoTrack operations.
pub type AppResult<T> = Result<T, AppError>;
