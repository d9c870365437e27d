//! Convenience result type alias for mumo.

use crate::error::AppError;

/// A specialized `Result` type for mumo operations.
pub type AppResult<T> = Result<T, AppError>;
