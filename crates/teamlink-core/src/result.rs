//! Convenience result type alias for TeamLink.

use crate::error::AppError;

/// A specialized `Result` type for TeamLink operations.
pub type AppResult<T> = Result<T, AppError>;
