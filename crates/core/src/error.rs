//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Address token is not 40 hex digits (with optional `0x` prefix).
    #[error("Invalid address format: {0:?}")]
    InvalidAddress(String),
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
