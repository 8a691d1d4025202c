//! Error types for the Skillbot services.

use thiserror::Error;

/// Result type alias using the Skillbot error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for bootstrap and configuration paths.
///
/// Request-level failures never use this type: the pipeline recovers
/// locally and substitutes user-visible status strings instead.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
