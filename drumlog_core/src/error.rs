//! Error types for the drumlog_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for drumlog_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),

    /// Filter criteria that cannot be applied (unknown time range, inverted bounds)
    #[error("Invalid filter criteria: {0}")]
    InvalidCriteria(String),

    /// A practice session was started with no exercises
    #[error("Cannot start a practice session without exercises")]
    EmptySelection,

    /// Recorder operation called in the wrong lifecycle state
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// Reading or writing a key in the persistence gateway failed
    #[error("Persistence failure for '{key}': {reason}")]
    Persistence { key: String, reason: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap any displayable failure as a persistence error for `key`
    pub fn persistence(key: &str, reason: impl std::fmt::Display) -> Self {
        Error::Persistence {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
