//! Error types for the aurora nowcast crates.

use thiserror::Error;

/// Result type alias using GeomagError.
pub type GeomagResult<T> = Result<T, GeomagError>;

/// Primary error type for configuration, storage and time handling.
#[derive(Debug, Error)]
pub enum GeomagError {
    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown station: {0}")]
    UnknownStation(String),

    #[error("Unknown region: {0}")]
    UnknownRegion(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    // === Storage Errors ===
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    // === Infrastructure Errors ===
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl GeomagError {
    /// Whether this error means "nothing at that path" rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GeomagError::NotFound(_))
    }
}

impl From<serde_json::Error> for GeomagError {
    fn from(err: serde_json::Error) -> Self {
        GeomagError::InternalError(format!("JSON error: {}", err))
    }
}
