//! Error types for the nowcast pipeline.

use std::path::PathBuf;

use geomag_common::GeomagError;
use thiserror::Error;

/// Errors that can occur while producing a nowcast.
///
/// Only `OutputWriteFailure` and `InvalidConfig` abort a run; everything else
/// is recovered per station or per region.
#[derive(Error, Debug)]
pub enum NowcastError {
    #[error("Source unavailable for station {station}: {message}")]
    SourceUnavailable { station: String, message: String },

    #[error("No data found for station {0}")]
    NotFound(String),

    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    #[error("No contributing data for region {0}")]
    NoContributingData(String),

    #[error("Failed to write output {}: {message}", path.display())]
    OutputWriteFailure { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Common(#[from] GeomagError),
}

/// Result type for nowcast operations.
pub type Result<T> = std::result::Result<T, NowcastError>;
