//! Storage engine errors.

use std::path::PathBuf;
use thiserror::Error;

/// Engine operation errors.
///
/// The first four variants fail the upload before any variant task starts;
/// `Transcode` and `MetadataRead` carry the index of the variant that
/// failed and surface as the aggregate failure without affecting sibling
/// tasks.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No variant tasks configured")]
    MissingConfiguration,

    #[error("Invalid variant spec at index {index}: {message}")]
    InvalidSpec { index: usize, message: String },

    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Destination error: {0}")]
    Destination(String),

    #[error("Source materialization failed: {0}")]
    SourceMaterialization(String),

    #[error("Transcode failed for variant {index}: {message}")]
    Transcode {
        index: usize,
        path: PathBuf,
        message: String,
    },

    #[error("Metadata read-back failed for variant {index}: {message}")]
    MetadataRead {
        index: usize,
        path: PathBuf,
        message: String,
    },

    #[error("Cleanup failed: {0}")]
    Cleanup(String),
}

/// Result type for engine operations
pub type StoreResult<T> = Result<T, StoreError>;
