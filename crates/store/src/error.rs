use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An existing, size-valid sidecar failed to parse. Fatal for the
    /// calling operation: overwriting it would destroy user annotations.
    #[error("malformed annotation store {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid sidecar filename {0:?}: path separators and '..' are not supported")]
    InvalidSidecarName(String),

    #[error("annotation text exceeds the configured limit of {limit} characters")]
    TextTooLong { limit: usize },
}
