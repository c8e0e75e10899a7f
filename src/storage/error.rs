use std::io;

use thiserror::Error;

/// Failures of the persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A value is stored under `key` but doesn't have the expected shape.
    #[error("stored value under `{key}` is corrupt: {reason}")]
    CorruptState { key: &'static str, reason: String },

    #[error("store operation on `{key}` failed: {source}")]
    Io {
        key: &'static str,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StorageError::CorruptState { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;
