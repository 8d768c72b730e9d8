//! Shared types for the cache store.

use serde::{Deserialize, Serialize};

/// One journal entry. `value == None` is a tombstone.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub(crate) struct StoredRecord {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache key must not be empty")]
    EmptyKey,

    #[error("Invalid collection tag `{0}`: must be non-empty and contain no `-`")]
    InvalidTypeTag(String),

    #[error("Cache write task failed: {0}")]
    WriteTaskFailed(String),

    #[error("Cache version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializeError(String),

    #[error("Deserialization error: {0}")]
    DeserializeError(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::IoError(err.to_string())
    }
}
