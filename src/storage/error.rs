use std::path::PathBuf;
use thiserror::Error;

use crate::storage::mmap::MmapError;

#[derive(Error, Debug)]
/// Errors returned by persistent stores.
pub enum StoreError {
    /// IO error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mmap error.
    #[error("mmap error: {0}")]
    Mmap(#[from] MmapError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A record on disk could not be decoded or belongs to another key.
    #[error("corrupt entry at {path}")]
    Corrupt {
        /// File that failed validation.
        path: PathBuf,
    },

    /// Storage root path is missing/unavailable.
    #[error("storage path unavailable: {path}")]
    StorageUnavailable {
        /// Path that was unavailable.
        path: PathBuf,
    },

    /// The storage root was written by an incompatible layout version.
    #[error("unsupported storage schema version {found} (expected {expected})")]
    SchemaMismatch {
        /// Version found in `meta.json`.
        found: u32,
        /// Version this build writes.
        expected: u32,
    },

    /// The store could not be reached (failed blocking task or simulated outage).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
