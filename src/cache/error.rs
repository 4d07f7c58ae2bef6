//! Errors surfaced by explicit cache writes.
//!
//! Reads never fail because of the cache: loader errors pass through untouched and
//! storage errors degrade to a miss.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The value could not be encoded as JSON.
    #[error("failed to encode cache value: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;
