//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// An hour-valued variable was not a number.
    #[error("failed to parse {name}='{value}' as hours: {source}")]
    InvalidHours {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },

    /// An hour-valued variable was zero, negative or not finite.
    #[error("invalid {name}='{value}': must be a positive number of hours")]
    NonPositiveHours { name: &'static str, value: String },

    /// An hour-valued variable does not fit in a `Duration`.
    #[error("invalid {name}='{value}': too many hours")]
    HoursOutOfRange { name: &'static str, value: String },

    /// A boolean variable was not one of `true/false/1/0/yes/no/on/off`.
    #[error("invalid {name}='{value}': expected a boolean")]
    InvalidBool { name: &'static str, value: String },

    #[error("memory capacity must be positive")]
    ZeroMemoryCapacity,

    #[error("ttl for '{data_type}' must be positive")]
    ZeroTtl { data_type: &'static str },

    #[error("cleanup interval must be positive")]
    ZeroCleanupInterval,

    /// Path exists but is not a directory.
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}
