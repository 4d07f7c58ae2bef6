//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `METACACHE_*` environment variables.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CLEANUP_INTERVAL_HOURS, DEFAULT_MEMORY_CAPACITY, DEFAULT_STORAGE_PATH, hours,
};
use crate::ttl::TtlPolicy;

const SECS_PER_HOUR: f64 = 3600.0;

/// Cache configuration.
///
/// Use [`CacheConfig::from_env`] to read `METACACHE_*` overrides on top of defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// When `false` the cache is a pass-through. Default: `true`.
    pub enabled: bool,

    /// Root directory of the persistent tier. Default: `./.metacache`.
    pub storage_path: PathBuf,

    /// Max entries in the memory tier. Default: `1_000`.
    pub memory_capacity: usize,

    /// Per-type entry lifetimes.
    pub ttl: TtlPolicy,

    /// Period of the background expiry sweep. Default: 24 hours.
    ///
    /// Hour-valued variables accept fractions, so `METACACHE_CLEANUP_INTERVAL_HOURS=0.5`
    /// sweeps every 30 minutes.
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            ttl: TtlPolicy::default(),
            cleanup_interval: hours(DEFAULT_CLEANUP_INTERVAL_HOURS),
        }
    }
}

impl CacheConfig {
    const ENV_ENABLED: &'static str = "METACACHE_ENABLED";
    const ENV_STORAGE_PATH: &'static str = "METACACHE_STORAGE_PATH";
    const ENV_MEMORY_CAPACITY: &'static str = "METACACHE_MEMORY_CAPACITY";
    const ENV_CLEANUP_INTERVAL_HOURS: &'static str = "METACACHE_CLEANUP_INTERVAL_HOURS";
    const ENV_TTL_DEFAULT_HOURS: &'static str = "METACACHE_TTL_DEFAULT_HOURS";
    const ENV_TTL_AUDIO_FEATURES_HOURS: &'static str = "METACACHE_TTL_AUDIO_FEATURES_HOURS";
    const ENV_TTL_PLAYLIST_HOURS: &'static str = "METACACHE_TTL_PLAYLIST_HOURS";
    const ENV_TTL_TRACK_DETAILS_HOURS: &'static str = "METACACHE_TTL_TRACK_DETAILS_HOURS";
    const ENV_TTL_ALBUM_DETAILS_HOURS: &'static str = "METACACHE_TTL_ALBUM_DETAILS_HOURS";
    const ENV_TTL_ARTIST_DETAILS_HOURS: &'static str = "METACACHE_TTL_ARTIST_DETAILS_HOURS";

    /// Loads configuration from environment variables (falling back to defaults).
    ///
    /// Malformed values are errors rather than silently ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let enabled = Self::parse_bool_from_env(Self::ENV_ENABLED, defaults.enabled)?;
        let storage_path = Self::parse_path_from_env(Self::ENV_STORAGE_PATH, defaults.storage_path);
        let memory_capacity =
            Self::parse_usize_from_env(Self::ENV_MEMORY_CAPACITY, defaults.memory_capacity)?;
        let cleanup_interval =
            Self::parse_hours_from_env(Self::ENV_CLEANUP_INTERVAL_HOURS, defaults.cleanup_interval)?;

        let base = defaults.ttl;
        let ttl = TtlPolicy {
            default: Self::parse_hours_from_env(Self::ENV_TTL_DEFAULT_HOURS, base.default)?,
            audio_features: Self::parse_hours_from_env(
                Self::ENV_TTL_AUDIO_FEATURES_HOURS,
                base.audio_features,
            )?,
            playlist: Self::parse_hours_from_env(Self::ENV_TTL_PLAYLIST_HOURS, base.playlist)?,
            track_details: Self::parse_hours_from_env(
                Self::ENV_TTL_TRACK_DETAILS_HOURS,
                base.track_details,
            )?,
            album_details: Self::parse_hours_from_env(
                Self::ENV_TTL_ALBUM_DETAILS_HOURS,
                base.album_details,
            )?,
            artist_details: Self::parse_hours_from_env(
                Self::ENV_TTL_ARTIST_DETAILS_HOURS,
                base.artist_details,
            )?,
        };

        let config = Self {
            enabled,
            storage_path,
            memory_capacity,
            ttl,
            cleanup_interval,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks basic invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_capacity == 0 {
            return Err(ConfigError::ZeroMemoryCapacity);
        }

        if let Some(data_type) = self.ttl.first_zero() {
            return Err(ConfigError::ZeroTtl { data_type });
        }

        if self.cleanup_interval.is_zero() {
            return Err(ConfigError::ZeroCleanupInterval);
        }

        if self.storage_path.exists() && !self.storage_path.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.storage_path.clone(),
            });
        }

        Ok(())
    }

    fn parse_bool_from_env(var_name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match env::var(var_name) {
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidBool {
                    name: var_name,
                    value,
                }),
            },
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or(default)
    }

    fn parse_usize_from_env(var_name: &'static str, default: usize) -> Result<usize, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }

    /// Reads a positive, possibly fractional, number of hours (`"0.5"` is 30 minutes).
    fn parse_hours_from_env(
        var_name: &'static str,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        let Ok(value) = env::var(var_name) else {
            return Ok(default);
        };

        let parsed: f64 = value
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidHours {
                name: var_name,
                value: value.clone(),
                source: e,
            })?;
        if !parsed.is_finite() || parsed <= 0.0 {
            return Err(ConfigError::NonPositiveHours {
                name: var_name,
                value,
            });
        }

        Duration::try_from_secs_f64(parsed * SECS_PER_HOUR).map_err(|_| {
            ConfigError::HoursOutOfRange {
                name: var_name,
                value,
            }
        })
    }
}
