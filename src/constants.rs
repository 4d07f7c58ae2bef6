//! Cross-cutting, shared constants.
//!
//! TTL defaults are expressed in hours because that is how operators configure them;
//! derive the [`std::time::Duration`] values through [`hours`] to avoid drift.

use std::time::Duration;

pub const SECS_PER_HOUR: u64 = 60 * 60;

/// Fallback lifetime for any data type without an explicit TTL.
pub const DEFAULT_TTL_HOURS: u64 = 24;
/// Audio features are effectively immutable upstream.
pub const AUDIO_FEATURES_TTL_HOURS: u64 = 24 * 7;
/// Playlists are edited often.
pub const PLAYLIST_TTL_HOURS: u64 = 1;
/// Shared by track, album and artist details.
pub const DETAILS_TTL_HOURS: u64 = 24;

pub const DEFAULT_CLEANUP_INTERVAL_HOURS: u64 = 24;

pub const DEFAULT_MEMORY_CAPACITY: usize = 1_000;

pub const DEFAULT_STORAGE_PATH: &str = "./.metacache";

/// On-disk layout version written to `meta.json` in the storage root.
pub const SCHEMA_VERSION: u32 = 1;

/// Returns `hours` as a [`Duration`].
#[inline]
pub const fn hours(hours: u64) -> Duration {
    Duration::from_secs(hours * SECS_PER_HOUR)
}

/// Converts a [`Duration`] to whole milliseconds, saturating at `i64::MAX`.
#[inline]
pub fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hours_conversion() {
        assert_eq!(hours(1), Duration::from_secs(3600));
        assert_eq!(hours(PLAYLIST_TTL_HOURS).as_secs(), 3600);
        assert_eq!(hours(AUDIO_FEATURES_TTL_HOURS).as_secs(), 7 * 24 * 3600);
    }

    #[test]
    fn test_duration_millis_saturates() {
        assert_eq!(duration_millis(Duration::from_secs(2)), 2_000);
        assert_eq!(duration_millis(Duration::MAX), i64::MAX);
    }
}
