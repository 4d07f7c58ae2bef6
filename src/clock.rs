//! Wall-clock source for entry timestamps.
//!
//! All timestamps are unix milliseconds. Tests swap in [`ManualClock`] to step time
//! across TTL boundaries without sleeping.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::constants::duration_millis;

/// Source of "now" in unix milliseconds.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now_millis(&self) -> i64;
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Converts unix milliseconds to a UTC timestamp (clamped to the epoch on overflow).
pub fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[cfg(any(test, feature = "mock"))]
pub use manual::ManualClock;

#[cfg(any(test, feature = "mock"))]
mod manual {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;

    use super::{Clock, duration_millis};

    /// Manually driven clock for tests.
    #[derive(Debug, Clone, Default)]
    pub struct ManualClock {
        now: Arc<AtomicI64>,
    }

    impl ManualClock {
        pub fn new(start_millis: i64) -> Self {
            Self {
                now: Arc::new(AtomicI64::new(start_millis)),
            }
        }

        pub fn set(&self, millis: i64) {
            self.now.store(millis, Ordering::SeqCst);
        }

        pub fn advance(&self, by: Duration) {
            self.now.fetch_add(duration_millis(by), Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}

/// Returns `now + ttl` in unix milliseconds, saturating.
#[inline]
pub fn expiry_after(now_millis: i64, ttl: Duration) -> i64 {
    now_millis.saturating_add(duration_millis(ttl))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new(1_000);
        clock.advance(Duration::from_secs(2));
        assert_eq!(clock.now_millis(), 3_000);

        let shared = clock.clone();
        shared.set(10);
        assert_eq!(clock.now_millis(), 10);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_expiry_after_saturates() {
        assert_eq!(expiry_after(0, Duration::from_secs(1)), 1_000);
        assert_eq!(expiry_after(i64::MAX - 1, Duration::from_secs(1)), i64::MAX);
    }

    #[test]
    fn test_millis_to_datetime() {
        assert_eq!(millis_to_datetime(0), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(millis_to_datetime(1_500).timestamp_millis(), 1_500);
    }
}
