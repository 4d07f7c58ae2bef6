//! Point-in-time cache statistics.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::clock::millis_to_datetime;
use crate::storage::TypeStats;
use crate::ttl::TtlPolicy;

/// Snapshot of both tiers plus the active TTL policy.
///
/// Gathered under short critical sections, so figures may trail concurrent writes.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub memory: MemoryStats,
    pub persistent: PersistentStats,
    pub ttl: TtlPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub size: usize,
    pub capacity: usize,
    pub total_accesses: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistentStats {
    /// Records on disk, including expired ones not yet swept.
    pub total_entries: usize,
    pub expired_entries: usize,
    /// Live records grouped by data type label.
    pub by_type: Vec<TypeBreakdown>,
    /// Set when the store could not be read; the other fields are then zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PersistentStats {
    /// Live record count across all types.
    pub fn live_entries(&self) -> usize {
        self.by_type.iter().map(|t| t.count).sum()
    }

    pub fn for_type(&self, data_type: &str) -> Option<&TypeBreakdown> {
        self.by_type.iter().find(|t| t.data_type == data_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeBreakdown {
    pub data_type: String,
    pub count: usize,
    pub avg_access_count: f64,
    pub oldest_entry: DateTime<Utc>,
    pub newest_entry: DateTime<Utc>,
}

impl From<TypeStats> for TypeBreakdown {
    fn from(stats: TypeStats) -> Self {
        Self {
            data_type: stats.data_type,
            count: stats.count,
            avg_access_count: stats.avg_access_count,
            oldest_entry: millis_to_datetime(stats.oldest),
            newest_entry: millis_to_datetime(stats.newest),
        }
    }
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepReport {
    /// Persistent records removed.
    pub persistent_removed: usize,
    /// Memory entries purged as a backstop.
    pub memory_purged: usize,
    /// Sweep time (unix millis) used as "now".
    pub swept_at: i64,
    /// Store failure, if the persistent pass did not run to completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SweepReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
