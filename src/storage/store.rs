use serde::Serialize;

use crate::cache::CacheKey;
use crate::storage::StoredEntry;
use crate::storage::error::StoreResult;
use crate::ttl::DataType;

/// Durable key/value store behind the memory tier.
///
/// Calls block on I/O; async callers run them on the blocking pool. Each `put` must
/// be atomic: a concurrent `get` sees either the previous record or the new one.
/// `get` returns records regardless of expiry; callers decide staleness.
pub trait PersistentStore: Send + Sync + 'static {
    fn get(&self, key: &CacheKey) -> StoreResult<Option<StoredEntry>>;

    /// Inserts or replaces the record for `key`.
    fn put(&self, key: &CacheKey, entry: &StoredEntry) -> StoreResult<()>;

    /// Writes several records. Each write is individually atomic.
    fn put_many(&self, entries: &[(CacheKey, StoredEntry)]) -> StoreResult<()> {
        for (key, entry) in entries {
            self.put(key, entry)?;
        }
        Ok(())
    }

    /// Returns `true` if a record was removed.
    fn delete(&self, key: &CacheKey) -> StoreResult<bool>;

    /// Removes every record with `expires_at <= now`.
    fn delete_expired(&self, now: i64) -> StoreResult<usize>;

    /// Removes a user's records, optionally only those of one data type.
    fn delete_by_user(&self, user_id: &str, data_type: Option<&DataType>) -> StoreResult<usize>;

    /// Bumps `access_count` and `last_accessed`. Missing keys are ignored.
    fn record_access(&self, key: &CacheKey, now: i64) -> StoreResult<()>;

    /// Per-type aggregates over unexpired records.
    fn type_stats(&self, now: i64) -> StoreResult<Vec<TypeStats>>;

    /// Records with `expires_at <= now` that have not been swept yet.
    fn expired_count(&self, now: i64) -> StoreResult<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Aggregate over the live records of one data type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeStats {
    pub data_type: String,
    pub count: usize,
    pub avg_access_count: f64,
    /// Oldest `created_at` (unix millis).
    pub oldest: i64,
    /// Newest `created_at` (unix millis).
    pub newest: i64,
}

/// Folds `(data_type, created_at, access_count)` rows into sorted [`TypeStats`].
pub(crate) fn aggregate_type_stats<'a>(
    rows: impl Iterator<Item = (&'a str, i64, u64)>,
) -> Vec<TypeStats> {
    let mut by_type: std::collections::BTreeMap<&str, (usize, u64, i64, i64)> =
        std::collections::BTreeMap::new();

    for (data_type, created_at, access_count) in rows {
        let slot = by_type
            .entry(data_type)
            .or_insert((0, 0, i64::MAX, i64::MIN));
        slot.0 += 1;
        slot.1 = slot.1.saturating_add(access_count);
        slot.2 = slot.2.min(created_at);
        slot.3 = slot.3.max(created_at);
    }

    by_type
        .into_iter()
        .map(|(data_type, (count, accesses, oldest, newest))| TypeStats {
            data_type: data_type.to_string(),
            count,
            avg_access_count: accesses as f64 / count as f64,
            oldest,
            newest,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_type_stats() {
        let rows = vec![
            ("playlist", 10, 1),
            ("playlist", 30, 3),
            ("audio_features", 5, 0),
        ];

        let stats = aggregate_type_stats(rows.into_iter());

        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].data_type, "audio_features");
        assert_eq!(stats[0].count, 1);
        assert_eq!(stats[1].data_type, "playlist");
        assert_eq!(stats[1].count, 2);
        assert!((stats[1].avg_access_count - 2.0).abs() < f64::EPSILON);
        assert_eq!(stats[1].oldest, 10);
        assert_eq!(stats[1].newest, 30);
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_type_stats(std::iter::empty()).is_empty());
    }
}
