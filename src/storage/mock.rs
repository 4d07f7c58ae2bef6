//! In-memory [`PersistentStore`] for tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::cache::CacheKey;
use crate::storage::store::aggregate_type_stats;
use crate::storage::{PersistentStore, StoreError, StoreResult, StoredEntry, TypeStats};
use crate::ttl::DataType;

/// Map-backed store with a switch to simulate an outage.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<CacheKey, StoredEntry>>>,
    unavailable: Arc<AtomicBool>,
    puts: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful `put` calls so far.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Returns a copy of the raw record, bypassing availability checks.
    pub fn peek(&self, key: &CacheKey) -> Option<StoredEntry> {
        self.entries.read().get(key).cloned()
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> StoreResult<Option<StoredEntry>> {
        self.check()?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &CacheKey, entry: &StoredEntry) -> StoreResult<()> {
        self.check()?;
        self.entries.write().insert(key.clone(), entry.clone());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> StoreResult<bool> {
        self.check()?;
        Ok(self.entries.write().remove(key).is_some())
    }

    fn delete_expired(&self, now: i64) -> StoreResult<usize> {
        self.check()?;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }

    fn delete_by_user(&self, user_id: &str, data_type: Option<&DataType>) -> StoreResult<usize> {
        self.check()?;
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.belongs_to(user_id, data_type));
        Ok(before - entries.len())
    }

    fn record_access(&self, key: &CacheKey, now: i64) -> StoreResult<()> {
        self.check()?;
        if let Some(entry) = self.entries.write().get_mut(key) {
            entry.access_count = entry.access_count.saturating_add(1);
            entry.last_accessed = now;
        }
        Ok(())
    }

    fn type_stats(&self, now: i64) -> StoreResult<Vec<TypeStats>> {
        self.check()?;
        let entries = self.entries.read();
        Ok(aggregate_type_stats(
            entries
                .values()
                .filter(|entry| !entry.is_expired(now))
                .map(|entry| {
                    (
                        entry.data_type.as_str(),
                        entry.created_at,
                        entry.access_count,
                    )
                }),
        ))
    }

    fn expired_count(&self, now: i64) -> StoreResult<usize> {
        self.check()?;
        Ok(self
            .entries
            .read()
            .values()
            .filter(|entry| entry.is_expired(now))
            .count())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
