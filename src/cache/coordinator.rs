//! Read-through / write-through coordination of the memory and persistent tiers.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::error::CacheResult;
use super::key::CacheKey;
use super::memory::{MemoryEntry, MemoryTier};
use super::stats::{CacheStats, PersistentStats, SweepReport, TypeBreakdown};
use crate::clock::{SharedClock, SystemClock, expiry_after};
use crate::config::CacheConfig;
use crate::hashing::hash_user_id;
use crate::storage::{DiskStore, PersistentStore, StoreError, StoreResult, StoredEntry};
use crate::ttl::DataType;

/// Two-tier cache over a shared persistent store.
///
/// Lookups probe memory, then the store, then the caller's loader. Values are any
/// `serde` type and are stored as JSON. The store handle is shared through an `Arc`
/// and every store call runs on the blocking pool.
pub struct HybridCache<S: PersistentStore> {
    config: CacheConfig,
    memory: MemoryTier,
    store: Arc<S>,
    clock: SharedClock,
}

impl<S: PersistentStore> std::fmt::Debug for HybridCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridCache")
            .field("enabled", &self.config.enabled)
            .field("memory", &self.memory)
            .field("persistent_entries", &self.store.len())
            .finish()
    }
}

/// Hex fingerprint used in logs in place of the raw user id.
pub(crate) fn user_tag(user_id: &str) -> String {
    format!("{:016x}", hash_user_id(user_id))
}

impl HybridCache<DiskStore> {
    /// Opens the on-disk store at `config.storage_path` and wraps it.
    pub fn open(config: CacheConfig) -> StoreResult<Self> {
        let store = DiskStore::open(&config.storage_path)?;
        Ok(Self::new(config, Arc::new(store)))
    }
}

impl<S: PersistentStore> HybridCache<S> {
    pub fn new(config: CacheConfig, store: Arc<S>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, store: Arc<S>, clock: SharedClock) -> Self {
        let memory = MemoryTier::with_capacity(config.memory_capacity);
        Self {
            config,
            memory,
            store,
            clock,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn memory(&self) -> &MemoryTier {
        &self.memory
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Returns the cached value for `item_id`, or calls `loader` and caches its result.
    ///
    /// Loader errors are returned as-is and nothing is cached. Storage problems are
    /// logged and never fail the call. Dropping the future before the loader
    /// completes leaves both tiers untouched.
    #[instrument(skip(self, user_id, loader), fields(user = %user_tag(user_id), data_type = %data_type))]
    pub async fn get<T, E, F, Fut>(
        &self,
        user_id: &str,
        data_type: DataType,
        item_id: &str,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.config.enabled {
            return loader(item_id.to_string()).await;
        }

        let key = CacheKey::new(user_id, data_type, item_id);
        if let Some(value) = self.lookup::<T>(&key).await {
            return Ok(value);
        }

        debug!("Cache miss, invoking loader");
        let value = loader(item_id.to_string()).await?;

        let ttl = self.config.ttl.ttl_for(key.data_type());
        match serde_json::to_vec(&value) {
            Ok(payload) => self.store_payload(&key, payload, ttl).await,
            Err(e) => warn!(error = %e, "Failed to encode fetched value; not caching"),
        }

        Ok(value)
    }

    /// Writes `value` through both tiers with the data type's TTL.
    ///
    /// Replacing an existing entry resets its timestamps and access count.
    #[instrument(skip(self, user_id, value), fields(user = %user_tag(user_id), data_type = %data_type))]
    pub async fn put<T: Serialize>(
        &self,
        user_id: &str,
        data_type: DataType,
        item_id: &str,
        value: &T,
    ) -> CacheResult<()> {
        let ttl = self.config.ttl.ttl_for(&data_type);
        self.put_with_ttl(user_id, data_type, item_id, value, ttl)
            .await
    }

    /// Like [`put`](Self::put) with an explicit lifetime.
    pub async fn put_with_ttl<T: Serialize>(
        &self,
        user_id: &str,
        data_type: DataType,
        item_id: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let payload = serde_json::to_vec(value)?;
        let key = CacheKey::new(user_id, data_type, item_id);
        self.store_payload(&key, payload, ttl).await;
        Ok(())
    }

    /// Writes several values of one data type. Returns how many were written.
    #[instrument(skip_all, fields(user = %user_tag(user_id), data_type = %data_type, count = items.len()))]
    pub async fn put_many<K, T>(
        &self,
        user_id: &str,
        data_type: DataType,
        items: &[(K, T)],
    ) -> CacheResult<usize>
    where
        K: AsRef<str>,
        T: Serialize,
    {
        if !self.config.enabled || items.is_empty() {
            return Ok(0);
        }

        let encoded = items
            .iter()
            .map(|(id, value)| {
                let key = CacheKey::new(user_id, data_type.clone(), id.as_ref());
                serde_json::to_vec(value).map(|payload| (key, payload))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let ttl = self.config.ttl.ttl_for(&data_type);
        let count = encoded.len();
        self.store_payloads(encoded, ttl).await;
        Ok(count)
    }

    /// Removes one entry from both tiers. Returns `true` if either tier held it.
    ///
    /// Memory is cleared again once the store delete returns, dropping any copy a
    /// concurrent read promoted in between.
    #[instrument(skip(self, user_id), fields(user = %user_tag(user_id), data_type = %data_type))]
    pub async fn remove(&self, user_id: &str, data_type: DataType, item_id: &str) -> bool {
        let key = CacheKey::new(user_id, data_type, item_id);
        let in_memory = self.memory.remove(&key).is_some();

        let owned = key.clone();
        let on_disk = match self.run_store(move |store| store.delete(&owned)).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Failed to delete persistent entry");
                false
            }
        };
        let promoted = self.memory.remove(&key).is_some();

        in_memory || on_disk || promoted
    }

    /// Drops a user's entries from both tiers, optionally only one data type.
    ///
    /// Returns the number of persistent entries removed, or the number of memory
    /// entries dropped when the store could not be reached. Memory is cleared on both
    /// sides of the store delete, as in [`remove`](Self::remove).
    #[instrument(skip(self, user_id), fields(user = %user_tag(user_id)))]
    pub async fn invalidate(&self, user_id: &str, data_type: Option<DataType>) -> usize {
        let mut from_memory = self.memory.clear_user(user_id, data_type.as_ref());

        let user = user_id.to_string();
        let scope = data_type.clone();
        let result = self
            .run_store(move |store| store.delete_by_user(&user, scope.as_ref()))
            .await;
        from_memory += self.memory.clear_user(user_id, data_type.as_ref());

        match result {
            Ok(removed) => {
                debug!(removed, from_memory, "Invalidated user entries");
                removed
            }
            Err(e) => {
                warn!(error = %e, "Failed to invalidate persistent entries");
                from_memory
            }
        }
    }

    /// Removes expired entries from the store, then from memory. Returns the number
    /// of persistent entries removed.
    pub async fn cleanup_expired(&self) -> usize {
        self.sweep_expired().await.persistent_removed
    }

    /// Full sweep outcome, including memory purges and any store failure.
    #[instrument(skip(self))]
    pub async fn sweep_expired(&self) -> SweepReport {
        let now = self.now();
        let mut report = SweepReport {
            swept_at: now,
            ..Default::default()
        };

        match self.run_store(move |store| store.delete_expired(now)).await {
            Ok(removed) => report.persistent_removed = removed,
            Err(e) => {
                warn!(error = %e, "Expiry sweep of persistent tier failed");
                report.error = Some(e.to_string());
            }
        }
        report.memory_purged = self.memory.purge_expired(now);

        report
    }

    /// Snapshot of both tiers.
    pub async fn stats(&self) -> CacheStats {
        let now = self.now();
        let memory = self.memory.snapshot();

        let result = self
            .run_store(move |store| {
                Ok((
                    store.len(),
                    store.expired_count(now)?,
                    store.type_stats(now)?,
                ))
            })
            .await;

        let persistent = match result {
            Ok((total_entries, expired_entries, by_type)) => PersistentStats {
                total_entries,
                expired_entries,
                by_type: by_type.into_iter().map(TypeBreakdown::from).collect(),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Failed to read persistent stats");
                PersistentStats {
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        };

        CacheStats {
            enabled: self.config.enabled,
            memory,
            persistent,
            ttl: self.config.ttl,
        }
    }

    /// Probes memory, then the store. Undecodable entries are dropped and reported as
    /// a miss.
    pub(crate) async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let now = self.now();

        if let Some(entry) = self.memory.get(key, now) {
            match serde_json::from_slice(&entry.payload) {
                Ok(value) => {
                    debug!(key = %key, "Memory tier hit");
                    return Some(value);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Dropping undecodable memory entry");
                    self.drop_corrupt(key).await;
                    return None;
                }
            }
        }

        let seen = self.memory.generation(key);
        let owned = key.clone();
        let stored = match self.run_store(move |store| store.get(&owned)).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Persistent lookup failed; treating as miss");
                return None;
            }
        };

        if !stored.matches(key) || stored.is_expired(now) {
            return None;
        }

        let value = match serde_json::from_slice(&stored.payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "Dropping undecodable persistent entry");
                self.drop_corrupt(key).await;
                return None;
            }
        };

        debug!(key = %key, "Persistent tier hit, promoting");
        let owned = key.clone();
        if let Err(e) = self
            .run_store(move |store| store.record_access(&owned, now))
            .await
        {
            warn!(key = %key, error = %e, "Failed to record persistent access");
        }

        let mut promoted = MemoryEntry::from(&stored);
        promoted.access_count = promoted.access_count.saturating_add(1);
        promoted.last_accessed = now;
        if !self.memory.put_if_current(key.clone(), promoted, seen) {
            debug!(key = %key, "Entry removed during lookup; not promoting");
        }

        Some(value)
    }

    /// Writes one encoded value: store first, then memory.
    pub(crate) async fn store_payload(&self, key: &CacheKey, payload: Vec<u8>, ttl: Duration) {
        self.store_payloads(vec![(key.clone(), payload)], ttl)
            .await;
    }

    /// Writes encoded values: store first (one blocking call), then memory.
    ///
    /// A store failure is logged and the values are still cached in memory. A value
    /// whose user was invalidated while the store write ran is not put in memory.
    pub(crate) async fn store_payloads(&self, items: Vec<(CacheKey, Vec<u8>)>, ttl: Duration) {
        if items.is_empty() {
            return;
        }

        let now = self.now();
        let expires_at = expiry_after(now, ttl);

        let records: Vec<(CacheKey, StoredEntry)> = items
            .into_iter()
            .map(|(key, payload)| {
                let entry = StoredEntry::new(&key, payload, now, expires_at);
                (key, entry)
            })
            .collect();

        let seen: Vec<_> = records
            .iter()
            .map(|(key, _)| self.memory.generation(key))
            .collect();

        let records = Arc::new(records);
        let shared = Arc::clone(&records);
        if let Err(e) = self
            .run_store(move |store| store.put_many(&shared))
            .await
        {
            warn!(
                error = %e,
                count = records.len(),
                "Persistent write failed; caching in memory only"
            );
        }

        for ((key, entry), seen) in records.iter().zip(seen) {
            let cached = self.memory.put_if_current(
                key.clone(),
                MemoryEntry::new(entry.payload.as_slice(), now, expires_at),
                seen,
            );
            if !cached {
                debug!(key = %key, "Entry removed during write; memory copy skipped");
            }
        }
    }

    async fn drop_corrupt(&self, key: &CacheKey) {
        self.memory.remove(key);
        let owned = key.clone();
        if let Err(e) = self.run_store(move |store| store.delete(&owned)).await {
            warn!(key = %key, error = %e, "Failed to delete corrupt persistent entry");
        }
    }

    /// Runs a store call on the blocking pool. A failed join is reported as an
    /// unavailable store.
    async fn run_store<R, F>(&self, f: F) -> StoreResult<R>
    where
        F: FnOnce(&S) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }
}
