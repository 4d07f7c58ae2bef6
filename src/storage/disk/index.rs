//! In-memory index over the files of a [`super::DiskStore`].
//!
//! Mirrors the three access paths the store needs: by key, by `(user, data_type)`
//! for invalidation, and by `expires_at` for sweeps.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::cache::CacheKey;
use crate::storage::TypeStats;
use crate::storage::store::aggregate_type_stats;
use crate::ttl::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IndexEntry {
    pub created_at: i64,
    pub expires_at: i64,
    pub access_count: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StoreIndex {
    entries: HashMap<CacheKey, IndexEntry>,
    by_owner: HashMap<String, HashMap<DataType, HashSet<CacheKey>>>,
    by_expiry: BTreeSet<(i64, CacheKey)>,
}

impl StoreIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &CacheKey) -> Option<&IndexEntry> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, entry: IndexEntry) {
        if let Some(previous) = self.entries.insert(key.clone(), entry) {
            self.by_expiry.remove(&(previous.expires_at, key.clone()));
        }
        self.by_expiry.insert((entry.expires_at, key.clone()));
        self.by_owner
            .entry(key.user_id().to_string())
            .or_default()
            .entry(key.data_type().clone())
            .or_default()
            .insert(key);
    }

    pub fn set_access_count(&mut self, key: &CacheKey, access_count: u64) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.access_count = access_count;
        }
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<IndexEntry> {
        let removed = self.entries.remove(key)?;
        self.by_expiry.remove(&(removed.expires_at, key.clone()));

        if let Some(types) = self.by_owner.get_mut(key.user_id()) {
            if let Some(keys) = types.get_mut(key.data_type()) {
                keys.remove(key);
                if keys.is_empty() {
                    types.remove(key.data_type());
                }
            }
            if types.is_empty() {
                self.by_owner.remove(key.user_id());
            }
        }

        Some(removed)
    }

    /// Keys owned by `user_id`, optionally restricted to one data type.
    pub fn keys_for(&self, user_id: &str, data_type: Option<&DataType>) -> Vec<CacheKey> {
        let Some(types) = self.by_owner.get(user_id) else {
            return Vec::new();
        };

        match data_type {
            Some(data_type) => types
                .get(data_type)
                .map(|keys| keys.iter().cloned().collect())
                .unwrap_or_default(),
            None => types.values().flatten().cloned().collect(),
        }
    }

    /// Keys with `expires_at <= now`, soonest first.
    pub fn expired_keys(&self, now: i64) -> Vec<CacheKey> {
        self.by_expiry
            .iter()
            .take_while(|(expires_at, _)| *expires_at <= now)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn expired_count(&self, now: i64) -> usize {
        self.by_expiry
            .iter()
            .take_while(|(expires_at, _)| *expires_at <= now)
            .count()
    }

    pub fn type_stats(&self, now: i64) -> Vec<TypeStats> {
        aggregate_type_stats(
            self.entries
                .iter()
                .filter(|(_, entry)| entry.expires_at > now)
                .map(|(key, entry)| {
                    (
                        key.data_type().as_str(),
                        entry.created_at,
                        entry.access_count,
                    )
                }),
        )
    }
}
