//! Batched lookups: resolve what the tiers hold, fetch the rest in one call.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::coordinator::{HybridCache, user_tag};
use super::key::CacheKey;
use crate::storage::PersistentStore;
use crate::ttl::DataType;

/// Values resolved by [`HybridCache::get_many`], in caller order.
///
/// Ids the loader did not return are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkResult<T> {
    entries: Vec<(String, T)>,
    hits: usize,
    fetched: usize,
}

impl<T> BulkResult<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of ids served from either tier.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Number of ids resolved by the loader.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(entry_id, _)| entry_id == id)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(id, value)| (id.as_str(), value))
    }

    pub fn into_vec(self) -> Vec<(String, T)> {
        self.entries
    }

    pub fn into_map(self) -> HashMap<String, T> {
        self.entries.into_iter().collect()
    }
}

impl<T> IntoIterator for BulkResult<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Drops repeated ids, keeping the first occurrence.
fn dedup_ids<I>(ids: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(Into::into)
        .filter(|id: &String| seen.insert(id.clone()))
        .collect()
}

impl<S: PersistentStore> HybridCache<S> {
    /// Resolves many ids of one data type with at most one loader call.
    ///
    /// Each id is probed in memory, then in the store. The remaining ids are passed
    /// to `loader` once, in caller order; it is not called when everything hits.
    /// Ids the loader omits are left out of the result and ids it invents are
    /// ignored. A loader error is returned untouched and nothing is cached.
    #[instrument(skip_all, fields(user = %user_tag(user_id), data_type = %data_type))]
    pub async fn get_many<T, E, I, F, Fut>(
        &self,
        user_id: &str,
        data_type: DataType,
        ids: I,
        loader: F,
    ) -> Result<BulkResult<T>, E>
    where
        T: Serialize + DeserializeOwned,
        I: IntoIterator,
        I::Item: Into<String>,
        F: FnOnce(Vec<String>) -> Fut,
        Fut: Future<Output = Result<HashMap<String, T>, E>>,
    {
        let ids = dedup_ids(ids);

        if !self.is_enabled() {
            if ids.is_empty() {
                return Ok(empty_result());
            }
            let mut loaded = loader(ids.clone()).await?;
            let entries: Vec<(String, T)> = ids
                .into_iter()
                .filter_map(|id| loaded.remove(&id).map(|value| (id, value)))
                .collect();
            let fetched = entries.len();
            return Ok(BulkResult {
                entries,
                hits: 0,
                fetched,
            });
        }

        let mut slots: Vec<(String, Option<T>)> = Vec::with_capacity(ids.len());
        let mut misses = Vec::new();
        for id in ids {
            let key = CacheKey::new(user_id, data_type.clone(), id.as_str());
            let cached = self.lookup::<T>(&key).await;
            if cached.is_none() {
                misses.push(id.clone());
            }
            slots.push((id, cached));
        }

        let hits = slots.len() - misses.len();
        let mut fetched = 0;

        if !misses.is_empty() {
            debug!(hits, misses = misses.len(), "Fetching bulk misses");
            let mut loaded = loader(misses.clone()).await?;

            let requested: HashSet<&str> = misses.iter().map(String::as_str).collect();
            let ignored = loaded
                .keys()
                .filter(|id| !requested.contains(id.as_str()))
                .count();
            if ignored > 0 {
                warn!(ignored, "Loader returned ids that were not requested");
            }

            let mut to_store = Vec::with_capacity(misses.len());
            for (id, slot) in slots.iter_mut().filter(|(_, slot)| slot.is_none()) {
                let Some(value) = loaded.remove(id.as_str()) else {
                    continue;
                };
                match serde_json::to_vec(&value) {
                    Ok(payload) => to_store.push((
                        CacheKey::new(user_id, data_type.clone(), id.as_str()),
                        payload,
                    )),
                    Err(e) => warn!(error = %e, "Failed to encode fetched value; not caching"),
                }
                *slot = Some(value);
                fetched += 1;
            }

            let ttl = self.config().ttl.ttl_for(&data_type);
            self.store_payloads(to_store, ttl).await;
        }

        let entries = slots
            .into_iter()
            .filter_map(|(id, slot)| slot.map(|value| (id, value)))
            .collect();

        Ok(BulkResult {
            entries,
            hits,
            fetched,
        })
    }
}

fn empty_result<T>() -> BulkResult<T> {
    BulkResult {
        entries: Vec::new(),
        hits: 0,
        fetched: 0,
    }
}
