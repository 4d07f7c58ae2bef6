//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metacache::{CacheConfig, DataType, DiskStore, HybridCache, ManualClock};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

pub const START: i64 = 1_700_000_000_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub track_id: String,
    pub tempo: f64,
    pub energy: f64,
}

pub fn features(track_id: &str) -> AudioFeatures {
    AudioFeatures {
        track_id: track_id.to_string(),
        tempo: 120.0,
        energy: 0.5,
    }
}

/// A disk-backed cache in a temp directory, driven by a manual clock.
pub struct DiskHarness {
    pub cache: Arc<HybridCache<DiskStore>>,
    pub clock: ManualClock,
    pub calls: Arc<AtomicUsize>,
    pub dir: TempDir,
}

impl DiskHarness {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let clock = ManualClock::new(START);
        let cache = open_cache(&dir, config, &clock);
        Self {
            cache: Arc::new(cache),
            clock,
            calls: Arc::new(AtomicUsize::new(0)),
            dir,
        }
    }

    /// Opens a second cache over the same directory, as a restarted process would.
    pub fn reopen(&self) -> HybridCache<DiskStore> {
        open_cache(&self.dir, self.cache.config().clone(), &self.clock)
    }

    pub async fn load(&self, user: &str, data_type: DataType, id: &str) -> AudioFeatures {
        load_counted(&self.cache, &self.calls, user, data_type, id).await
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn open_cache(dir: &TempDir, config: CacheConfig, clock: &ManualClock) -> HybridCache<DiskStore> {
    let store = DiskStore::open(dir.path().join("store")).expect("Failed to open store");
    HybridCache::with_clock(config, Arc::new(store), Arc::new(clock.clone()))
}

pub async fn load_counted(
    cache: &HybridCache<DiskStore>,
    calls: &Arc<AtomicUsize>,
    user: &str,
    data_type: DataType,
    id: &str,
) -> AudioFeatures {
    let calls = Arc::clone(calls);
    cache
        .get(user, data_type, id, |id| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(features(&id))
        })
        .await
        .expect("infallible")
}
