//! Metacache library crate (used by the maintenance binary and integration tests).
//!
//! A two-tier cache for metadata fetched from a rate-limited upstream API. A bounded
//! in-memory LRU sits in front of an on-disk store; every entry is scoped to one user
//! and expires according to a per-data-type TTL.
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`HybridCache`] - Read-through / write-through coordinator
//! - [`CacheKey`], [`DataType`] - User-scoped keys
//! - [`TtlPolicy`] - Per-type lifetimes
//! - [`BulkResult`] - Ordered result of [`HybridCache::get_many`]
//! - [`CacheStats`] - Snapshot of both tiers
//!
//! ## Storage
//! - [`PersistentStore`] - Durable tier abstraction
//! - [`DiskStore`] - File-per-entry store with atomic writes and an rkyv record format
//! - [`StoredEntry`] - Persistent record
//!
//! ## Operations
//! - [`CacheConfig`] - Environment-backed configuration
//! - [`MaintenanceScheduler`] - Periodic expiry sweeps
//!
//! ## Test/Mock Support
//! [`MemoryStore`](storage::MemoryStore) and [`ManualClock`](clock::ManualClock) are
//! available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod clock;
pub mod config;
pub mod constants;
pub mod hashing;
pub mod maintenance;
pub mod storage;
pub mod ttl;

pub use cache::{
    BulkResult, CacheError, CacheKey, CacheResult, CacheStats, HybridCache, MemoryStats,
    MemoryTier, PersistentStats, SweepReport, TypeBreakdown,
};
pub use clock::{Clock, SharedClock, SystemClock};
#[cfg(any(test, feature = "mock"))]
pub use clock::ManualClock;
pub use config::{CacheConfig, ConfigError};
pub use hashing::{hash_to_u64, hash_user_id};
pub use maintenance::{MaintenanceError, MaintenanceResult, MaintenanceScheduler};
#[cfg(any(test, feature = "mock"))]
pub use storage::MemoryStore;
pub use storage::{
    DiskStore, PersistentStore, RecoveryReport, StoreError, StoreResult, StoredEntry, TypeStats,
};
pub use ttl::{DataType, OtherLabel, TtlPolicy};
