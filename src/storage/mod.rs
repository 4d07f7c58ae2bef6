//! Persistent tier: storage model, store trait and backends.

pub mod disk;
pub mod error;
pub mod mmap;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod model;
mod store;

pub use disk::{DiskStore, RecoveryReport};
pub use error::{StoreError, StoreResult};
#[cfg(any(test, feature = "mock"))]
pub use mock::MemoryStore;
pub use model::ArchivedStoredEntry;
pub use model::StoredEntry;
pub use store::{PersistentStore, TypeStats};
