//! Two-tier cache: bounded memory LRU in front of a persistent store.

pub mod bulk;
pub mod coordinator;
pub mod error;
pub mod key;
pub mod memory;
pub mod stats;


pub use bulk::BulkResult;
pub use coordinator::HybridCache;
pub use error::{CacheError, CacheResult};
pub use key::CacheKey;
pub use memory::{MemoryEntry, MemoryTier};
pub use stats::{CacheStats, MemoryStats, PersistentStats, SweepReport, TypeBreakdown};
