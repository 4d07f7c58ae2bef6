//! Storage model types.

use rkyv::{Archive, Deserialize, Serialize};

use crate::cache::CacheKey;
use crate::ttl::DataType;

/// Cached entry persisted to disk.
///
/// Stored as `rkyv` bytes and read back through a memory map. The full key is kept
/// inside the record so a reader can reject a file that does not belong to the
/// requested user.
///
/// # Example
/// ```rust
/// use metacache::{CacheKey, DataType, StoredEntry};
///
/// let key = CacheKey::new("user-1", DataType::Playlist, "37i9dQZF1DXcBWIGoYBM5M");
/// let entry = StoredEntry::new(&key, b"{}".to_vec(), 0, 3_600_000);
/// assert_eq!(entry.expires_at, 3_600_000);
/// assert!(entry.matches(&key));
/// ```
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
pub struct StoredEntry {
    /// Owning user (isolation boundary).
    pub user_id: String,
    /// Data-type label, see [`DataType::as_str`].
    pub data_type: String,
    /// Upstream identifier.
    pub item_id: String,
    /// Serialized value bytes.
    pub payload: Vec<u8>,
    /// Unix millis when created or last refreshed.
    pub created_at: i64,
    /// Unix millis after which the entry is stale.
    pub expires_at: i64,
    /// Reads served from the persistent tier.
    pub access_count: u64,
    /// Unix millis of the last read.
    pub last_accessed: i64,
}

impl StoredEntry {
    /// Builds a fresh entry for `key`; `access_count` starts at zero.
    pub fn new(key: &CacheKey, payload: Vec<u8>, created_at: i64, expires_at: i64) -> Self {
        Self {
            user_id: key.user_id().to_string(),
            data_type: key.data_type().as_str().to_string(),
            item_id: key.item_id().to_string(),
            payload,
            created_at,
            expires_at,
            access_count: 0,
            last_accessed: created_at,
        }
    }

    /// Expired entries are those with `expires_at <= now`.
    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Returns `true` if the record was written for exactly `key`.
    pub fn matches(&self, key: &CacheKey) -> bool {
        self.user_id == key.user_id()
            && self.data_type == key.data_type().as_str()
            && self.item_id == key.item_id()
    }

    /// Reconstructs the key this record was written under.
    pub fn key(&self) -> CacheKey {
        CacheKey::new(
            self.user_id.clone(),
            DataType::from_label(&self.data_type),
            self.item_id.clone(),
        )
    }
}

impl ArchivedStoredEntry {
    #[inline]
    pub fn expires_at(&self) -> i64 {
        self.expires_at.to_native()
    }

    #[inline]
    pub fn created_at(&self) -> i64 {
        self.created_at.to_native()
    }

    #[inline]
    pub fn access_count(&self) -> u64 {
        self.access_count.to_native()
    }

    /// Reconstructs the key without deserializing the payload.
    pub fn key(&self) -> CacheKey {
        CacheKey::new(
            self.user_id.as_str(),
            DataType::from_label(self.data_type.as_str()),
            self.item_id.as_str(),
        )
    }
}
