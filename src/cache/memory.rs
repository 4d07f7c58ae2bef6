//! Memory tier: bounded, recency-ordered working set.
//!
//! One mutex guards the LRU list; every call takes it once and never performs I/O
//! while holding it. Entries past `expires_at` are dropped when touched.
//!
//! Removals bump a per-user generation. Writers that read the persistent tier
//! before filling memory capture a [`Generation`] first and insert with
//! [`MemoryTier::put_if_current`], so a value removed in the meantime is not
//! brought back.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

use super::key::CacheKey;
use super::stats::MemoryStats;
use crate::clock::millis_to_datetime;
use crate::hashing::hash_user_id;
use crate::storage::StoredEntry;
use crate::ttl::DataType;

/// Value held by the memory tier.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub payload: Arc<[u8]>,
    pub created_at: i64,
    pub expires_at: i64,
    pub access_count: u64,
    pub last_accessed: i64,
}

impl MemoryEntry {
    pub fn new(payload: impl Into<Arc<[u8]>>, created_at: i64, expires_at: i64) -> Self {
        Self {
            payload: payload.into(),
            created_at,
            expires_at,
            access_count: 0,
            last_accessed: created_at,
        }
    }

    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

impl From<&StoredEntry> for MemoryEntry {
    fn from(entry: &StoredEntry) -> Self {
        Self {
            payload: Arc::from(entry.payload.as_slice()),
            created_at: entry.created_at,
            expires_at: entry.expires_at,
            access_count: entry.access_count,
            last_accessed: entry.last_accessed,
        }
    }
}

/// Users share this many removal counters.
const GENERATION_STRIPES: usize = 64;

/// Removal counter observed for a key's user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    stripe: usize,
    value: u64,
}

fn stripe_of(user_id: &str) -> usize {
    (hash_user_id(user_id) % GENERATION_STRIPES as u64) as usize
}

struct Slots {
    entries: LruCache<CacheKey, MemoryEntry>,
    generations: [u64; GENERATION_STRIPES],
}

impl Slots {
    fn bump(&mut self, stripe: usize) {
        self.generations[stripe] = self.generations[stripe].wrapping_add(1);
    }
}

/// In-memory LRU keyed by [`CacheKey`].
pub struct MemoryTier {
    slots: Mutex<Slots>,
    capacity: NonZeroUsize,
}

impl MemoryTier {
    /// Creates a tier holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(Slots {
                entries: LruCache::new(capacity),
                generations: [0; GENERATION_STRIPES],
            }),
            capacity,
        }
    }

    /// Returns the entry if present and unexpired, marking it most recently used.
    pub fn get(&self, key: &CacheKey, now: i64) -> Option<MemoryEntry> {
        let mut slots = self.slots.lock();
        let entries = &mut slots.entries;

        let expired = entries.peek(key)?.is_expired(now);
        if expired {
            entries.pop(key);
            trace!(key = %key, "Memory tier entry expired");
            return None;
        }

        let entry = entries.get_mut(key)?;
        entry.access_count = entry.access_count.saturating_add(1);
        entry.last_accessed = now;
        Some(entry.clone())
    }

    /// Inserts or replaces `key`, evicting the least recently used entry when full.
    pub fn put(&self, key: CacheKey, entry: MemoryEntry) {
        let evicted = self.slots.lock().entries.push(key.clone(), entry);
        log_eviction(&key, evicted);
    }

    /// Current removal generation for `key`'s user.
    pub fn generation(&self, key: &CacheKey) -> Generation {
        let stripe = stripe_of(key.user_id());
        Generation {
            stripe,
            value: self.slots.lock().generations[stripe],
        }
    }

    /// Inserts `key` only if no removal touched its user since `seen` was taken.
    ///
    /// Returns `false` when the entry was discarded.
    pub fn put_if_current(&self, key: CacheKey, entry: MemoryEntry, seen: Generation) -> bool {
        let mut slots = self.slots.lock();
        if slots.generations[seen.stripe] != seen.value {
            return false;
        }
        let evicted = slots.entries.push(key.clone(), entry);
        drop(slots);
        log_eviction(&key, evicted);
        true
    }

    pub fn remove(&self, key: &CacheKey) -> Option<MemoryEntry> {
        let mut slots = self.slots.lock();
        slots.bump(stripe_of(key.user_id()));
        slots.entries.pop(key)
    }

    /// Returns `true` if `key` is held, without touching recency or expiry.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.slots.lock().entries.contains(key)
    }

    pub fn clear(&self) {
        let mut slots = self.slots.lock();
        for stripe in 0..GENERATION_STRIPES {
            slots.bump(stripe);
        }
        slots.entries.clear();
    }

    /// Drops a user's entries, optionally only those of one data type.
    pub fn clear_user(&self, user_id: &str, data_type: Option<&DataType>) -> usize {
        let mut slots = self.slots.lock();
        slots.bump(stripe_of(user_id));
        let doomed: Vec<CacheKey> = slots
            .entries
            .iter()
            .filter(|(key, _)| key.belongs_to(user_id, data_type))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            slots.entries.pop(key);
        }
        doomed.len()
    }

    /// Drops every entry with `expires_at <= now`.
    pub fn purge_expired(&self, now: i64) -> usize {
        let mut slots = self.slots.lock();
        let entries = &mut slots.entries;
        let doomed: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<CacheKey> {
        self.slots
            .lock()
            .entries
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Occupancy and usage snapshot.
    pub fn snapshot(&self) -> MemoryStats {
        let slots = self.slots.lock();
        let entries = &slots.entries;
        let mut stats = MemoryStats {
            size: entries.len(),
            capacity: self.capacity.get(),
            total_accesses: 0,
            oldest_entry: None,
            newest_entry: None,
        };

        let mut oldest = i64::MAX;
        let mut newest = i64::MIN;
        for (_, entry) in entries.iter() {
            stats.total_accesses = stats.total_accesses.saturating_add(entry.access_count);
            oldest = oldest.min(entry.created_at);
            newest = newest.max(entry.created_at);
        }

        if stats.size > 0 {
            stats.oldest_entry = Some(millis_to_datetime(oldest));
            stats.newest_entry = Some(millis_to_datetime(newest));
        }
        stats
    }
}

fn log_eviction(key: &CacheKey, evicted: Option<(CacheKey, MemoryEntry)>) {
    if let Some((evicted_key, _)) = evicted
        && &evicted_key != key
    {
        trace!(key = %evicted_key, "Memory tier evicted entry");
    }
}

impl std::fmt::Debug for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTier")
            .field("entries", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
