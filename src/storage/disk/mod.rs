//! File-per-entry persistent store.
//!
//! Layout: `root/<user hash>/<data type>/<item hash>.rkyv`, plus `meta.json` holding the
//! schema version. Each write goes to a uniquely named temp file which is fsynced and
//! renamed into place, so readers never observe a partial record.
//!
//! The store is a process-wide shared handle. Writers are serialized by a single
//! mutex; readers take only the index read lock and map files directly, so reads
//! proceed concurrently with each other and with an in-flight write.

mod index;


use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use rkyv::rancor::Error as RkyvError;
use rkyv::{from_bytes, to_bytes};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use self::index::{IndexEntry, StoreIndex};
use crate::cache::CacheKey;
use crate::constants::SCHEMA_VERSION;
use crate::hashing::{data_type_segment, item_file_stem, user_dir_name};
use crate::storage::mmap::{MmapError, MmapFileHandle};
use crate::storage::{
    ArchivedStoredEntry, PersistentStore, StoreError, StoreResult, StoredEntry, TypeStats,
};
use crate::ttl::DataType;

const RKYV_EXTENSION: &str = "rkyv";

const TEMP_EXTENSION: &str = "tmp";

const META_FILENAME: &str = "meta.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    schema_version: u32,
}

/// Outcome of rebuilding the index at [`DiskStore::open`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records indexed.
    pub loaded: usize,
    /// Undecodable or misplaced records that were deleted.
    pub dropped_corrupt: usize,
    /// Leftover temp files from interrupted writes that were deleted.
    pub dropped_temp: usize,
}

/// Durable [`PersistentStore`] rooted at a directory.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    index: RwLock<StoreIndex>,
    write_lock: Mutex<()>,
    recovery: RecoveryReport,
}

impl DiskStore {
    /// Opens (or creates) a store at `root` and rebuilds its index from disk.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();

        if !root.exists() {
            fs::create_dir_all(&root).map_err(|_| StoreError::StorageUnavailable {
                path: root.clone(),
            })?;
        } else if !root.is_dir() {
            return Err(StoreError::StorageUnavailable { path: root });
        }

        Self::check_schema(&root)?;

        let (index, recovery) = Self::rebuild_index(&root)?;
        info!(
            path = %root.display(),
            loaded = recovery.loaded,
            dropped_corrupt = recovery.dropped_corrupt,
            dropped_temp = recovery.dropped_temp,
            "Persistent store opened"
        );

        Ok(Self {
            root,
            index: RwLock::new(index),
            write_lock: Mutex::new(()),
            recovery,
        })
    }

    /// Returns the root storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// What [`DiskStore::open`] found on disk.
    pub fn recovery_report(&self) -> RecoveryReport {
        self.recovery
    }

    /// Path of the record file for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.type_dir(key.user_id(), key.data_type())
            .join(format!("{}.{}", item_file_stem(key.item_id()), RKYV_EXTENSION))
    }

    fn user_dir(&self, user_id: &str) -> PathBuf {
        self.root.join(user_dir_name(user_id))
    }

    fn type_dir(&self, user_id: &str, data_type: &DataType) -> PathBuf {
        self.user_dir(user_id)
            .join(data_type_segment(data_type.as_str()))
    }

    fn check_schema(root: &Path) -> StoreResult<()> {
        let meta_path = root.join(META_FILENAME);

        if meta_path.exists() {
            let raw = fs::read(&meta_path)?;
            let meta: StoreMeta = serde_json::from_slice(&raw)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            if meta.schema_version != SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    found: meta.schema_version,
                    expected: SCHEMA_VERSION,
                });
            }
            return Ok(());
        }

        let meta = StoreMeta {
            schema_version: SCHEMA_VERSION,
        };
        let bytes =
            serde_json::to_vec(&meta).map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomically(&meta_path, &bytes)?;
        Ok(())
    }

    fn rebuild_index(root: &Path) -> StoreResult<(StoreIndex, RecoveryReport)> {
        let mut index = StoreIndex::default();
        let mut report = RecoveryReport::default();

        for user_dir in subdirectories(root)? {
            for type_dir in subdirectories(&user_dir)? {
                for file in fs::read_dir(&type_dir)? {
                    let path = file?.path();
                    if !path.is_file() {
                        continue;
                    }

                    if path.extension().is_some_and(|ext| ext == TEMP_EXTENSION) {
                        remove_file_if_exists(&path)?;
                        report.dropped_temp += 1;
                        continue;
                    }

                    if path.extension().is_none_or(|ext| ext != RKYV_EXTENSION) {
                        continue;
                    }

                    match read_index_entry(&path) {
                        Some((key, entry)) if expected_path(root, &key) == path => {
                            index.insert(key, entry);
                            report.loaded += 1;
                        }
                        _ => {
                            warn!(path = %path.display(), "Dropping corrupt cache record");
                            remove_file_if_exists(&path)?;
                            report.dropped_corrupt += 1;
                        }
                    }
                }
            }
        }

        Ok((index, report))
    }

    fn read_entry(path: &Path) -> StoreResult<Option<StoredEntry>> {
        let handle = match MmapFileHandle::open(path) {
            Ok(handle) => handle,
            Err(MmapError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(None);
            }
            Err(MmapError::EmptyFile) => {
                return Err(StoreError::Corrupt {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        from_bytes::<StoredEntry, RkyvError>(handle.as_slice())
            .map(Some)
            .map_err(|_| StoreError::Corrupt {
                path: path.to_path_buf(),
            })
    }

    fn write_entry(&self, key: &CacheKey, entry: &StoredEntry) -> StoreResult<()> {
        let bytes =
            to_bytes::<RkyvError>(entry).map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomically(&self.entry_path(key), &bytes)
    }

    /// Removes the file and index slot for `key`. Caller holds the write lock.
    fn remove_locked(&self, key: &CacheKey) -> StoreResult<bool> {
        let existed = remove_file_if_exists(&self.entry_path(key))?;
        let indexed = self.index.write().remove(key).is_some();
        Ok(existed || indexed)
    }

    fn drop_corrupt(&self, key: &CacheKey, path: &Path) {
        let _guard = self.write_lock.lock();
        warn!(key = %key, path = %path.display(), "Dropping corrupt cache record");
        if let Err(e) = self.remove_locked(key) {
            warn!(key = %key, error = %e, "Failed to remove corrupt cache record");
        }
    }

    fn prune_empty_dirs(&self, user_id: &str) {
        let user_dir = self.user_dir(user_id);
        if let Ok(types) = subdirectories(&user_dir) {
            for type_dir in types {
                let _ = fs::remove_dir(type_dir);
            }
        }
        let _ = fs::remove_dir(user_dir);
    }

    fn remove_keys_locked(&self, keys: Vec<CacheKey>) -> StoreResult<usize> {
        let mut removed = 0;
        for key in keys {
            match self.remove_locked(&key) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to remove cache record");
                }
            }
        }
        Ok(removed)
    }
}

impl PersistentStore for DiskStore {
    fn get(&self, key: &CacheKey) -> StoreResult<Option<StoredEntry>> {
        if !self.index.read().contains(key) {
            return Ok(None);
        }

        let path = self.entry_path(key);
        match Self::read_entry(&path) {
            Ok(Some(entry)) if entry.matches(key) => Ok(Some(entry)),
            Ok(Some(_)) => {
                debug!(key = %key, "Record key mismatch, treating as miss");
                Ok(None)
            }
            Ok(None) => Ok(None),
            Err(StoreError::Corrupt { path }) => {
                self.drop_corrupt(key, &path);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn put(&self, key: &CacheKey, entry: &StoredEntry) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        self.write_entry(key, entry)?;
        self.index.write().insert(
            key.clone(),
            IndexEntry {
                created_at: entry.created_at,
                expires_at: entry.expires_at,
                access_count: entry.access_count,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &CacheKey) -> StoreResult<bool> {
        let _guard = self.write_lock.lock();
        self.remove_locked(key)
    }

    fn delete_expired(&self, now: i64) -> StoreResult<usize> {
        let _guard = self.write_lock.lock();
        let expired = self.index.read().expired_keys(now);
        if expired.is_empty() {
            return Ok(0);
        }

        let users: std::collections::HashSet<String> =
            expired.iter().map(|k| k.user_id().to_string()).collect();
        let removed = self.remove_keys_locked(expired)?;
        for user_id in users {
            self.prune_empty_dirs(&user_id);
        }

        debug!(removed, "Expired cache records deleted");
        Ok(removed)
    }

    fn delete_by_user(&self, user_id: &str, data_type: Option<&DataType>) -> StoreResult<usize> {
        let _guard = self.write_lock.lock();
        let keys = self.index.read().keys_for(user_id, data_type);
        let removed = self.remove_keys_locked(keys)?;
        self.prune_empty_dirs(user_id);
        Ok(removed)
    }

    fn record_access(&self, key: &CacheKey, now: i64) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        if !self.index.read().contains(key) {
            return Ok(());
        }

        let Some(mut entry) = Self::read_entry(&self.entry_path(key))? else {
            return Ok(());
        };
        if !entry.matches(key) {
            return Ok(());
        }

        entry.access_count = entry.access_count.saturating_add(1);
        entry.last_accessed = now;
        self.write_entry(key, &entry)?;
        self.index.write().set_access_count(key, entry.access_count);
        Ok(())
    }

    fn type_stats(&self, now: i64) -> StoreResult<Vec<TypeStats>> {
        Ok(self.index.read().type_stats(now))
    }

    fn expired_count(&self, now: i64) -> StoreResult<usize> {
        Ok(self.index.read().expired_count(now))
    }

    fn len(&self) -> usize {
        self.index.read().len()
    }
}

fn expected_path(root: &Path, key: &CacheKey) -> PathBuf {
    root.join(user_dir_name(key.user_id()))
        .join(data_type_segment(key.data_type().as_str()))
        .join(format!("{}.{}", item_file_stem(key.item_id()), RKYV_EXTENSION))
}

fn read_index_entry(path: &Path) -> Option<(CacheKey, IndexEntry)> {
    let handle = MmapFileHandle::open(path).ok()?;
    let archived = handle.access_archived::<ArchivedStoredEntry>().ok()?;
    Some((
        archived.key(),
        IndexEntry {
            created_at: archived.created_at(),
            expires_at: archived.expires_at(),
            access_count: archived.access_count(),
        },
    ))
}

fn subdirectories(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

/// Writes `bytes` to a unique temp file beside `path`, fsyncs it, then renames it over `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let parent = path.parent().ok_or_else(|| StoreError::StorageUnavailable {
        path: path.to_path_buf(),
    })?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("entry");
    let temp_path = parent.join(format!(
        "{}.{}.{}",
        file_name,
        uuid::Uuid::new_v4().simple(),
        TEMP_EXTENSION
    ));

    let result = (|| -> io::Result<()> {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

fn remove_file_if_exists(path: &Path) -> StoreResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
