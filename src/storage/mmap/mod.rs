//! Read-only memory maps over stored entry files.

pub mod error;

pub use error::{MmapError, MmapResult};

use std::fs::File;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use rkyv::Portable;
use rkyv::api::high::{HighValidator, access};
use rkyv::bytecheck::CheckBytes;
use rkyv::rancor::Error as RkyvError;

pub const RKYV_ALIGNMENT: usize = 16;

#[derive(Clone)]
pub struct MmapFileHandle {
    inner: Arc<Mmap>,
    path: Arc<std::path::PathBuf>,
}

impl std::fmt::Debug for MmapFileHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapFileHandle")
            .field("path", &self.path)
            .field("len", &self.len())
            .finish()
    }
}

impl MmapFileHandle {
    pub fn open<P: AsRef<Path>>(path: P) -> MmapResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let metadata = file.metadata()?;
        if metadata.len() == 0 {
            return Err(MmapError::EmptyFile);
        }

        // SAFETY: Entry files are never modified in place. Writers create a new file
        // and rename it over the old one, so this mapping stays valid and unchanged.
        let mmap = unsafe { Mmap::map(&file)? };

        Ok(Self {
            inner: Arc::new(mmap),
            path: Arc::new(path.to_path_buf()),
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        self.inner.deref()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn access_archived<T>(&self) -> MmapResult<&T>
    where
        T: Portable + for<'a> CheckBytes<HighValidator<'a, RkyvError>>,
    {
        let data = self.as_slice();

        if !(data.as_ptr() as usize).is_multiple_of(RKYV_ALIGNMENT) {
            return Err(MmapError::AlignmentError {
                offset: 0,
                alignment: RKYV_ALIGNMENT,
            });
        }

        access::<T, RkyvError>(data).map_err(|e| MmapError::ValidationFailed(format!("{:?}", e)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::storage::{ArchivedStoredEntry, StoredEntry};
    use crate::ttl::DataType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_empty_file_fails() {
        let file = NamedTempFile::new().expect("create temp file");
        let result = MmapFileHandle::open(file.path());
        assert!(matches!(result, Err(MmapError::EmptyFile)));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let result = MmapFileHandle::open("/definitely/not/here.rkyv");
        assert!(matches!(result, Err(MmapError::Io(_))));
    }

    #[test]
    fn test_access_archived_entry() {
        let key = CacheKey::new("u", DataType::Playlist, "p");
        let entry = StoredEntry::new(&key, b"payload".to_vec(), 1, 2);
        let bytes = rkyv::to_bytes::<RkyvError>(&entry).expect("serialize");

        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(&bytes).expect("write");
        file.flush().expect("flush");

        let handle = MmapFileHandle::open(file.path()).expect("open mmap");
        assert_eq!(handle.len(), bytes.len());

        let archived = handle
            .access_archived::<ArchivedStoredEntry>()
            .expect("access archived");
        assert_eq!(archived.key(), key);
        assert_eq!(archived.expires_at(), 2);
    }

    #[test]
    fn test_access_archived_rejects_garbage() {
        let mut file = NamedTempFile::new().expect("create temp file");
        file.write_all(&[0xFF; 48]).expect("write");
        file.flush().expect("flush");

        let handle = MmapFileHandle::open(file.path()).expect("open mmap");
        assert!(handle.access_archived::<ArchivedStoredEntry>().is_err());
    }
}
