//! The object-store interface the cache consumes (§4.2), plus two concrete
//! adapters: an in-memory store for tests, and a filesystem-backed store for
//! running the cache end-to-end without a network object store.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write as _};
use std::path::PathBuf;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Outcomes an [`ObjectStore`] call can report. `NotFound` is a first-class
/// outcome, not a degenerate error: every other failure is [`StoreError::Io`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The object does not exist at `path`.
    #[error("object not found: {0}")]
    NotFound(String),
    /// Any other store failure (disk full, permission denied, network error, ...).
    #[error("object store I/O error: {0}")]
    Io(String),
}

/// The abstract key/value object store the cache mediates reads and writes
/// through. Only `offset == 0` and `nbytes == chunksize` are ever used by the
/// cache (§4.2); implementations are free to support more but need not.
pub trait ObjectStore: Send + Sync {
    /// Read exactly `nbytes` starting at `offset` from `path` into `buf`.
    /// `buf` must be at least `nbytes` long.
    fn read(&self, path: &str, offset: u64, nbytes: usize, buf: &mut [u8]) -> Result<(), StoreError>;

    /// Write exactly `nbytes` from `buf` to `path` at `offset`, creating the
    /// object if it does not exist.
    fn write(&self, path: &str, offset: u64, nbytes: usize, buf: &[u8]) -> Result<(), StoreError>;
}

/// An in-memory [`ObjectStore`], useful for tests and for exercising the
/// cache without a filesystem or network round trip. Supports injecting
/// deterministic `NotFound`/`Io` responses for specific paths so the
/// propagation policy (read fabrication, eviction write failure, flush
/// short-circuit) can be driven precisely.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    force_not_found: RwLock<HashSet<String>>,
    force_io_error: RwLock<HashSet<String>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an object, as if it had already been written.
    pub fn seed(&self, path: impl Into<String>, data: Vec<u8>) {
        self.objects.write().insert(path.into(), data);
    }

    /// Make the next and all subsequent `read`s of `path` report `NotFound`,
    /// even if an object is seeded there.
    pub fn force_not_found(&self, path: impl Into<String>) {
        self.force_not_found.write().insert(path.into());
    }

    /// Make all subsequent `read`/`write` calls against `path` report
    /// `StoreError::Io`.
    pub fn force_io_error(&self, path: impl Into<String>) {
        self.force_io_error.write().insert(path.into());
    }

    /// Number of objects currently stored (for test assertions).
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the bytes stored at `path`, if any (for test assertions).
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.read().get(path).cloned()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn read(&self, path: &str, offset: u64, nbytes: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        if self.force_io_error.read().contains(path) {
            return Err(StoreError::Io(format!("forced I/O error on {path}")));
        }
        if self.force_not_found.read().contains(path) {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let objects = self.objects.read();
        match objects.get(path) {
            Some(data) => {
                let start = offset as usize;
                let end = start + nbytes;
                if end > data.len() {
                    return Err(StoreError::Io(format!(
                        "short object at {path}: have {} bytes, want {end}",
                        data.len()
                    )));
                }
                buf[..nbytes].copy_from_slice(&data[start..end]);
                Ok(())
            }
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    fn write(&self, path: &str, offset: u64, nbytes: usize, buf: &[u8]) -> Result<(), StoreError> {
        if self.force_io_error.read().contains(path) {
            return Err(StoreError::Io(format!("forced I/O error on {path}")));
        }
        let mut objects = self.objects.write();
        let entry = objects.entry(path.to_string()).or_default();
        let start = offset as usize;
        let end = start + nbytes;
        if entry.len() < end {
            entry.resize(end, 0);
        }
        entry[start..end].copy_from_slice(&buf[..nbytes]);
        Ok(())
    }
}

/// A filesystem-backed [`ObjectStore`].
///
/// Objects are laid out under a base directory using a two-level directory
/// structure keyed by the SHA-256 hash of the object path, to avoid
/// pathological directory sizes for datasets with many chunks. Writes are
/// atomic: data lands in a temp file first, then is renamed into place.
pub struct FsObjectStore {
    base_dir: PathBuf,
}

impl FsObjectStore {
    /// Open (creating if needed) a filesystem object store rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(Self { base_dir })
    }

    fn object_file(&self, path: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        let hash = hex::encode(hasher.finalize());

        let dir1 = &hash[0..2];
        let dir2 = &hash[2..4];
        let filename = &hash[4..];

        self.base_dir.join(dir1).join(dir2).join(filename)
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, path: &str, offset: u64, nbytes: usize, buf: &mut [u8]) -> Result<(), StoreError> {
        let file_path = self.object_file(path);
        let mut file = match File::open(&file_path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_string()))
            }
            Err(e) => return Err(StoreError::Io(e.to_string())),
        };

        let mut data = Vec::new();
        file.read_to_end(&mut data).map_err(|e| StoreError::Io(e.to_string()))?;

        let start = offset as usize;
        let end = start + nbytes;
        if end > data.len() {
            return Err(StoreError::Io(format!(
                "short object at {path}: have {} bytes, want {end}",
                data.len()
            )));
        }
        buf[..nbytes].copy_from_slice(&data[start..end]);
        Ok(())
    }

    fn write(&self, path: &str, offset: u64, nbytes: usize, buf: &[u8]) -> Result<(), StoreError> {
        let target = self.object_file(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }

        // Writes only ever cover the whole chunk (offset 0, nbytes == chunksize),
        // so a fresh temp file is sufficient; no read-modify-write is needed.
        let temp = target.with_extension("tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp)
                .map_err(|e| StoreError::Io(e.to_string()))?;
            debug_assert_eq!(offset, 0, "FsObjectStore only supports whole-chunk writes");
            file.write_all(&buf[..nbytes]).map_err(|e| StoreError::Io(e.to_string()))?;
            file.sync_all().map_err(|e| StoreError::Io(e.to_string()))?;
        }
        fs::rename(&temp, &target).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_read_not_found() {
        let store = MemoryObjectStore::new();
        let mut buf = vec![0u8; 4];
        let err = store.read("missing", 0, 4, &mut buf).unwrap_err();
        assert_eq!(err, StoreError::NotFound("missing".into()));
    }

    #[test]
    fn memory_store_write_then_read() {
        let store = MemoryObjectStore::new();
        store.write("x.0", 0, 4, &[1, 2, 3, 4]).unwrap();
        let mut buf = vec![0u8; 4];
        store.read("x.0", 0, 4, &mut buf).unwrap();
        assert_eq!(buf, vec![1, 2, 3, 4]);
    }

    #[test]
    fn memory_store_forced_not_found_overrides_seeded_data() {
        let store = MemoryObjectStore::new();
        store.seed("x.0", vec![9; 4]);
        store.force_not_found("x.0");
        let mut buf = vec![0u8; 4];
        let err = store.read("x.0", 0, 4, &mut buf).unwrap_err();
        assert_eq!(err, StoreError::NotFound("x.0".into()));
    }

    #[test]
    fn memory_store_forced_io_error() {
        let store = MemoryObjectStore::new();
        store.seed("x.0", vec![9; 4]);
        store.force_io_error("x.0");
        let mut buf = vec![0u8; 4];
        assert!(matches!(store.read("x.0", 0, 4, &mut buf), Err(StoreError::Io(_))));
        assert!(matches!(store.write("x.0", 0, 4, &[1, 2, 3, 4]), Err(StoreError::Io(_))));
    }

    #[test]
    fn fs_store_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path()).unwrap();
        store.write("grp/arr.0.0", 0, 5, &[1, 2, 3, 4, 5]).unwrap();

        let mut buf = vec![0u8; 5];
        store.read("grp/arr.0.0", 0, 5, &mut buf).unwrap();
        assert_eq!(buf, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn fs_store_missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path()).unwrap();
        let mut buf = vec![0u8; 4];
        let err = store.read("nope", 0, 4, &mut buf).unwrap_err();
        assert_eq!(err, StoreError::NotFound("nope".into()));
    }

    #[test]
    fn fs_store_overwrite_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path()).unwrap();
        store.write("arr.0", 0, 3, &[1, 1, 1]).unwrap();
        store.write("arr.0", 0, 3, &[2, 2, 2]).unwrap();

        let mut buf = vec![0u8; 3];
        store.read("arr.0", 0, 3, &mut buf).unwrap();
        assert_eq!(buf, vec![2, 2, 2]);
    }
}
