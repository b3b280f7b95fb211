//! The per-variable chunk cache façade (§4.4): the component everything
//! else in this crate exists to support.

use std::sync::Arc;

use tracing::{debug, trace, warn};

use zcache_core::{build_chunk_path, is_legal_separator, CacheError, VarMeta};

use crate::entry::{hash_indices, CacheEntry};
use crate::indexed_lru::IndexedLru;
use crate::store::{ObjectStore, StoreError};

/// The result of a successful [`ChunkCache::read`].
///
/// `created` rides back as a soft signal alongside `Ok`, the idiomatic
/// rendering of an informational success sub-code: it tells the caller the
/// chunk did not exist on the store and was fabricated, without making that
/// an error.
pub struct ReadOutcome<'a> {
    /// The chunk's bytes, exactly `chunksize` long.
    pub data: &'a [u8],
    /// True iff the store reported the chunk absent and this buffer was fabricated.
    pub created: bool,
}

/// Per-variable chunk cache. Mediates all reads and writes to `var`'s chunks
/// against `store`, holding a bounded LRU-ordered set of chunk buffers and
/// deferring writes until eviction or an explicit [`ChunkCache::flush`].
///
/// `var` is borrowed for the cache's lifetime: the cache never outlives the
/// variable it caches, by construction (see the ownership note in DESIGN.md).
pub struct ChunkCache<'v> {
    var: &'v VarMeta,
    ndims: usize,
    chunksize: u64,
    dimension_separator: char,
    maxentries: usize,
    fillchunk: Option<Vec<u8>>,
    index: IndexedLru<CacheEntry>,
    store: Arc<dyn ObjectStore>,
}

impl<'v> ChunkCache<'v> {
    /// Construct a cache for `var` against `store` (§4.4.6).
    ///
    /// `var.chunksize` must be nonzero and `var.dimension_separator` must be
    /// a legal Zarr v2 separator, or this fails with `InvalidArgument`.
    /// `maxentries` is derived from `var.chunk_cache_size / var.chunksize`,
    /// clamped to a minimum of 1.
    pub fn new(var: &'v VarMeta, store: Arc<dyn ObjectStore>) -> Result<Self, CacheError> {
        if var.chunksize == 0 {
            return Err(CacheError::invalid_argument("chunksize must be nonzero"));
        }
        if !is_legal_separator(var.dimension_separator) {
            return Err(CacheError::invalid_argument(format!(
                "illegal dimension separator: {:?}",
                var.dimension_separator
            )));
        }

        let maxentries = entries_for_budget(var.chunk_cache_size, var.chunksize);
        debug!(
            varkey = %var.varkey,
            chunksize = var.chunksize,
            maxentries,
            "constructed chunk cache"
        );

        Ok(Self {
            var,
            ndims: var.ndims,
            chunksize: var.chunksize,
            dimension_separator: var.dimension_separator,
            maxentries,
            fillchunk: None,
            index: IndexedLru::new(),
            store,
        })
    }

    /// Current entry capacity.
    pub fn maxentries(&self) -> usize {
        self.maxentries
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Read the chunk at `indices` (§4.4.1).
    ///
    /// On a cache hit, promotes the entry to most-recently-used and returns
    /// its buffer. On a miss, fetches from the store; a `NotFound` response
    /// is absorbed into fabrication (`created = true`), never surfaced as an
    /// error. The returned borrow is valid until the next mutating call on
    /// this cache.
    pub fn read(&mut self, indices: &[u64]) -> Result<ReadOutcome<'_>, CacheError> {
        debug_assert_eq!(indices.len(), self.ndims);
        let hkey = hash_indices(indices);

        if self.index.lookup(hkey).is_some() {
            self.index.touch(hkey);
            trace!(hkey, "cache hit on read");
            let entry = self.index.lookup(hkey).expect("just touched");
            return Ok(ReadOutcome {
                data: &entry.data,
                created: false,
            });
        }

        trace!(hkey, "cache miss on read");
        self.make_room()?;

        let key = build_chunk_path(self.var, indices)?;
        let path = key.object_path(self.dimension_separator);
        let mut entry = CacheEntry::zeroed(indices.to_vec(), key, hkey, self.chunksize as usize);

        let created = match self.store.read(&path, 0, self.chunksize as usize, &mut entry.data) {
            Ok(()) => {
                entry.modified = false;
                false
            }
            Err(StoreError::NotFound(_)) => {
                trace!(path = %path, "chunk absent on store, fabricating");
                self.fabricate(&mut entry.data);
                entry.modified = self.var.writable;
                true
            }
            Err(StoreError::Io(msg)) => {
                warn!(path = %path, error = %msg, "store read failed, discarding new entry");
                return Err(CacheError::Io(msg));
            }
        };

        self.index.insert(hkey, entry);
        let entry = self.index.lookup(hkey).expect("just inserted");
        Ok(ReadOutcome {
            data: &entry.data,
            created,
        })
    }

    /// Write (or begin writing) the chunk at `indices` (§4.4.2).
    ///
    /// Looks up an existing entry first; only on miss does it make room and
    /// create a fresh zeroed entry, without consulting the store (the caller
    /// intends to fully overwrite). The returned buffer is promoted to MRU
    /// and marked modified; the caller must populate it before any eviction.
    pub fn write(&mut self, indices: &[u64]) -> Result<&mut [u8], CacheError> {
        debug_assert_eq!(indices.len(), self.ndims);
        let hkey = hash_indices(indices);

        if self.index.lookup(hkey).is_none() {
            trace!(hkey, "cache miss on write, creating fresh entry");
            self.make_room()?;
            let key = build_chunk_path(self.var, indices)?;
            let entry = CacheEntry::zeroed(indices.to_vec(), key, hkey, self.chunksize as usize);
            self.index.insert(hkey, entry);
        }

        self.index.touch(hkey);
        let entry = self.index.lookup_mut(hkey).expect("just inserted or already present");
        entry.modified = true;
        Ok(&mut entry.data)
    }

    /// Evict entries until `len(index) < maxentries` (§4.4.3).
    ///
    /// Evicted entries with unpersisted writes are written back; an
    /// `IoError` from that write drops the entry (its buffer is reclaimed
    /// regardless) and propagates — make_room does not retry or re-insert.
    fn make_room(&mut self) -> Result<(), CacheError> {
        while self.index.len() >= self.maxentries {
            let (lru_hkey, _) = self.index.peek_lru().expect("len >= maxentries >= 1 implies non-empty");
            let lru_hkey = *lru_hkey;
            let entry = self.index.remove(lru_hkey).expect("peeked key must be present");

            if entry.modified {
                let path = entry.key.object_path(self.dimension_separator);
                trace!(path = %path, "evicting modified entry, writing back");
                self.store
                    .write(&path, 0, self.chunksize as usize, &entry.data)
                    .map_err(|e| match e {
                        StoreError::Io(msg) => {
                            warn!(path = %path, error = %msg, "eviction write-back failed");
                            CacheError::Io(msg)
                        }
                        StoreError::NotFound(_) => unreachable!("write never reports NotFound"),
                    })?;
            } else {
                trace!(hkey = lru_hkey, "evicting clean entry");
            }
        }
        Ok(())
    }

    /// Persist every modified entry (§4.4.4). Stops at the first `IoError`,
    /// leaving remaining entries' `modified` bits untouched. Does not evict.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        let hkeys: Vec<u64> = self.index.iter().map(|(k, _)| *k).collect();
        for hkey in hkeys {
            let (path, modified) = {
                let entry = self.index.lookup(hkey).expect("key collected from iter");
                (entry.key.object_path(self.dimension_separator), entry.modified)
            };
            if !modified {
                continue;
            }
            let entry = self.index.lookup(hkey).expect("key collected from iter");
            self.store
                .write(&path, 0, self.chunksize as usize, &entry.data)
                .map_err(|e| match e {
                    StoreError::Io(msg) => {
                        warn!(path = %path, error = %msg, "flush write failed, stopping early");
                        CacheError::Io(msg)
                    }
                    StoreError::NotFound(_) => unreachable!("write never reports NotFound"),
                })?;
            self.index.lookup_mut(hkey).expect("key collected from iter").modified = false;
        }
        Ok(())
    }

    /// Reshape the cache for a new byte budget and preemption value (§4.4.5).
    ///
    /// Drops `maxentries` to 0 and runs `make_room` (evicting everything,
    /// persisting modified entries per the usual policy) before raising it
    /// back to the new target, so the cache never silently exceeds the new
    /// bound. `preemption` is validated and stored but does not affect
    /// eviction order (reserved for a future weighted policy, see DESIGN.md).
    pub fn reconfigure(&mut self, new_cache_bytes: u64, preemption: f32) -> Result<(), CacheError> {
        if !(0.0..=1.0).contains(&preemption) {
            return Err(CacheError::invalid_argument(format!(
                "preemption must be in [0, 1], got {preemption}"
            )));
        }

        let old_maxentries = self.maxentries;
        self.maxentries = 0;
        let result = self.make_room();
        self.maxentries = entries_for_budget(new_cache_bytes, self.chunksize);
        self.fillchunk = None;

        debug!(
            varkey = %self.var.varkey,
            old_maxentries,
            new_maxentries = self.maxentries,
            preemption,
            "reconfigured chunk cache"
        );

        result
    }

    /// Drain every entry without write-back, discarding unflushed writes.
    /// Callers wanting durability must `flush` first; this mirrors the
    /// source's teardown semantics (§4.4.7) and is also what `Drop` does.
    fn destruct(&mut self) {
        let dropped = self.index.drain();
        let lost = dropped.iter().filter(|e| e.modified).count();
        if lost > 0 {
            warn!(
                varkey = %self.var.varkey,
                lost,
                "dropping chunk cache with unflushed modified entries"
            );
        }
        self.fillchunk = None;
    }

    fn fabricate(&mut self, buf: &mut [u8]) {
        if self.fillchunk.is_none() {
            self.fillchunk = self.var.fill_value.clone();
        }
        match &self.fillchunk {
            Some(fill) if fill.len() == buf.len() => buf.copy_from_slice(fill),
            _ => buf.fill(0),
        }
    }
}

impl<'v> Drop for ChunkCache<'v> {
    fn drop(&mut self) {
        self.destruct();
    }
}

/// `max(1, floor(budget / chunksize))`, the authoritative sizing rule shared
/// by `construct` and `reconfigure` (§4.4.5, §4.4.6). Entry-count hints on
/// `VarMeta` are advisory and never consulted here (see DESIGN.md).
fn entries_for_budget(budget_bytes: u64, chunksize: u64) -> usize {
    ((budget_bytes / chunksize.max(1)) as usize).max(1)
}
