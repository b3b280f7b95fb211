//! Cache entries and the hash used to key them in the indexed LRU.

use ahash::AHasher;
use std::hash::Hasher;

use zcache_core::ChunkKey;

/// Hash a chunk-index tuple into the 64-bit key the indexed LRU uses.
///
/// Any two distinct index tuples of the same rank are overwhelmingly likely
/// to hash to distinct keys; this is a lookup accelerator, not a content
/// digest, so collision resistance beyond birthday-bound avoidance is not a
/// design goal.
pub fn hash_indices(indices: &[u64]) -> u64 {
    let mut hasher = AHasher::default();
    for idx in indices {
        hasher.write_u64(*idx);
    }
    hasher.finish()
}

/// One cached chunk: its index tuple, its object-store key, the 64-bit
/// lookup key, the buffer itself, and whether it has unpersisted writes.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Chunk-index tuple (length equals the owning cache's `ndims`).
    pub indices: Vec<u64>,
    /// Object-store address for this chunk.
    pub key: ChunkKey,
    /// 64-bit digest of `indices`; the indexed LRU's lookup key.
    pub hashkey: u64,
    /// Chunk bytes, always exactly `chunksize` long for a live entry.
    pub data: Vec<u8>,
    /// True iff `data` diverges from what's on the object store.
    pub modified: bool,
}

impl CacheEntry {
    /// Build a fresh entry with a zeroed buffer of `chunksize` bytes.
    pub fn zeroed(indices: Vec<u64>, key: ChunkKey, hashkey: u64, chunksize: usize) -> Self {
        Self {
            indices,
            key,
            hashkey,
            data: vec![0u8; chunksize],
            modified: false,
        }
    }

    /// Validate the cache's data-model invariants for this entry (used in tests
    /// and debug assertions): buffer length matches `chunksize`, and the stored
    /// hash key matches a fresh hash of `indices`.
    pub fn check_invariants(&self, chunksize: usize) -> bool {
        self.data.len() == chunksize && self.hashkey == hash_indices(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_tuples_hash_differently_with_overwhelming_probability() {
        let a = hash_indices(&[1, 2, 3]);
        let b = hash_indices(&[1, 2, 4]);
        let c = hash_indices(&[3, 2, 1]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn same_tuple_hashes_identically() {
        assert_eq!(hash_indices(&[7, 8]), hash_indices(&[7, 8]));
    }

    #[test]
    fn entry_invariants_hold_for_zeroed_entry() {
        let key = ChunkKey {
            varkey: "v".into(),
            chunkkey: "0.0".into(),
        };
        let entry = CacheEntry::zeroed(vec![0, 0], key, hash_indices(&[0, 0]), 16);
        assert!(entry.check_invariants(16));
        assert_eq!(entry.data.len(), 16);
        assert!(!entry.modified);
    }
}
