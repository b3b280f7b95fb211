//! zcache-engine: the per-variable chunk cache.
//!
//! For each open variable, a [`ChunkCache`] holds a bounded, LRU-ordered set
//! of fixed-size chunk buffers, mediates reads and writes against a
//! pluggable [`ObjectStore`], defers writes until eviction or an explicit
//! [`ChunkCache::flush`], and fabricates chunks absent from the backing
//! store.
//!
//! ```text
//! user ↔ ChunkCache ↔ (IndexedLru ↔ CacheEntry) ↔ ObjectStore
//! ```
//!
//! `zcache-core` supplies the vocabulary (`VarMeta`, `ChunkKey`,
//! `CacheError`, `CacheSettings`); this crate supplies the container, the
//! façade, and two `ObjectStore` adapters.

pub mod cache;
pub mod entry;
pub mod indexed_lru;
pub mod store;

pub use cache::{ChunkCache, ReadOutcome};
pub use entry::{hash_indices, CacheEntry};
pub use indexed_lru::IndexedLru;
pub use store::{FsObjectStore, MemoryObjectStore, ObjectStore, StoreError};
