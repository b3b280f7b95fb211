//! zcache-core: shared types, the chunk-key codec, and the error taxonomy
//! for the per-variable chunk cache.
//!
//! This crate has no dependency on any particular object-store backend or
//! on the cache engine itself (see `zcache-engine`); it is the vocabulary
//! both sides agree on.

pub mod config;
pub mod error;
pub mod key;
pub mod types;

pub use config::CacheSettings;
pub use error::CacheError;
pub use key::{build_chunk_key, build_chunk_path, ChunkKey};
pub use types::{is_legal_separator, ChunkIndices, VarMeta, LEGAL_SEPARATORS};
