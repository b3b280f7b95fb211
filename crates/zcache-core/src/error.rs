//! Error taxonomy for the chunk cache.

use thiserror::Error;

/// Errors that can surface from the chunk-key codec and the chunk cache façade.
///
/// `NotFound` is deliberately absent: it is an object-store outcome, not a cache
/// error, and is always absorbed by `read` into fabrication. `ChunkCreated` is
/// likewise not an error; it rides back as a flag alongside a successful read
/// (see `ReadOutcome` in the `zcache-engine` crate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// A bad separator, a zero chunk size, or an out-of-range preemption value.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Allocation of an entry buffer or container node failed.
    #[error("out of memory")]
    OutOfMemory,

    /// The object store reported a failure other than "not found".
    #[error("object store I/O error: {0}")]
    Io(String),
}

impl CacheError {
    /// Build a [`CacheError::InvalidArgument`] with a formatted message.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
