//! Error types for the file cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the file cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Entry whose recorded size disagrees with its content, or a path that
    /// is not a regular file
    #[error("invalid cache item")]
    InvalidCacheItem,

    /// Population or write attempted against a directory
    #[error("can't cache a directory")]
    ItemIsDirectory,

    /// Nothing cached under the requested key
    #[error("item not in cache")]
    ItemNotInCache,

    /// File exceeds the configured maximum item size
    #[error("item too large for cache")]
    ItemTooLarge,

    /// The sink stopped accepting bytes before the item was written
    #[error("incomplete write of cache item")]
    WriteIncomplete,

    /// Synchronous population requested on a cache that was never started
    #[error("cache is not active")]
    NotActive,

    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Returns true for the informational "served from elsewhere" signal.
    pub fn is_not_in_cache(&self) -> bool {
        matches!(self, CacheError::ItemNotInCache)
    }
}

// == Result Type Alias ==
/// Convenience Result type for the file cache.
pub type Result<T> = std::result::Result<T, CacheError>;
