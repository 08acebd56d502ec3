//! File Cache - An in-process cache of file contents
//!
//! Keeps recently read files in memory, re-reads them when they change on
//! disk or age out, and populates itself in the background.

pub mod cache;
pub mod config;
pub mod error;
mod file_cache;
pub mod tasks;

pub use cache::{CacheEntry, CacheStats, StalenessPolicy};
pub use config::{CacheConfig, GIGABYTE, KILOBYTE, MEGABYTE};
pub use error::{CacheError, Result};
pub use file_cache::{CachedRead, FileCache, ReadSource};
