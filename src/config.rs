//! Configuration Module
//!
//! Limits and timings for a [`FileCache`](crate::FileCache), loadable from
//! environment variables or any serde source.

use std::env;

use serde::Deserialize;

/// One kilobyte, for use with `max_item_size`.
pub const KILOBYTE: u64 = 1024;
/// One megabyte.
pub const MEGABYTE: u64 = 1024 * KILOBYTE;
/// One gigabyte.
pub const GIGABYTE: u64 = 1024 * MEGABYTE;

/// Cache configuration parameters.
///
/// All values are read-only once the cache is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of files to cache (0 = no count ceiling)
    pub max_items: usize,
    /// Maximum size in bytes of a single cached file
    pub max_item_size: u64,
    /// Seconds an entry may stay cached after population (0 = never expire by age)
    pub expire_seconds: u64,
    /// Seconds between maintenance sweeps (0 = no periodic sweep)
    pub sweep_interval_seconds: u64,
    /// Number of population requests buffered for the ingestion worker
    pub queue_capacity: usize,
}

impl CacheConfig {
    /// The stock configuration: 32 files of up to 32 MB, expired after five
    /// minutes, swept once a minute.
    pub const DEFAULT: CacheConfig = CacheConfig {
        max_items: 32,
        max_item_size: 32 * MEGABYTE,
        expire_seconds: 300,
        sweep_interval_seconds: 60,
        queue_capacity: 4,
    };

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `FILECACHE_MAX_ITEMS` - Maximum cached files (default: 32)
    /// - `FILECACHE_MAX_ITEM_SIZE` - Maximum file size in bytes (default: 32 MB)
    /// - `FILECACHE_EXPIRE_SECONDS` - Entry lifetime in seconds (default: 300)
    /// - `FILECACHE_SWEEP_INTERVAL` - Sweep period in seconds (default: 60)
    /// - `FILECACHE_QUEUE_CAPACITY` - Population queue size (default: 4)
    pub fn from_env() -> Self {
        let defaults = Self::DEFAULT;
        Self {
            max_items: env_or("FILECACHE_MAX_ITEMS", defaults.max_items),
            max_item_size: env_or("FILECACHE_MAX_ITEM_SIZE", defaults.max_item_size),
            expire_seconds: env_or("FILECACHE_EXPIRE_SECONDS", defaults.expire_seconds),
            sweep_interval_seconds: env_or(
                "FILECACHE_SWEEP_INTERVAL",
                defaults.sweep_interval_seconds,
            ),
            queue_capacity: env_or("FILECACHE_QUEUE_CAPACITY", defaults.queue_capacity),
        }
    }

    /// Queue capacity as used by the ingestion channel, which needs at least one slot.
    pub(crate) fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }

    /// Returns true if the store has reached the configured item ceiling.
    pub(crate) fn at_capacity(&self, count: usize) -> bool {
        self.max_items != 0 && count >= self.max_items
    }

    /// Returns true if the store holds more entries than allowed.
    pub(crate) fn over_capacity(&self, count: usize) -> bool {
        self.max_items != 0 && count > self.max_items
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn env_or<T: std::str::FromStr>(name: &str, fallback: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}
