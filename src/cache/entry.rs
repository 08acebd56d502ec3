//! Cache Entry Module
//!
//! Defines a cached file's content together with its provenance timestamps.

use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

// == Cache Entry ==
/// A file's full contents as captured at population time.
///
/// Entries are never mutated in place; re-population replaces them wholesale.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The file contents
    pub content: Arc<[u8]>,
    /// Byte length of `content`
    pub size: u64,
    /// Filesystem modification time captured when the file was read
    pub modified_at: SystemTime,
    /// When the entry was (re)populated; reads do not refresh it
    pub last_access_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    ///
    /// # Arguments
    /// * `content` - The file contents
    /// * `modified_at` - Modification time reported by the filesystem
    pub fn new(content: Vec<u8>, modified_at: SystemTime) -> Self {
        Self::with_access_time(content, modified_at, Utc::now())
    }

    /// Creates a new entry with an explicit population time.
    pub fn with_access_time(
        content: Vec<u8>,
        modified_at: SystemTime,
        last_access_at: DateTime<Utc>,
    ) -> Self {
        let size = content.len() as u64;
        Self {
            content: content.into(),
            size,
            modified_at,
            last_access_at,
        }
    }

    // == Consistency ==
    /// Returns true if the recorded size matches the content length.
    pub fn is_consistent(&self) -> bool {
        self.size == self.content.len() as u64
    }

    /// Whole seconds elapsed since the entry was populated, truncated.
    pub fn age_seconds(&self, now: DateTime<Utc>) -> u64 {
        (now - self.last_access_at).num_seconds().max(0) as u64
    }
}
