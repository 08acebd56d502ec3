//! Staleness Policy
//!
//! Decides whether a stored entry can still be trusted.

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};

use crate::cache::CacheEntry;

/// Entry freshness rules: changed on disk, or aged past `expire_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    /// Maximum age in seconds, 0 disables age-based expiry
    pub expire_seconds: u64,
}

impl StalenessPolicy {
    /// Creates a policy; `expire_seconds` of 0 disables age-based expiry.
    pub fn new(expire_seconds: u64) -> Self {
        Self { expire_seconds }
    }

    /// Returns true if the file vanished, could not be stat'ed, or its
    /// modification time no longer matches the one captured at population.
    ///
    /// `live_modified` is `None` when the stat failed.
    pub fn changed_on_disk(&self, entry: &CacheEntry, live_modified: Option<SystemTime>) -> bool {
        match live_modified {
            Some(modified) => modified != entry.modified_at,
            None => true,
        }
    }

    /// Returns true if the entry is at least `expire_seconds` old.
    ///
    /// Always false when age-based expiry is disabled.
    pub fn aged_out(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        self.expire_seconds != 0 && entry.age_seconds(now) >= self.expire_seconds
    }

    /// Combined rule. The on-disk check has priority over age.
    pub fn is_expired(
        &self,
        entry: &CacheEntry,
        live_modified: Option<SystemTime>,
        now: DateTime<Utc>,
    ) -> bool {
        self.changed_on_disk(entry, live_modified) || self.aged_out(entry, now)
    }

    /// Stats `path` and applies the combined rule at the current time.
    pub async fn check(&self, path: &Path, entry: &CacheEntry) -> bool {
        let live_modified = live_modified(path).await;
        self.is_expired(entry, live_modified, Utc::now())
    }
}

/// Current modification time of `path`, or `None` if it cannot be read.
async fn live_modified(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path)
        .await
        .and_then(|meta| meta.modified())
        .ok()
}
