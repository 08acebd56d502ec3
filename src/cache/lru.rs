//! LRU Eviction Module
//!
//! Picks the least recently populated entry when the store must shrink.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::cache::CacheEntry;

// == Select Oldest ==
/// Returns the key of the entry with the smallest `last_access_at`.
///
/// Ties resolve to the smallest key so that exactly one, predictable entry is
/// chosen. Without `force`, only entries strictly older than `now` are
/// candidates; entries populated in the same instant may then all be skipped.
/// With `force`, some key is returned whenever `entries` is non-empty.
pub fn select_oldest<'a, I>(entries: I, force: bool, now: DateTime<Utc>) -> Option<PathBuf>
where
    I: IntoIterator<Item = (&'a PathBuf, &'a CacheEntry)>,
{
    entries
        .into_iter()
        .filter(|(_, entry)| force || entry.last_access_at < now)
        .min_by(|(a_key, a), (b_key, b)| {
            a.last_access_at
                .cmp(&b.last_access_at)
                .then_with(|| a_key.as_path().cmp(b_key.as_path()))
        })
        .map(|(key, _)| key.clone())
}
