//! Item Store Module
//!
//! Plain keyed storage for cache entries plus running statistics. Freshness
//! and capacity decisions are layered on top by the staleness policy, the
//! population path and the sweep task.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::cache::{lru, CacheEntry, CacheStats};

// == Item Store ==
/// Map from file path to cached entry.
#[derive(Debug, Default)]
pub struct ItemStore {
    /// Cached entries keyed by path
    items: HashMap<PathBuf, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
}

impl ItemStore {
    // == Constructor ==
    /// Creates an empty store with zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Returns the entry stored under `key`, without any freshness check.
    pub fn get(&self, key: &Path) -> Option<&CacheEntry> {
        self.items.get(key)
    }

    // == Put ==
    /// Stores `entry` under `key`, returning the entry it replaced.
    pub fn put(&mut self, key: PathBuf, entry: CacheEntry) -> Option<CacheEntry> {
        self.items.insert(key, entry)
    }

    // == Delete ==
    /// Removes the entry stored under `key`.
    pub fn delete(&mut self, key: &Path) -> Option<CacheEntry> {
        self.items.remove(key)
    }

    /// Returns true if an entry is stored under `key`.
    pub fn has(&self, key: &Path) -> bool {
        self.items.contains_key(key)
    }

    // == Length ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the sizes of all stored entries.
    pub fn total_bytes(&self) -> u64 {
        self.items.values().map(|entry| entry.size).sum()
    }

    /// Returns every stored key.
    pub fn keys(&self) -> HashSet<PathBuf> {
        self.items.keys().cloned().collect()
    }

    /// Copies out every entry so callers can stat files without holding a lock.
    ///
    /// Content is shared, so this does not duplicate file bytes.
    pub fn snapshot(&self) -> Vec<(PathBuf, CacheEntry)> {
        self.items
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect()
    }

    /// Drops every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    // == Expire ==
    /// Removes `key` as stale, provided it still holds the entry `seen` was
    /// taken from. Returns false if the entry is gone or was re-populated
    /// in the meantime.
    pub fn expire(&mut self, key: &Path, seen: &CacheEntry) -> bool {
        let same_generation = self.items.get(key).is_some_and(|current| {
            current.last_access_at == seen.last_access_at && current.modified_at == seen.modified_at
        });
        if same_generation {
            self.items.remove(key);
            self.stats.record_expiration();
        }
        same_generation
    }

    // == Evict Oldest ==
    /// Removes the least recently populated entry and returns its key.
    ///
    /// See [`lru::select_oldest`] for the meaning of `force`.
    pub fn evict_oldest(&mut self, force: bool) -> Option<PathBuf> {
        let key = lru::select_oldest(&self.items, force, Utc::now())?;
        self.items.remove(&key);
        self.stats.record_eviction();
        Some(key)
    }

    // == Read Accounting ==
    /// Records a read served from the cache.
    pub fn record_hit(&mut self) {
        self.stats.record_hit();
    }

    /// Records a read that fell through to the filesystem.
    pub fn record_miss(&mut self) {
        self.stats.record_miss();
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.items.len();
        stats.total_bytes = self.total_bytes();
        stats
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::time::SystemTime;

    fn entry(content: &[u8]) -> CacheEntry {
        CacheEntry::new(content.to_vec(), SystemTime::now())
    }

    fn aged_entry(content: &[u8], age_secs: i64) -> CacheEntry {
        CacheEntry::with_access_time(
            content.to_vec(),
            SystemTime::now(),
            Utc::now() - Duration::seconds(age_secs),
        )
    }

    #[test]
    fn test_store_new() {
        let store = ItemStore::new();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.total_bytes(), 0);
    }

    #[test]
    fn test_store_put_and_get() {
        let mut store = ItemStore::new();
        store.put(PathBuf::from("/a"), entry(b"alpha"));

        let found = store.get(Path::new("/a")).unwrap();
        assert_eq!(&found.content[..], b"alpha");
        assert!(store.has(Path::new("/a")));
        assert!(!store.has(Path::new("/b")));
    }

    #[test]
    fn test_store_put_replaces() {
        let mut store = ItemStore::new();
        store.put(PathBuf::from("/a"), entry(b"one"));
        let replaced = store.put(PathBuf::from("/a"), entry(b"three"));

        assert_eq!(&replaced.unwrap().content[..], b"one");
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 5);
    }

    #[test]
    fn test_store_delete() {
        let mut store = ItemStore::new();
        store.put(PathBuf::from("/a"), entry(b"alpha"));

        assert!(store.delete(Path::new("/a")).is_some());
        assert!(store.delete(Path::new("/a")).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_keys_and_total_bytes() {
        let mut store = ItemStore::new();
        store.put(PathBuf::from("/a"), entry(b"12345"));
        store.put(PathBuf::from("/b"), entry(b"123"));

        let keys = store.keys();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(Path::new("/a")));
        assert!(keys.contains(Path::new("/b")));
        assert_eq!(store.total_bytes(), 8);
    }

    #[test]
    fn test_evict_oldest_removes_least_recent() {
        let mut store = ItemStore::new();
        store.put(PathBuf::from("/new"), aged_entry(b"n", 1));
        store.put(PathBuf::from("/old"), aged_entry(b"o", 100));
        store.put(PathBuf::from("/mid"), aged_entry(b"m", 50));

        assert_eq!(store.evict_oldest(true), Some(PathBuf::from("/old")));
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_evict_oldest_empty() {
        let mut store = ItemStore::new();
        assert_eq!(store.evict_oldest(true), None);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_expire_skips_repopulated_entry() {
        let mut store = ItemStore::new();
        let old = aged_entry(b"old", 10);
        store.put(PathBuf::from("/a"), old.clone());
        store.put(PathBuf::from("/a"), entry(b"new"));

        assert!(!store.expire(Path::new("/a"), &old));
        assert!(store.has(Path::new("/a")));

        let current = store.get(Path::new("/a")).unwrap().clone();
        assert!(store.expire(Path::new("/a"), &current));
        assert!(!store.has(Path::new("/a")));
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_clear_keeps_stats() {
        let mut store = ItemStore::new();
        store.put(PathBuf::from("/a"), entry(b"alpha"));
        store.record_hit();
        store.clear();

        let stats = store.stats();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_bytes, 0);
        assert_eq!(stats.hits, 1);
    }
}
