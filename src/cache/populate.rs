//! Population
//!
//! Reads a file from disk and inserts it into the store, shared by the
//! background ingestion worker and synchronous `cache_now` calls.

use std::fs::Metadata;
use std::path::Path;

use tokio::io::AsyncReadExt;
use tracing::{debug, trace};

use crate::cache::{CacheEntry, ItemStore, SharedStore, StalenessPolicy};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

/// Caches `path` unless a fresh entry is already present.
///
/// A stale entry is dropped before the file is re-read. Directories, other
/// non-regular files and files larger than `max_item_size` are rejected and
/// leave the store untouched.
pub async fn populate(store: &SharedStore, config: &CacheConfig, path: &Path) -> Result<()> {
    let policy = StalenessPolicy::new(config.expire_seconds);

    let existing = store.read().await.get(path).cloned();
    if let Some(entry) = existing {
        if !policy.check(path, &entry).await {
            trace!(path = %path.display(), "already cached");
            return Ok(());
        }
        if store.write().await.expire(path, &entry) {
            debug!(path = %path.display(), "dropped stale entry before re-population");
        }
    }

    let metadata = regular_file_metadata(path).await?;
    if metadata.len() > config.max_item_size {
        return Err(CacheError::ItemTooLarge);
    }
    let modified_at = metadata.modified()?;

    let content = read_capped(path, metadata.len(), config.max_item_size).await?;

    let entry = CacheEntry::new(content, modified_at);
    let size = entry.size;
    let evicted = admit(&mut *store.write().await, config, path, entry);
    debug!(path = %path.display(), size, evicted, "cached file");
    Ok(())
}

// == Regular File Check ==
/// Stats `path` and fails unless it is a regular file.
///
/// Directories give `ItemIsDirectory`; FIFOs, sockets and devices give
/// `InvalidCacheItem`, since opening or reading them can block indefinitely.
pub(crate) async fn regular_file_metadata(path: &Path) -> Result<Metadata> {
    let metadata = tokio::fs::metadata(path).await?;
    if metadata.is_dir() {
        return Err(CacheError::ItemIsDirectory);
    }
    if !metadata.is_file() {
        return Err(CacheError::InvalidCacheItem);
    }
    Ok(metadata)
}

/// Reads at most `limit` bytes of `path`.
///
/// The file may have grown since it was stat'ed; anything past `limit` fails
/// with `ItemTooLarge` without being buffered.
async fn read_capped(path: &Path, expected_len: u64, limit: u64) -> Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut content = Vec::with_capacity(expected_len.min(limit) as usize);
    file.take(limit.saturating_add(1))
        .read_to_end(&mut content)
        .await?;
    if content.len() as u64 > limit {
        return Err(CacheError::ItemTooLarge);
    }
    Ok(content)
}

/// Inserts `entry`, force-evicting the oldest entries first if a new key
/// would push the store past `max_items`. Returns how many were evicted.
pub(crate) fn admit(
    store: &mut ItemStore,
    config: &CacheConfig,
    path: &Path,
    entry: CacheEntry,
) -> usize {
    let mut evicted = 0;
    if !store.has(path) {
        while config.at_capacity(store.len()) {
            if store.evict_oldest(true).is_none() {
                break;
            }
            evicted += 1;
        }
    }
    store.put(path.to_path_buf(), entry);
    evicted
}
