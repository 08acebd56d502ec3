//! File Cache
//!
//! The caller-facing cache: lifecycle, read-through and write-through
//! access, and direct inspection of cached entries.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{
    populate, regular_file_metadata, CacheEntry, CacheStats, ItemStore, SharedStore,
    StalenessPolicy,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_ingest_worker, spawn_sweep_task};

// == Read Outcome ==
/// Where the bytes returned by a read came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// Served from a fresh cache entry
    Cache,
    /// Read from disk; the file has been queued for background population
    Filesystem,
}

/// File contents returned by [`FileCache::read_bytes`].
#[derive(Debug, Clone)]
pub struct CachedRead {
    pub content: Arc<[u8]>,
    pub source: ReadSource,
}

impl CachedRead {
    /// Returns true if the content was served from the cache.
    pub fn is_cached(&self) -> bool {
        self.source == ReadSource::Cache
    }
}

/// State that only exists while the cache is started.
#[derive(Debug)]
struct ActiveCache {
    store: SharedStore,
    queue: mpsc::Sender<PathBuf>,
    worker: JoinHandle<()>,
    sweeper: Option<JoinHandle<()>>,
}

// == File Cache ==
/// An in-memory cache of file contents.
///
/// A new cache is inert: every read goes straight to disk and nothing is
/// stored until [`start`](FileCache::start) is called.
#[derive(Debug)]
pub struct FileCache {
    config: CacheConfig,
    active: Option<ActiveCache>,
}

impl FileCache {
    // == Constructor ==
    /// Creates an inert cache with the given limits.
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// Returns the limits this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns true if the cache has been started.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    // == Lifecycle ==
    /// Allocates the store and starts the ingestion worker and sweep task.
    ///
    /// Starting an active cache stops it first, discarding every entry.
    /// Must be called from within a Tokio runtime.
    pub async fn start(&mut self) {
        if self.active.is_some() {
            self.stop().await;
        }

        let store: SharedStore = Arc::new(RwLock::new(ItemStore::new()));
        let (queue, pending) = mpsc::channel(self.config.effective_queue_capacity());
        let worker = spawn_ingest_worker(store.clone(), self.config, pending);
        let sweeper = spawn_sweep_task(Arc::downgrade(&store), self.config);

        info!(
            max_items = self.config.max_items,
            max_item_size = self.config.max_item_size,
            expire_seconds = self.config.expire_seconds,
            sweep_interval_seconds = self.config.sweep_interval_seconds,
            "File cache started"
        );

        self.active = Some(ActiveCache {
            store,
            queue,
            worker,
            sweeper,
        });
    }

    /// Shuts down the background tasks and empties the store.
    ///
    /// Population requests already queued are drained by the worker before it
    /// exits; both tasks have finished when this returns. Stopping an inert
    /// cache does nothing.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            debug!("Stop requested on an inactive file cache");
            return;
        };
        let ActiveCache {
            store,
            queue,
            worker,
            sweeper,
        } = active;

        if let Some(sweeper) = sweeper {
            sweeper.abort();
            let _ = sweeper.await;
        }

        drop(queue);
        if let Err(err) = worker.await {
            warn!(error = %err, "Ingestion worker ended abnormally");
        }

        store.write().await.clear();
        info!("File cache stopped");
    }

    fn store(&self) -> Option<&SharedStore> {
        self.active.as_ref().map(|active| &active.store)
    }

    // == Population ==
    /// Queues `path` for background population.
    ///
    /// Errors are not reported. If the store is already full, the oldest
    /// entry is evicted right away to make room. Waits only while the queue
    /// is full. Does nothing on an inert cache.
    pub async fn cache(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let Some(active) = self.active.as_ref() else {
            debug!(path = %path.display(), "Cache inactive, population skipped");
            return;
        };

        self.make_room(&active.store).await;
        if active.queue.send(path.to_path_buf()).await.is_err() {
            warn!(path = %path.display(), "Ingestion worker gone, population dropped");
        }
    }

    /// Caches `path` immediately in the caller's task and reports the outcome.
    pub async fn cache_now(&self, path: impl AsRef<Path>) -> Result<()> {
        let store = self.store().ok_or(CacheError::NotActive)?;
        self.make_room(store).await;
        populate(store, &self.config, path.as_ref()).await
    }

    async fn make_room(&self, store: &SharedStore) {
        let mut guard = store.write().await;
        if self.config.at_capacity(guard.len()) {
            if let Some(evicted) = guard.evict_oldest(true) {
                debug!(path = %evicted.display(), "Evicted oldest entry to make room");
            }
        }
    }

    /// Returns the entry for `path` if present and still fresh.
    ///
    /// A stale entry is removed on the way.
    async fn lookup_fresh(&self, store: &SharedStore, path: &Path) -> Option<CacheEntry> {
        let entry = store.read().await.get(path).cloned()?;
        let policy = StalenessPolicy::new(self.config.expire_seconds);
        if policy.check(path, &entry).await {
            if store.write().await.expire(path, &entry) {
                debug!(path = %path.display(), "Dropped stale entry on read");
            }
            return None;
        }
        Some(entry)
    }

    // == Read Through ==
    /// Reads `path`, from the cache when a fresh entry exists.
    ///
    /// Otherwise the file is queued for background population and read from
    /// disk; the result then carries [`ReadSource::Filesystem`]. Paths that
    /// are not regular files are rejected before being opened.
    pub async fn read_bytes(&self, path: impl AsRef<Path>) -> Result<CachedRead> {
        let path = path.as_ref();
        if let Some(store) = self.store() {
            if let Some(entry) = self.lookup_fresh(store, path).await {
                store.write().await.record_hit();
                return Ok(CachedRead {
                    content: entry.content,
                    source: ReadSource::Cache,
                });
            }
        }

        regular_file_metadata(path).await?;
        if let Some(store) = self.store() {
            store.write().await.record_miss();
        }
        self.cache(path).await;

        let content = tokio::fs::read(path).await?;
        Ok(CachedRead {
            content: content.into(),
            source: ReadSource::Filesystem,
        })
    }

    /// Same as [`read_bytes`](FileCache::read_bytes), decoded as UTF-8.
    pub async fn read_string(&self, path: impl AsRef<Path>) -> Result<(String, ReadSource)> {
        let read = self.read_bytes(path).await?;
        let text = std::str::from_utf8(&read.content)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?
            .to_owned();
        Ok((text, read.source))
    }

    // == Write Through ==
    /// Writes the contents of `path` to `sink`, from the cache when a fresh
    /// entry exists.
    ///
    /// Otherwise the file is queued for background population and streamed
    /// from disk. Directories are rejected with `ItemIsDirectory`, other
    /// non-regular files with `InvalidCacheItem`.
    pub async fn write_to<W>(&self, sink: &mut W, path: impl AsRef<Path>) -> Result<ReadSource>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let path = path.as_ref();
        if let Some(store) = self.store() {
            if let Some(entry) = self.lookup_fresh(store, path).await {
                store.write().await.record_hit();
                write_cached(sink, &entry).await?;
                return Ok(ReadSource::Cache);
            }
        }

        regular_file_metadata(path).await?;
        if let Some(store) = self.store() {
            store.write().await.record_miss();
        }
        self.cache(path).await;

        let mut file = tokio::fs::File::open(path).await?;
        tokio::io::copy(&mut file, sink)
            .await
            .map_err(copy_error)?;
        Ok(ReadSource::Filesystem)
    }

    /// Writes the cached entry for `path` to `sink` without touching disk.
    ///
    /// Fails with `ItemNotInCache` when there is no entry.
    pub async fn write_entry<W>(&self, sink: &mut W, path: impl AsRef<Path>) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let store = self.store().ok_or(CacheError::ItemNotInCache)?;
        let entry = store
            .read()
            .await
            .get(path.as_ref())
            .cloned()
            .ok_or(CacheError::ItemNotInCache)?;
        write_cached(sink, &entry).await
    }

    // == Inspection ==
    /// Cache-only lookup; never touches the filesystem.
    pub async fn get_entry_bytes(&self, path: impl AsRef<Path>) -> Option<Arc<[u8]>> {
        let store = self.store()?;
        let guard = store.read().await;
        guard.get(path.as_ref()).map(|entry| entry.content.clone())
    }

    /// Cache-only lookup returning text; invalid UTF-8 is replaced.
    pub async fn get_entry_string(&self, path: impl AsRef<Path>) -> Option<String> {
        let content = self.get_entry_bytes(path).await?;
        Some(String::from_utf8_lossy(&content).into_owned())
    }

    /// Returns true if an entry exists for `path`, fresh or not.
    pub async fn is_cached(&self, path: impl AsRef<Path>) -> bool {
        match self.store() {
            Some(store) => store.read().await.has(path.as_ref()),
            None => false,
        }
    }

    /// Removes the entry for `path`. Returns whether anything was removed.
    pub async fn remove(&self, path: impl AsRef<Path>) -> bool {
        match self.store() {
            Some(store) => store.write().await.delete(path.as_ref()).is_some(),
            None => false,
        }
    }

    /// Number of cached entries.
    pub async fn entry_count(&self) -> usize {
        match self.store() {
            Some(store) => store.read().await.len(),
            None => 0,
        }
    }

    /// Sum of the sizes of all cached entries.
    pub async fn total_cached_bytes(&self) -> u64 {
        match self.store() {
            Some(store) => store.read().await.total_bytes(),
            None => 0,
        }
    }

    /// Paths of every cached entry.
    pub async fn cached_keys(&self) -> HashSet<PathBuf> {
        match self.store() {
            Some(store) => store.read().await.keys(),
            None => HashSet::new(),
        }
    }

    /// Statistics since the last start; all zero when inert.
    pub async fn stats(&self) -> CacheStats {
        match self.store() {
            Some(store) => store.read().await.stats(),
            None => CacheStats::new(),
        }
    }
}

impl Default for FileCache {
    fn default() -> Self {
        Self::new(CacheConfig::DEFAULT)
    }
}

/// Writes a cached entry to `sink`.
///
/// Fails with `InvalidCacheItem` if the entry's size disagrees with its
/// content, and with `WriteIncomplete` if the sink stops accepting bytes
/// before `size` bytes were written.
async fn write_cached<W>(sink: &mut W, entry: &CacheEntry) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if !entry.is_consistent() {
        return Err(CacheError::InvalidCacheItem);
    }
    let mut written: u64 = 0;
    while written < entry.size {
        let n = sink.write(&entry.content[written as usize..]).await?;
        if n == 0 {
            return Err(CacheError::WriteIncomplete);
        }
        written += n as u64;
    }
    sink.flush().await?;
    Ok(())
}

fn copy_error(err: io::Error) -> CacheError {
    if err.kind() == io::ErrorKind::WriteZero {
        CacheError::WriteIncomplete
    } else {
        CacheError::Io(err)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Sink that accepts `limit` bytes and then reports zero-length writes.
    struct ShortSink {
        limit: usize,
        received: Vec<u8>,
    }

    impl AsyncWrite for ShortSink {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let room = self.limit - self.received.len();
            let n = room.min(buf.len());
            self.received.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn small_config() -> CacheConfig {
        CacheConfig {
            max_items: 4,
            max_item_size: 1024,
            expire_seconds: 0,
            sweep_interval_seconds: 0,
            queue_capacity: 4,
        }
    }

    #[tokio::test]
    async fn test_new_cache_is_inert() {
        let cache = FileCache::new(small_config());
        assert!(!cache.is_active());
        assert_eq!(cache.entry_count().await, 0);
        assert!(!cache.is_cached("/anything").await);
        assert!(matches!(
            cache.cache_now("/anything").await,
            Err(CacheError::NotActive)
        ));
    }

    #[tokio::test]
    async fn test_inert_cache_reads_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();

        let cache = FileCache::new(small_config());
        let read = cache.read_bytes(&path).await.unwrap();
        assert_eq!(&read.content[..], b"hello");
        assert_eq!(read.source, ReadSource::Filesystem);
    }

    #[tokio::test]
    async fn test_write_entry_short_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let mut cache = FileCache::new(small_config());
        cache.start().await;
        cache.cache_now(&path).await.unwrap();

        let mut sink = ShortSink {
            limit: 4,
            received: Vec::new(),
        };
        let result = cache.write_entry(&mut sink, &path).await;
        assert!(matches!(result, Err(CacheError::WriteIncomplete)));
        assert_eq!(sink.received, b"hell");

        cache.stop().await;
    }

    #[tokio::test]
    async fn test_write_to_short_sink_uncached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello world").unwrap();

        let cache = FileCache::new(small_config());
        let mut sink = ShortSink {
            limit: 4,
            received: Vec::new(),
        };
        let result = cache.write_to(&mut sink, &path).await;
        assert!(matches!(result, Err(CacheError::WriteIncomplete)));
    }

    #[tokio::test]
    async fn test_write_entry_rejects_inconsistent_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();

        let mut cache = FileCache::new(small_config());
        cache.start().await;
        cache.cache_now(&path).await.unwrap();
        {
            let store = cache.store().unwrap();
            let mut guard = store.write().await;
            let mut entry = guard.get(&path).unwrap().clone();
            entry.size += 1;
            guard.put(path.clone(), entry);
        }

        let mut sink = Vec::new();
        let result = cache.write_entry(&mut sink, &path).await;
        assert!(matches!(result, Err(CacheError::InvalidCacheItem)));
        assert!(sink.is_empty());

        cache.stop().await;
    }

    #[tokio::test]
    async fn test_write_to_rejects_inconsistent_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();

        let mut cache = FileCache::new(small_config());
        cache.start().await;
        cache.cache_now(&path).await.unwrap();
        {
            let store = cache.store().unwrap();
            let mut guard = store.write().await;
            let mut entry = guard.get(&path).unwrap().clone();
            entry.size -= 1;
            guard.put(path.clone(), entry);
        }

        let mut sink = Vec::new();
        let result = cache.write_to(&mut sink, &path).await;
        assert!(matches!(result, Err(CacheError::InvalidCacheItem)));
        assert!(sink.is_empty());

        cache.stop().await;
    }

    #[tokio::test]
    async fn test_read_string_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin");
        std::fs::write(&path, [0xff, 0xfe, 0xfd]).unwrap();

        let cache = FileCache::new(small_config());
        let result = cache.read_string(&path).await;
        match result {
            Err(CacheError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::InvalidData),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stop_then_start_gives_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();

        let mut cache = FileCache::new(small_config());
        cache.stop().await;
        cache.start().await;
        cache.cache_now(&path).await.unwrap();
        cache.start().await;

        assert!(cache.is_active());
        assert_eq!(cache.entry_count().await, 0);
        assert_eq!(cache.stats().await, CacheStats::new());
    }
}
