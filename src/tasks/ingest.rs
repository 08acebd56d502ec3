//! Ingestion Worker
//!
//! Single consumer of the bounded population queue.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::{populate, SharedStore};
use crate::config::CacheConfig;

/// Spawns the worker that caches every path received on `queue`.
///
/// Population failures are logged and dropped; background population is
/// best-effort. The task ends once every sender is dropped and the queue
/// has been drained.
pub fn spawn_ingest_worker(
    store: SharedStore,
    config: CacheConfig,
    mut queue: mpsc::Receiver<PathBuf>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Ingestion worker started");

        while let Some(path) = queue.recv().await {
            if let Err(err) = populate(&store, &config, &path).await {
                debug!(
                    path = %path.display(),
                    error = %err,
                    "Background population failed"
                );
            }
        }

        debug!("Ingestion queue closed, worker exiting");
    })
}
