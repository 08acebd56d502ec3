//! Maintenance Sweep Task
//!
//! Background task that periodically purges stale entries and trims the
//! store back under its item ceiling.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{ItemStore, StalenessPolicy};
use crate::config::CacheConfig;

/// Entries removed by a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries dropped because they went stale
    pub expired: usize,
    /// Entries force-evicted to get back under `max_items`
    pub evicted: usize,
}

impl SweepReport {
    /// Total number of entries removed by the sweep.
    pub fn removed(&self) -> usize {
        self.expired + self.evicted
    }
}

/// Runs one maintenance pass over `store`.
///
/// Files are stat'ed without holding the lock; an entry re-populated while
/// the pass was running is left alone.
pub async fn sweep(store: &RwLock<ItemStore>, config: &CacheConfig) -> SweepReport {
    let policy = StalenessPolicy::new(config.expire_seconds);
    let snapshot = store.read().await.snapshot();

    let mut stale = Vec::new();
    for (path, entry) in snapshot {
        if policy.check(&path, &entry).await {
            stale.push((path, entry));
        }
    }

    let mut report = SweepReport::default();
    let mut guard = store.write().await;
    for (path, entry) in &stale {
        if guard.expire(path, entry) {
            report.expired += 1;
        }
    }
    while config.over_capacity(guard.len()) {
        if guard.evict_oldest(true).is_none() {
            break;
        }
        report.evicted += 1;
    }
    report
}

/// Spawns a background task that sweeps the store every
/// `sweep_interval_seconds`.
///
/// Returns `None` without spawning anything when the interval is 0. The task
/// only holds a weak reference to the store and exits on its own once the
/// store has been torn down; it can also be aborted through the handle.
pub fn spawn_sweep_task(
    store: Weak<RwLock<ItemStore>>,
    config: CacheConfig,
) -> Option<JoinHandle<()>> {
    if config.sweep_interval_seconds == 0 {
        debug!("Periodic sweep disabled");
        return None;
    }
    let interval = Duration::from_secs(config.sweep_interval_seconds);

    Some(tokio::spawn(async move {
        info!(
            "Starting cache sweep task with interval of {} seconds",
            config.sweep_interval_seconds
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(store) = store.upgrade() else {
                debug!("Cache store torn down, sweep task exiting");
                return;
            };
            let report = sweep(&store, &config).await;

            if report.removed() > 0 {
                info!(
                    expired = report.expired,
                    evicted = report.evicted,
                    "Cache sweep removed entries"
                );
            } else {
                debug!("Cache sweep: nothing to remove");
            }
        }
    }))
}
