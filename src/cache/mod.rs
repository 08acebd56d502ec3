//! Cache Module
//!
//! The item store and the policies layered on it: staleness checks, LRU
//! eviction and file population.

mod entry;
pub mod lru;
mod populate;
mod staleness;
mod stats;
mod store;


use std::sync::Arc;

use tokio::sync::RwLock;

// Re-export public types
pub use entry::CacheEntry;
pub use populate::populate;
pub use staleness::StalenessPolicy;
pub use stats::CacheStats;
pub use store::ItemStore;

pub(crate) use populate::{admit, regular_file_metadata};

/// The store as shared between the caller, the ingestion worker and the sweep task.
pub type SharedStore = Arc<RwLock<ItemStore>>;
