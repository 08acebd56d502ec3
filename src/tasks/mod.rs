//! Background Tasks Module
//!
//! Contains the tasks that run alongside an active cache.
//!
//! # Tasks
//! - Ingestion: drains the population queue and caches files
//! - Sweep: removes stale entries and enforces the item ceiling at configured intervals

mod ingest;
mod sweep;

pub use ingest::spawn_ingest_worker;
pub use sweep::{spawn_sweep_task, sweep, SweepReport};
