//! btcdata core: keeps a daily Bitcoin feature dataset current.
//!
//! This crate contains:
//! - Source traits and adapters (Yahoo Finance series, HTTP scalar endpoints)
//! - The persisted date-keyed table and its CSV format
//! - The incremental synchronizer (gap detection, reconciliation, append)
//! - Feed configuration and an in-process TTL dataset cache

pub mod cache;
pub mod config;
pub mod data;
pub mod dataset;
pub mod sync;

pub use cache::DatasetCache;
pub use config::{ConfigError, SyncConfig};
pub use dataset::{Dataset, DatasetError, Row, Value};
pub use sync::{LastUpdate, SyncError, SyncOutcome, SyncState, Synchronizer};
