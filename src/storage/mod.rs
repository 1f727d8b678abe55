//! Storage module for persisting crawl data
//!
//! This module handles everything a crawl writes down:
//! - Per-shop progress (visited and pending URLs) for resumption
//! - Extracted records keyed by identity hash
//! - Deduplication of records against what is already stored
//! - Image bytes, downloaded lazily into a blob store

mod blob;
mod dedup;
mod schema;
mod sqlite;
mod traits;

pub use blob::{ImageResolver, LocalBlobStore, ResolveSummary};
pub use dedup::{DedupCounters, Deduplicator, Verdict};
pub use sqlite::SqliteStorage;
pub use traits::{
    BlobStore, Collection, CrawlStore, ProgressStore, RecordStore, StorageError, StorageResult,
    StoredRecord,
};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    SqliteStorage::new(path)
}
