//! Storage traits and error types
//!
//! This module defines the collaborator interfaces the crawl loop persists
//! through, and the error type they share.

use crate::record::{ExtractedRecord, IdentityHash};
use crate::url::CrawlUrl;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Named record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    ImageMetadata,
}

impl Collection {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::ImageMetadata => "image_metadata",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "products" => Some(Self::Products),
            "image_metadata" => Some(Self::ImageMetadata),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// A record as held by a [`RecordStore`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub record: ExtractedRecord,
    /// Where the image bytes live once resolved
    pub blob_locator: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Persisted crawl progress, scoped by shop base URL
pub trait ProgressStore {
    /// Loads every URL already visited for the shop
    fn load_visited(&self, shop: &CrawlUrl) -> StorageResult<HashSet<CrawlUrl>>;

    /// Records a visited URL; it leaves the shop's pending set if it was there
    fn mark_visited(&mut self, shop: &CrawlUrl, url: &CrawlUrl, at: DateTime<Utc>) -> StorageResult<()>;

    /// Loads discovered-but-unvisited URLs in discovery order
    fn load_pending(&self, shop: &CrawlUrl) -> StorageResult<Vec<CrawlUrl>>;

    /// Adds URLs to the shop's pending set; known URLs are ignored
    fn record_pending(&mut self, shop: &CrawlUrl, urls: &[CrawlUrl]) -> StorageResult<()>;

    /// Forgets all progress for the shop
    fn reset(&mut self, shop: &CrawlUrl) -> StorageResult<()>;

    fn count_visited(&self, shop: &CrawlUrl) -> StorageResult<u64>;

    fn count_pending(&self, shop: &CrawlUrl) -> StorageResult<u64>;
}

/// Record persistence keyed by identity hash
pub trait RecordStore {
    fn find_by_identity(
        &self,
        collection: Collection,
        hash: &IdentityHash,
    ) -> StorageResult<Option<StoredRecord>>;

    /// Inserts or replaces the record stored under `hash`
    ///
    /// Must be a single atomic statement so that concurrent crawls writing the
    /// same identity never duplicate it.
    fn upsert(
        &mut self,
        collection: Collection,
        hash: &IdentityHash,
        record: &ExtractedRecord,
    ) -> StorageResult<()>;

    fn set_blob_locator(
        &mut self,
        collection: Collection,
        hash: &IdentityHash,
        locator: &str,
    ) -> StorageResult<()>;

    /// Image records whose bytes have not been downloaded yet, oldest first
    fn images_without_blob(&self, limit: Option<usize>) -> StorageResult<Vec<StoredRecord>>;

    fn count(&self, collection: Collection) -> StorageResult<u64>;

    /// Number of records in the collection with a blob locator
    fn count_with_blob(&self, collection: Collection) -> StorageResult<u64>;
}

/// Binary storage for image bytes
pub trait BlobStore {
    /// Saves the bytes and returns a locator that [`BlobStore::load`] accepts
    fn save(&self, bytes: &[u8], hash: &IdentityHash) -> StorageResult<String>;

    fn load(&self, locator: &str) -> StorageResult<Vec<u8>>;
}

/// Everything a crawl loop persists through
pub trait CrawlStore: ProgressStore + RecordStore + Send {}

impl<T: ProgressStore + RecordStore + Send> CrawlStore for T {}
