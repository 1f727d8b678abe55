//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the progress and
//! record store traits. Each crawl task opens its own connection; WAL mode and
//! a busy timeout let several of them write to one database file.

use crate::record::{ExtractedRecord, IdentityHash, Serializable};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    Collection, ProgressStore, RecordStore, StorageResult, StoredRecord,
};
use crate::url::CrawlUrl;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits for another connection's lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn parse_stored_url(raw: String) -> Option<CrawlUrl> {
    match CrawlUrl::parse(&raw) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!("Ignoring unparsable stored URL {}: {}", raw, e);
            None
        }
    }
}

type RawRecordRow = (String, Option<String>, String, String);

fn into_stored(row: RawRecordRow) -> StorageResult<StoredRecord> {
    let (body, blob_locator, created_at, updated_at) = row;
    Ok(StoredRecord {
        record: ExtractedRecord::from_document(&body)?,
        blob_locator,
        created_at,
        updated_at,
    })
}

impl ProgressStore for SqliteStorage {
    fn load_visited(&self, shop: &CrawlUrl) -> StorageResult<HashSet<CrawlUrl>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM visited_urls WHERE shop = ?1")?;

        let urls = stmt
            .query_map(params![shop.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(urls.into_iter().filter_map(parse_stored_url).collect())
    }

    fn mark_visited(&mut self, shop: &CrawlUrl, url: &CrawlUrl, at: DateTime<Utc>) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR IGNORE INTO visited_urls (shop, url, visited_at) VALUES (?1, ?2, ?3)",
            params![shop.as_str(), url.as_str(), at.to_rfc3339()],
        )?;
        tx.execute(
            "DELETE FROM pending_urls WHERE shop = ?1 AND url = ?2",
            params![shop.as_str(), url.as_str()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn load_pending(&self, shop: &CrawlUrl) -> StorageResult<Vec<CrawlUrl>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM pending_urls WHERE shop = ?1 ORDER BY id")?;

        let urls = stmt
            .query_map(params![shop.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(urls.into_iter().filter_map(parse_stored_url).collect())
    }

    fn record_pending(&mut self, shop: &CrawlUrl, urls: &[CrawlUrl]) -> StorageResult<()> {
        if urls.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO pending_urls (shop, url, discovered_at)
                 SELECT ?1, ?2, ?3
                 WHERE NOT EXISTS (SELECT 1 FROM visited_urls WHERE shop = ?1 AND url = ?2)",
            )?;
            for url in urls {
                stmt.execute(params![shop.as_str(), url.as_str(), now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn reset(&mut self, shop: &CrawlUrl) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM visited_urls WHERE shop = ?1", params![shop.as_str()])?;
        tx.execute("DELETE FROM pending_urls WHERE shop = ?1", params![shop.as_str()])?;
        tx.commit()?;
        Ok(())
    }

    fn count_visited(&self, shop: &CrawlUrl) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM visited_urls WHERE shop = ?1",
            params![shop.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_pending(&self, shop: &CrawlUrl) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pending_urls WHERE shop = ?1",
            params![shop.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl RecordStore for SqliteStorage {
    fn find_by_identity(
        &self,
        collection: Collection,
        hash: &IdentityHash,
    ) -> StorageResult<Option<StoredRecord>> {
        let row: Option<RawRecordRow> = self
            .conn
            .query_row(
                "SELECT body, blob_locator, created_at, updated_at FROM records
                 WHERE collection = ?1 AND identity_hash = ?2",
                params![collection.to_db_string(), hash.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        row.map(into_stored).transpose()
    }

    fn upsert(
        &mut self,
        collection: Collection,
        hash: &IdentityHash,
        record: &ExtractedRecord,
    ) -> StorageResult<()> {
        let body = record.to_document()?;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO records
                (collection, identity_hash, kind, source_url, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(collection, identity_hash) DO UPDATE SET
                kind = excluded.kind,
                source_url = excluded.source_url,
                body = excluded.body,
                updated_at = excluded.updated_at",
            params![
                collection.to_db_string(),
                hash.as_str(),
                record.kind(),
                record.source_url().as_str(),
                body,
                now
            ],
        )?;
        Ok(())
    }

    fn set_blob_locator(
        &mut self,
        collection: Collection,
        hash: &IdentityHash,
        locator: &str,
    ) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE records SET blob_locator = ?1, updated_at = ?2
             WHERE collection = ?3 AND identity_hash = ?4",
            params![
                locator,
                Utc::now().to_rfc3339(),
                collection.to_db_string(),
                hash.as_str()
            ],
        )?;
        Ok(())
    }

    fn images_without_blob(&self, limit: Option<usize>) -> StorageResult<Vec<StoredRecord>> {
        // A negative LIMIT means no limit in SQLite
        let limit = limit.map_or(-1, |n| n as i64);

        let mut stmt = self.conn.prepare(
            "SELECT body, blob_locator, created_at, updated_at FROM records
             WHERE collection = ?1 AND blob_locator IS NULL
             ORDER BY created_at, identity_hash
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(
                params![Collection::ImageMetadata.to_db_string(), limit],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?
            .collect::<Result<Vec<RawRecordRow>, _>>()?;

        rows.into_iter().map(into_stored).collect()
    }

    fn count(&self, collection: Collection) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![collection.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_with_blob(&self, collection: Collection) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1 AND blob_locator IS NOT NULL",
            params![collection.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
