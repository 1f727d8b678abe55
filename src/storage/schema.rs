//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Shoptrawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- URLs already processed, per shop base URL
CREATE TABLE IF NOT EXISTS visited_urls (
    shop TEXT NOT NULL,
    url TEXT NOT NULL,
    visited_at TEXT NOT NULL,
    PRIMARY KEY (shop, url)
);

-- Discovered URLs not yet visited, in discovery order
CREATE TABLE IF NOT EXISTS pending_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    shop TEXT NOT NULL,
    url TEXT NOT NULL,
    discovered_at TEXT NOT NULL,
    UNIQUE(shop, url)
);

CREATE INDEX IF NOT EXISTS idx_pending_shop ON pending_urls(shop);

-- Extracted records keyed by identity hash
CREATE TABLE IF NOT EXISTS records (
    collection TEXT NOT NULL,
    identity_hash TEXT NOT NULL,
    kind TEXT NOT NULL,
    source_url TEXT NOT NULL,
    body TEXT NOT NULL,
    blob_locator TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, identity_hash)
);

CREATE INDEX IF NOT EXISTS idx_records_unresolved ON records(collection, blob_locator);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
