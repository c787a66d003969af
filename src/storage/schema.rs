//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Feedvault cache.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Creators whose feeds are archived
CREATE TABLE IF NOT EXISTS authors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    profile_url TEXT NOT NULL
);

-- One row per scraped post; url is the natural key for all lookups
CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author_id TEXT NOT NULL REFERENCES authors(id),
    url TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    locked INTEGER NOT NULL DEFAULT 0,
    cached_media_count INTEGER NOT NULL DEFAULT 0,
    discovered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);
CREATE INDEX IF NOT EXISTS idx_posts_url ON posts(url);

-- One row per downloaded file; (post_id, url) is the download dedupe key
CREATE TABLE IF NOT EXISTS media (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL REFERENCES posts(id),
    url TEXT NOT NULL,
    file_path TEXT NOT NULL,
    downloaded_at TEXT NOT NULL,
    UNIQUE(post_id, url)
);

CREATE INDEX IF NOT EXISTS idx_media_post ON media(post_id);
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
