//! SQLite store implementation
//!
//! This module provides a SQLite-based implementation of the Store trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Store, StoreError, StoreResult};
use crate::storage::{AuthorBreakdown, AuthorRecord, DeleteReport, PostRecord};
use crate::VaultError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

/// SQLite cache store backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Creates a new SqliteStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(VaultError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, VaultError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, VaultError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_post_by_url(&self, url: &str) -> StoreResult<Option<PostRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, author_id, url, description, timestamp, locked, cached_media_count,
             discovered_at FROM posts WHERE url = ?1",
        )?;

        let post = stmt
            .query_row(params![url], |row| {
                Ok(PostRecord {
                    id: row.get(0)?,
                    author_id: row.get(1)?,
                    url: row.get(2)?,
                    description: row.get(3)?,
                    timestamp: row.get(4)?,
                    locked: row.get::<_, i64>(5)? != 0,
                    cached_media_count: row.get(6)?,
                    discovered_at: row.get(7)?,
                })
            })
            .optional()?;

        Ok(post)
    }
}

impl Store for SqliteStore {
    // ===== Authors =====

    fn upsert_author(&mut self, id: &str, name: &str, profile_url: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO authors (id, name, profile_url) VALUES (?1, ?2, ?3)",
            params![id, name, profile_url],
        )?;
        Ok(())
    }

    fn get_author(&self, id: &str) -> StoreResult<Option<AuthorRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, profile_url FROM authors WHERE id = ?1")?;

        let author = stmt
            .query_row(params![id], |row| {
                Ok(AuthorRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    profile_url: row.get(2)?,
                })
            })
            .optional()?;

        Ok(author)
    }

    fn get_authors(&self) -> StoreResult<Vec<AuthorRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, profile_url FROM authors ORDER BY id")?;

        let authors = stmt
            .query_map([], |row| {
                Ok(AuthorRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    profile_url: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(authors)
    }

    // ===== Posts =====

    fn get_seen_post_ids(&self, author_id: &str) -> StoreResult<HashSet<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT url FROM posts WHERE author_id = ?1
             AND (cached_media_count > 0 OR locked = 1)",
        )?;

        let urls = stmt
            .query_map(params![author_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for url in urls {
            match crate::url::post_id_from_url(&url) {
                Some(id) => {
                    seen.insert(id);
                }
                None => {
                    tracing::warn!("Cached post URL {} has no parseable remote id", url);
                }
            }
        }

        Ok(seen)
    }

    fn get_post_by_url(&self, url: &str) -> StoreResult<Option<PostRecord>> {
        self.query_post_by_url(url)
    }

    fn get_or_create_post(
        &mut self,
        url: &str,
        author_id: &str,
        description: &str,
        timestamp: &str,
        locked: bool,
    ) -> StoreResult<PostRecord> {
        // Lookup first; re-scrapes of a known URL reuse the existing row
        if let Some(existing) = self.query_post_by_url(url)? {
            return Ok(existing);
        }

        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO posts (author_id, url, description, timestamp, locked,
             cached_media_count, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![author_id, url, description, timestamp, locked as i64, now],
        )?;

        let id = self.conn.last_insert_rowid();

        Ok(PostRecord {
            id,
            author_id: author_id.to_string(),
            url: url.to_string(),
            description: description.to_string(),
            timestamp: timestamp.to_string(),
            locked,
            cached_media_count: 0,
            discovered_at: now,
        })
    }

    fn set_cached_media_count(&mut self, post_id: i64, count: u32) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE posts SET cached_media_count = ?1 WHERE id = ?2",
            params![count, post_id],
        )?;
        Ok(())
    }

    // ===== Media =====

    fn has_media(&self, post_id: i64, canonical_url: &str) -> StoreResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM media WHERE post_id = ?1 AND url = ?2",
            params![post_id, canonical_url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn record_media(
        &mut self,
        post_id: i64,
        canonical_url: &str,
        file_path: &str,
    ) -> StoreResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO media (post_id, url, file_path, downloaded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![post_id, canonical_url, file_path, now],
        )?;
        Ok(())
    }

    // ===== Administrative =====

    fn delete_author_cascade(&mut self, author_id: &str) -> StoreResult<DeleteReport> {
        if self.get_author(author_id)?.is_none() {
            return Err(StoreError::AuthorNotFound(author_id.to_string()));
        }

        // Unlink files before their rows disappear
        let file_paths = {
            let mut stmt = self.conn.prepare(
                "SELECT m.file_path FROM media m
                 JOIN posts p ON m.post_id = p.id
                 WHERE p.author_id = ?1",
            )?;
            let paths = stmt
                .query_map(params![author_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            paths
        };

        let mut files = 0;
        for path in &file_paths {
            match std::fs::remove_file(path) {
                Ok(()) => files += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!("Media file already missing: {}", path);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let media = self.conn.execute(
            "DELETE FROM media WHERE post_id IN (SELECT id FROM posts WHERE author_id = ?1)",
            params![author_id],
        )?;
        let posts = self
            .conn
            .execute("DELETE FROM posts WHERE author_id = ?1", params![author_id])?;
        self.conn
            .execute("DELETE FROM authors WHERE id = ?1", params![author_id])?;

        Ok(DeleteReport {
            posts,
            media,
            files,
        })
    }

    // ===== Statistics =====

    fn count_authors(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM authors", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_posts(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_locked_posts(&self) -> StoreResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM posts WHERE locked = 1", [], |row| {
                    row.get(0)
                })?;
        Ok(count as u64)
    }

    fn count_media(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn author_breakdown(&self) -> StoreResult<Vec<AuthorBreakdown>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.name,
                    COUNT(DISTINCT p.id),
                    COUNT(DISTINCT CASE WHEN p.locked = 1 THEN p.id END),
                    COUNT(m.id)
             FROM authors a
             LEFT JOIN posts p ON p.author_id = a.id
             LEFT JOIN media m ON m.post_id = p.id
             GROUP BY a.id, a.name
             ORDER BY a.id",
        )?;

        let breakdown = stmt
            .query_map([], |row| {
                Ok(AuthorBreakdown {
                    author_id: row.get(0)?,
                    name: row.get(1)?,
                    post_count: row.get::<_, i64>(2)? as u64,
                    locked_count: row.get::<_, i64>(3)? as u64,
                    media_count: row.get::<_, i64>(4)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(breakdown)
    }
}
