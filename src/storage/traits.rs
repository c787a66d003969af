//! Store trait and error types
//!
//! This module defines the trait interface for the cache store and its
//! associated error types. The store is the single owner of all writes to
//! the authors/posts/media tables; other components only read through it.

use crate::storage::{AuthorBreakdown, AuthorRecord, DeleteReport, PostRecord};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Author not found: {0}")]
    AuthorNotFound(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for the cache store backing the crawl pipeline
///
/// Operations are synchronous over a single shared connection; the pipeline
/// awaits them strictly sequentially, so no locking discipline is required.
pub trait Store {
    // ===== Authors =====

    /// Inserts an author if absent; existing rows are never overwritten
    fn upsert_author(&mut self, id: &str, name: &str, profile_url: &str) -> StoreResult<()>;

    /// Gets an author by id
    fn get_author(&self, id: &str) -> StoreResult<Option<AuthorRecord>>;

    /// Gets all authors, ordered by id
    fn get_authors(&self) -> StoreResult<Vec<AuthorRecord>>;

    // ===== Posts =====

    /// Returns the remote post identifiers already terminally handled for an
    /// author: posts with downloaded media, or permanently locked posts
    ///
    /// Identifiers are parsed from the stored post URLs.
    fn get_seen_post_ids(&self, author_id: &str) -> StoreResult<HashSet<String>>;

    /// Gets a post by its canonical URL
    fn get_post_by_url(&self, url: &str) -> StoreResult<Option<PostRecord>>;

    /// Returns the existing post for a URL, or inserts a new row and returns it
    ///
    /// The lookup-then-insert sequence is safe because the pipeline is
    /// strictly sequential; the UNIQUE constraint on `posts.url` is a
    /// backstop, not the mechanism.
    fn get_or_create_post(
        &mut self,
        url: &str,
        author_id: &str,
        description: &str,
        timestamp: &str,
        locked: bool,
    ) -> StoreResult<PostRecord>;

    /// Sets the cached media count for a post
    fn set_cached_media_count(&mut self, post_id: i64, count: u32) -> StoreResult<()>;

    // ===== Media =====

    /// Checks whether a (post, canonical URL) pair already has a media row
    fn has_media(&self, post_id: i64, canonical_url: &str) -> StoreResult<bool>;

    /// Records a downloaded media file
    ///
    /// Callers follow this with [`Store::set_cached_media_count`], in that
    /// order, so that an interruption between the two under-counts rather
    /// than over-counts.
    fn record_media(
        &mut self,
        post_id: i64,
        canonical_url: &str,
        file_path: &str,
    ) -> StoreResult<()>;

    // ===== Administrative =====

    /// Removes an author and everything archived for them
    ///
    /// Unlinks each media file from disk, then deletes media rows, post rows,
    /// and finally the author row.
    fn delete_author_cascade(&mut self, author_id: &str) -> StoreResult<DeleteReport>;

    // ===== Statistics =====

    /// Counts all authors
    fn count_authors(&self) -> StoreResult<u64>;

    /// Counts all posts
    fn count_posts(&self) -> StoreResult<u64>;

    /// Counts posts marked locked
    fn count_locked_posts(&self) -> StoreResult<u64>;

    /// Counts all media rows
    fn count_media(&self) -> StoreResult<u64>;

    /// Per-author post/locked/media counts, ordered by author id
    fn author_breakdown(&self) -> StoreResult<Vec<AuthorBreakdown>>;
}
