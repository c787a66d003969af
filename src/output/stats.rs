//! Statistics generation from the archive cache
//!
//! This module provides functionality for extracting and displaying
//! archive statistics from the store.

use crate::storage::{AuthorBreakdown, Store};
use crate::Result;

/// Archive statistics summary
#[derive(Debug, Clone)]
pub struct ArchiveStatistics {
    /// Total number of authors in the cache
    pub total_authors: u64,

    /// Total number of posts scraped
    pub total_posts: u64,

    /// Posts marked permanently locked
    pub locked_posts: u64,

    /// Total number of downloaded media files
    pub total_media: u64,

    /// Per-author breakdown, ordered by author id
    pub authors: Vec<AuthorBreakdown>,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The cache store to query
///
/// # Returns
///
/// * `Ok(ArchiveStatistics)` - Successfully loaded statistics
/// * `Err(VaultError)` - Failed to query statistics
pub fn load_statistics(store: &dyn Store) -> Result<ArchiveStatistics> {
    let total_authors = store.count_authors()?;
    let total_posts = store.count_posts()?;
    let locked_posts = store.count_locked_posts()?;
    let total_media = store.count_media()?;
    let authors = store.author_breakdown()?;

    Ok(ArchiveStatistics {
        total_authors,
        total_posts,
        locked_posts,
        total_media,
        authors,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &ArchiveStatistics) {
    println!("=== Archive Statistics ===\n");

    println!("Overview:");
    println!("  Authors: {}", stats.total_authors);
    println!("  Posts scraped: {}", stats.total_posts);
    println!("  Locked posts: {}", stats.locked_posts);
    println!("  Media files: {}", stats.total_media);
    println!();

    if !stats.authors.is_empty() {
        println!("Per Author:");
        for author in &stats.authors {
            let open_posts = author.post_count - author.locked_count;
            println!(
                "  {} ({}): {} posts ({} locked), {} files",
                author.author_id, author.name, author.post_count, author.locked_count,
                author.media_count
            );

            if open_posts > 0 {
                let avg = author.media_count as f64 / open_posts as f64;
                println!("    avg {:.1} files per open post", avg);
            }
        }
        println!();
    }
}
