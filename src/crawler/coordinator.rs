//! Crawl coordinator - main orchestration logic
//!
//! This module contains the control loop that, per author:
//! - loads the feed view (LoadingFeed)
//! - discovers unseen posts against the cache's seen-set (Discovering)
//! - processes each queued post oldest-to-newest: extract, reconcile with
//!   the cache, download what is missing (ProcessingPost)
//! - reports a per-author summary (Done), or gives up on the author without
//!   touching the rest of the run (Aborted)
//!
//! Failures are isolated per post and per author: one bad post never aborts
//! an author, and one bad author never aborts the run.

use crate::config::{AuthorEntry, Config};
use crate::downloader::{self, DownloadOutcome};
use crate::driver::{PageDriver, WaitUntil};
use crate::extractor::{extract_post, ExtractOutcome};
use crate::storage::Store;
use crate::url::{feed_url, media_file_extension, post_url, profile_url};
use crate::walker::{discover_unseen_posts, FEED_CONTAINER};
use crate::Result;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Phase of a single author's crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    /// Navigating to the author's feed view
    LoadingFeed,
    /// Walking the feed for unseen post identifiers
    Discovering,
    /// Working through the queued posts
    ProcessingPost,
    /// All queued posts handled
    Done,
    /// The feed never loaded; the author was skipped this run
    Aborted,
}

impl CrawlPhase {
    /// Returns true once the author needs no further work this run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LoadingFeed => "loading-feed",
            Self::Discovering => "discovering",
            Self::ProcessingPost => "processing-post",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        write!(f, "{}", name)
    }
}

/// End-of-run summary for one author
#[derive(Debug, Clone)]
pub struct AuthorReport {
    pub author_id: String,
    /// Final phase: `Done` or `Aborted`
    pub phase: CrawlPhase,
    /// Posts pulled from the discovery queue
    pub posts_processed: usize,
    /// Files newly written this run
    pub media_downloaded: usize,
    /// URLs of posts that yielded zero handled media
    pub failed_posts: Vec<String>,
}

/// Summary of a whole run
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub authors: Vec<AuthorReport>,
}

/// Media counts for one processed post
struct ProcessedPost {
    /// Sources accounted for: newly downloaded plus already cached
    handled: usize,
    /// Files newly written
    downloaded: usize,
}

/// Main crawl coordinator
pub struct Coordinator<D: PageDriver, S: Store> {
    config: Config,
    driver: D,
    store: S,
    client: reqwest::Client,
}

impl<D: PageDriver, S: Store> Coordinator<D, S> {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - The run configuration
    /// * `driver` - A page driver holding an authenticated session
    /// * `store` - The cache store
    pub fn new(config: Config, driver: D, store: S) -> Result<Self> {
        let client = downloader::build_http_client()?;
        Ok(Self {
            config,
            driver,
            store,
            client,
        })
    }

    /// Consumes the coordinator, returning the driver and store
    pub fn into_parts(self) -> (D, S) {
        (self.driver, self.store)
    }

    /// Runs the crawl for every configured author, in input order
    ///
    /// An error surfacing from one author's processing is caught at the
    /// author boundary; the run continues with the next author.
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let mut report = CrawlReport::default();
        let authors = self.config.authors.clone();

        for author in &authors {
            tracing::info!("Archiving author {} ({})", author.id, author.name);

            let author_report = match self.process_author(author).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!("Author {} failed: {}", author.id, e);
                    AuthorReport {
                        author_id: author.id.clone(),
                        phase: CrawlPhase::Aborted,
                        posts_processed: 0,
                        media_downloaded: 0,
                        failed_posts: Vec::new(),
                    }
                }
            };

            log_author_summary(&author_report);
            report.authors.push(author_report);
        }

        Ok(report)
    }

    /// Runs the state machine for a single author
    async fn process_author(&mut self, author: &AuthorEntry) -> Result<AuthorReport> {
        let base_url = self.config.site.base_url.clone();

        self.store.upsert_author(
            &author.id,
            &author.name,
            &profile_url(&base_url, &author.id),
        )?;

        tracing::debug!("Author {} entering phase {}", author.id, CrawlPhase::LoadingFeed);

        if !self.load_feed(&author.id).await {
            tracing::error!("Feed for {} never loaded; skipping author", author.id);
            return Ok(AuthorReport {
                author_id: author.id.clone(),
                phase: CrawlPhase::Aborted,
                posts_processed: 0,
                media_downloaded: 0,
                failed_posts: Vec::new(),
            });
        }

        tracing::debug!("Author {} entering phase {}", author.id, CrawlPhase::Discovering);

        let seen = self.store.get_seen_post_ids(&author.id)?;
        tracing::info!("{} posts already cached for {}", seen.len(), author.id);

        let queue =
            discover_unseen_posts(&mut self.driver, &seen, &self.config.crawler).await?;

        if queue.is_empty() {
            tracing::info!("Nothing new for {}", author.id);
            return Ok(AuthorReport {
                author_id: author.id.clone(),
                phase: CrawlPhase::Done,
                posts_processed: 0,
                media_downloaded: 0,
                failed_posts: Vec::new(),
            });
        }

        tracing::debug!(
            "Author {} entering phase {}",
            author.id,
            CrawlPhase::ProcessingPost
        );

        let mut posts_processed = 0;
        let mut media_downloaded = 0;
        let mut failed_posts = Vec::new();

        for remote_id in &queue {
            let url = post_url(&base_url, remote_id, &author.id);
            tracing::info!(
                "Processing post {}/{} for {}: {}",
                posts_processed + 1,
                queue.len(),
                author.id,
                url
            );

            match self.process_post(author, remote_id, &url).await {
                Ok(processed) => {
                    media_downloaded += processed.downloaded;
                    if processed.handled == 0 {
                        failed_posts.push(url);
                    }
                }
                Err(e) => {
                    tracing::error!("Post {} failed: {}", url, e);
                    failed_posts.push(url);
                }
            }

            posts_processed += 1;
        }

        Ok(AuthorReport {
            author_id: author.id.clone(),
            phase: CrawlPhase::Done,
            posts_processed,
            media_downloaded,
            failed_posts,
        })
    }

    /// Navigates to the author's feed, with bounded reload-on-timeout retries
    async fn load_feed(&mut self, author_id: &str) -> bool {
        let url = feed_url(&self.config.site.base_url, author_id);
        let timeout = Duration::from_millis(self.config.crawler.navigation_timeout_ms);

        for attempt in 1..=self.config.crawler.max_attempts {
            let navigated = if attempt == 1 {
                self.driver
                    .navigate(&url, WaitUntil::NetworkIdle, timeout)
                    .await
            } else {
                tracing::info!("Reloading feed {} (attempt {})", url, attempt);
                self.driver.reload().await
            };

            if let Err(e) = navigated {
                tracing::warn!("Feed navigation failed on attempt {}: {}", attempt, e);
                continue;
            }

            match self.driver.wait_for_selector(FEED_CONTAINER, timeout).await {
                Ok(true) => return true,
                Ok(false) => {
                    tracing::warn!("Feed {} did not render (attempt {})", url, attempt)
                }
                Err(e) => tracing::warn!("Waiting for feed {} failed: {}", url, e),
            }
        }

        false
    }

    /// Extracts one post, reconciles it with the cache, and downloads any
    /// sources not already present
    async fn process_post(
        &mut self,
        author: &AuthorEntry,
        remote_id: &str,
        url: &str,
    ) -> Result<ProcessedPost> {
        let extracted = match extract_post(&mut self.driver, url, &self.config.crawler).await {
            ExtractOutcome::Extracted(post) => post,
            ExtractOutcome::LoadFailed => {
                // No post row: the post stays undiscovered and a later run
                // retries it from scratch
                return Ok(ProcessedPost {
                    handled: 0,
                    downloaded: 0,
                });
            }
        };

        let record = self.store.get_or_create_post(
            url,
            &author.id,
            &extracted.description,
            &extracted.timestamp,
            extracted.locked,
        )?;

        // Canonicalize in extraction order. A source that cannot be
        // canonicalized cannot be cached, so it is dropped here; signed
        // variants of one asset collapse to their first occurrence.
        let mut sources: Vec<(usize, String, String)> = Vec::new();
        for raw in &extracted.sources {
            match crate::url::canonicalize_media_url(raw) {
                Ok(canonical) => {
                    if sources.iter().any(|(_, _, c)| c == &canonical) {
                        continue;
                    }
                    let ordinal = sources.len() + 1;
                    sources.push((ordinal, raw.clone(), canonical));
                }
                Err(e) => {
                    tracing::warn!("Skipping unusable source {} on {}: {}", raw, url, e);
                }
            }
        }

        let mut pending = Vec::new();
        for entry in &sources {
            if !self.store.has_media(record.id, &entry.2)? {
                pending.push(entry.clone());
            }
        }

        if pending.is_empty() {
            if !sources.is_empty() {
                // Everything discovered is already on disk; reconcile the
                // count directly
                self.store
                    .set_cached_media_count(record.id, sources.len() as u32)?;
            }
            return Ok(ProcessedPost {
                handled: sources.len(),
                downloaded: 0,
            });
        }

        let download_root = Path::new(&self.config.output.download_root).to_path_buf();
        let mut cached_count = record.cached_media_count;
        let mut downloaded = 0;

        for (ordinal, raw, canonical) in &pending {
            let extension = media_file_extension(raw);
            let file_name = downloader::build_file_name(
                &author.id,
                remote_id,
                &extracted.description,
                *ordinal,
                extension.as_deref(),
            );
            let destination =
                downloader::prepare_destination(&download_root, &author.id, &file_name)?;

            match downloader::download_media(
                &self.client,
                raw,
                &destination,
                self.config.crawler.max_attempts,
            )
            .await
            {
                DownloadOutcome::Completed { file_path } => {
                    // Record the row before bumping the count: interruption
                    // between the two under-counts, and a re-run repairs it
                    self.store.record_media(
                        record.id,
                        canonical,
                        &file_path.to_string_lossy(),
                    )?;
                    cached_count += 1;
                    self.store
                        .set_cached_media_count(record.id, cached_count)?;
                    downloaded += 1;
                }
                DownloadOutcome::Failed { error } => {
                    tracing::warn!("Source {} of {} not downloaded: {}", ordinal, url, error);
                }
            }
        }

        Ok(ProcessedPost {
            handled: downloaded + (sources.len() - pending.len()),
            downloaded,
        })
    }
}

/// Logs the end-of-run summary for one author
fn log_author_summary(report: &AuthorReport) {
    tracing::info!(
        "Author {} finished ({}): {} posts processed, {} files downloaded",
        report.author_id,
        report.phase,
        report.posts_processed,
        report.media_downloaded
    );

    if !report.failed_posts.is_empty() {
        tracing::warn!(
            "{} posts yielded no media for {}:",
            report.failed_posts.len(),
            report.author_id
        );
        for url in &report.failed_posts {
            tracing::warn!("  {}", url);
        }
    }
}
