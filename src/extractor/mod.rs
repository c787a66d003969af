//! Per-post media extraction
//!
//! Given a loaded post view, this module determines whether the post is
//! locked and, if not, extracts an ordered, de-duplicated list of media
//! source URLs using a prioritized strategy cascade:
//!
//! 1. Video: click the play control, then probe a fixed quality preference
//!    list for the first variant that renders
//! 2. Multi-image: every image inside a slide container
//! 3. Single image: a lone responsive image (checked independently of the
//!    slide container; both may contribute)
//!
//! A strategy that finds nothing, or whose driver calls fail, contributes
//! nothing; it never aborts the remaining strategies or the attempt loop.

pub mod selectors;

use crate::config::CrawlerConfig;
use crate::driver::{DriverResult, PageDriver, WaitUntil};
use std::time::Duration;

/// Timeout for cheap element-presence probes
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Timeout for a clicked video player to attach a quality variant
const QUALITY_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything extracted from a single post view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPost {
    /// Free text; the literal "none" when the post has no description
    pub description: String,
    /// Site-rendered date text, opaque to the pipeline
    pub timestamp: String,
    /// Whether the post is behind a paywall marker
    pub locked: bool,
    /// De-duplicated media source URLs in first-seen order
    pub sources: Vec<String>,
}

/// Result of attempting to extract a post
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// The post view rendered and was examined
    Extracted(ExtractedPost),

    /// The post view never rendered within the attempt budget; the post is
    /// skipped for this run and stays undiscovered in the cache
    LoadFailed,
}

/// Navigates to a post and extracts its description, timestamp, lock state,
/// and media sources
///
/// Never returns an error: navigation exhaustion degrades to
/// [`ExtractOutcome::LoadFailed`], and a post with no extractable sources is
/// a legitimate empty result, not a failure.
///
/// # Arguments
///
/// * `driver` - The page driver, already holding an authenticated session
/// * `post_url` - Canonical URL of the post
/// * `crawler` - Attempt bounds and timeouts
pub async fn extract_post<D: PageDriver>(
    driver: &mut D,
    post_url: &str,
    crawler: &CrawlerConfig,
) -> ExtractOutcome {
    let timeout = Duration::from_millis(crawler.navigation_timeout_ms);

    // Load the post view, reloading between attempts
    let mut loaded = false;
    for attempt in 1..=crawler.max_attempts {
        let navigated = if attempt == 1 {
            driver
                .navigate(post_url, WaitUntil::DomContentLoaded, timeout)
                .await
        } else {
            tracing::info!("Reloading {} (attempt {})", post_url, attempt);
            driver.reload().await
        };

        if let Err(e) = navigated {
            tracing::warn!("Navigation to {} failed on attempt {}: {}", post_url, attempt, e);
            continue;
        }

        match driver.wait_for_selector(selectors::POST_WRAPPER, timeout).await {
            Ok(true) => {
                loaded = true;
                break;
            }
            Ok(false) => {
                tracing::warn!("Post view {} did not render (attempt {})", post_url, attempt);
            }
            Err(e) => {
                tracing::warn!("Waiting for post view {} failed: {}", post_url, e);
            }
        }
    }

    if !loaded {
        tracing::error!("Giving up on {} after {} attempts", post_url, crawler.max_attempts);
        return ExtractOutcome::LoadFailed;
    }

    // Description and timestamp are extracted unconditionally, locked or not
    let description = driver
        .extract_text(selectors::DESCRIPTION)
        .await
        .ok()
        .flatten()
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "none".to_string());

    let timestamp = driver
        .extract_text(selectors::TIMESTAMP)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

    let mut locked = false;
    let mut sources: Vec<String> = Vec::new();

    for attempt in 1..=crawler.max_attempts {
        // Locked posts never carry extractable sources; stop immediately
        if let Ok(true) = driver
            .wait_for_selector(selectors::LOCKED_MARKER, PROBE_TIMEOUT)
            .await
        {
            tracing::info!("Post {} is locked", post_url);
            locked = true;
            break;
        }

        match video_strategy(driver).await {
            Ok(Some(src)) => push_unique(&mut sources, src),
            Ok(None) => {}
            Err(e) => tracing::debug!("Video strategy failed on {}: {}", post_url, e),
        }

        match slide_strategy(driver).await {
            Ok(found) => {
                for src in found {
                    push_unique(&mut sources, src);
                }
            }
            Err(e) => tracing::debug!("Slide strategy failed on {}: {}", post_url, e),
        }

        match single_image_strategy(driver).await {
            Ok(Some(src)) => push_unique(&mut sources, src),
            Ok(None) => {}
            Err(e) => tracing::debug!("Single-image strategy failed on {}: {}", post_url, e),
        }

        if !sources.is_empty() {
            break;
        }

        tracing::debug!(
            "No sources found on {} (attempt {}/{})",
            post_url,
            attempt,
            crawler.max_attempts
        );
    }

    ExtractOutcome::Extracted(ExtractedPost {
        description,
        timestamp,
        locked,
        sources,
    })
}

/// Appends a source unless an identical one was already found
fn push_unique(sources: &mut Vec<String>, src: String) {
    if !sources.contains(&src) {
        sources.push(src);
    }
}

/// Clicks the play control and probes quality variants in preference order
async fn video_strategy<D: PageDriver>(driver: &mut D) -> DriverResult<Option<String>> {
    let has_player = driver
        .wait_for_selector(selectors::PLAY_BUTTON, PROBE_TIMEOUT)
        .await?;
    if !has_player {
        return Ok(None);
    }

    driver.click(selectors::PLAY_BUTTON).await?;

    for quality in selectors::VIDEO_QUALITIES {
        let selector = selectors::video_source(quality);
        if driver.wait_for_selector(&selector, QUALITY_TIMEOUT).await? {
            if let Some(src) = driver.extract_attribute(&selector, "src").await? {
                tracing::debug!("Video source found at quality {}", quality);
                return Ok(Some(src));
            }
        }
    }

    Ok(None)
}

/// Extracts every image source inside the multi-slide container
async fn slide_strategy<D: PageDriver>(driver: &mut D) -> DriverResult<Vec<String>> {
    let has_slides = driver
        .wait_for_selector(selectors::SLIDES_CONTAINER, PROBE_TIMEOUT)
        .await?;
    if !has_slides {
        return Ok(Vec::new());
    }

    driver
        .extract_attribute_all(selectors::SLIDE_IMAGES, "src")
        .await
}

/// Extracts the lone responsive image, if present
async fn single_image_strategy<D: PageDriver>(driver: &mut D) -> DriverResult<Option<String>> {
    driver
        .extract_attribute(selectors::SINGLE_IMAGE, "src")
        .await
}
