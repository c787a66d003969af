//! Incremental feed discovery
//!
//! The walker drives an infinite-scroll feed viewport: on a fixed tick it
//! scrolls by the remaining scrollable distance, scans the rendered post
//! elements for identifiers, and accumulates the ones not already known.
//! Discovery stops when the feed bottoms out or when a stability window of
//! consecutive ticks yields nothing new.
//!
//! The accumulated list arrives newest-first (the feed sorts descending by
//! publish date) and is reversed before return, so the caller processes
//! posts oldest-to-newest. An interrupted crawl therefore leaves behind a
//! complete, contiguous, chronologically-oldest slice.
//!
//! All page-side code lives in the script constants below; only plain JSON
//! data crosses the driver boundary.

use crate::config::CrawlerConfig;
use crate::driver::{DriverResult, PageDriver};
use std::collections::HashSet;
use std::time::Duration;

/// Container that signals the feed view has rendered
pub const FEED_CONTAINER: &str = ".user-posts";

/// Prefix of the DOM id attribute carrying a post's remote identifier
pub const POST_ID_PREFIX: &str = "postId_";

/// Script returning the ids of all currently rendered post elements
pub const VISIBLE_POST_IDS_SCRIPT: &str = "return Array.from(document.querySelectorAll('.user-posts .b-post')).map(el => el.id).filter(Boolean);";

/// Script returning the remaining scrollable distance in pixels
pub const REMAINING_SCROLL_SCRIPT: &str = "return Math.max(0, document.body.scrollHeight - window.innerHeight - window.scrollY);";

/// Script scrolling the viewport down by the given distance
pub fn scroll_by_script(distance: f64) -> String {
    format!("window.scrollBy(0, {});", distance)
}

/// Discovers the remote identifiers of posts not yet in the seen-set
///
/// The driver must already be on the author's feed view. Returns identifiers
/// ordered oldest-to-newest.
///
/// # Arguments
///
/// * `driver` - The page driver, positioned on the feed
/// * `seen_ids` - Remote identifiers already terminally handled
/// * `crawler` - Tick interval and stability threshold
pub async fn discover_unseen_posts<D: PageDriver>(
    driver: &mut D,
    seen_ids: &HashSet<String>,
    crawler: &CrawlerConfig,
) -> DriverResult<Vec<String>> {
    let tick = Duration::from_millis(crawler.scroll_tick_ms);
    let mut unseen: Vec<String> = Vec::new();
    let mut stable_ticks: u32 = 0;

    loop {
        tokio::time::sleep(tick).await;

        let remaining = driver
            .evaluate(REMAINING_SCROLL_SCRIPT)
            .await?
            .as_f64()
            .unwrap_or(0.0);

        if remaining > 0.0 {
            driver.evaluate(&scroll_by_script(remaining)).await?;
        }

        let rendered = visible_post_ids(driver).await?;

        let mut new_this_tick = 0;
        for id in rendered {
            if seen_ids.contains(&id) || unseen.contains(&id) {
                continue;
            }
            unseen.push(id);
            new_this_tick += 1;
        }

        if new_this_tick == 0 {
            stable_ticks += 1;
        } else {
            stable_ticks = 0;
        }

        tracing::debug!(
            "Discovery tick: {} new, {} accumulated, {}px remaining, {} stable ticks",
            new_this_tick,
            unseen.len(),
            remaining,
            stable_ticks
        );

        // On a first-ever crawl a single zero-scroll tick cannot distinguish
        // "nothing loaded yet" from "everything loaded"; only the stability
        // window may terminate then.
        if remaining <= 0.0 && new_this_tick == 0 && !seen_ids.is_empty() {
            break;
        }

        if stable_ticks >= crawler.stability_threshold {
            break;
        }
    }

    tracing::info!("Discovered {} unseen posts", unseen.len());

    // Newest-first discovery order becomes oldest-first processing order
    unseen.reverse();
    Ok(unseen)
}

/// Reads the rendered post element ids and strips the DOM id prefix
async fn visible_post_ids<D: PageDriver>(driver: &mut D) -> DriverResult<Vec<String>> {
    let value = driver.evaluate(VISIBLE_POST_IDS_SCRIPT).await?;

    Ok(value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .filter_map(|id| id.strip_prefix(POST_ID_PREFIX))
                .map(|id| id.to_string())
                .collect()
        })
        .unwrap_or_default())
}
