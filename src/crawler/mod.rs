//! Crawl orchestration
//!
//! This module contains the top-level control flow, including:
//! - session establishment against the target site
//! - the per-author state machine (load feed, discover, process posts)
//! - failure isolation per post and per author
//! - end-of-run reporting

mod coordinator;
mod login;

pub use coordinator::{AuthorReport, Coordinator, CrawlPhase, CrawlReport};
pub use login::establish_session;

use crate::config::Config;
use crate::driver::WebDriverSession;
use crate::storage::open_store;
use crate::Result;
use std::path::Path;

/// Runs a complete archive pass
///
/// This is the main entry point for a crawl. It will:
/// 1. Open (or create) the cache database
/// 2. Attach to the configured WebDriver endpoint
/// 3. Establish an authenticated session
/// 4. Crawl every configured author in input order
/// 5. Release the browser session and return the run report
///
/// # Arguments
///
/// * `config` - The run configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The run finished (individual authors may still
///   have been aborted; see the report)
/// * `Err(VaultError)` - The cache could not be opened, or the session
///   could not be established
pub async fn crawl(config: Config) -> Result<CrawlReport> {
    let store = open_store(Path::new(&config.output.database_path))?;
    let mut driver = WebDriverSession::connect(&config.site.webdriver_endpoint).await?;

    if let Err(e) = establish_session(&mut driver, &config).await {
        let _ = driver.close().await;
        return Err(e);
    }

    let mut coordinator = Coordinator::new(config, driver, store)?;
    let result = coordinator.run().await;

    let (driver, _store) = coordinator.into_parts();
    if let Err(e) = driver.close().await {
        tracing::warn!("Failed to release browser session: {}", e);
    }

    result
}
