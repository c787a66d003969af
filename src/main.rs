//! Feedvault main entry point
//!
//! This is the command-line interface for the Feedvault media archiver.

use clap::Parser;
use feedvault::config::load_config_with_hash;
use feedvault::crawler::crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Feedvault: an incremental media archiver for subscription feeds
///
/// Feedvault walks each configured creator's post feed through an
/// authenticated browser session, downloads the media it has not cached yet,
/// and records progress in a local database so re-runs only fetch what is
/// still missing.
#[derive(Parser, Debug)]
#[command(name = "feedvault")]
#[command(version = "1.0.0")]
#[command(about = "An incremental media archiver for subscription feeds", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Delete an author and everything archived for them, then exit
    #[arg(long, value_name = "AUTHOR_ID", conflicts_with_all = ["stats", "dry_run"])]
    delete_author: Option<String>,

    /// Show statistics from the archive cache and exit
    #[arg(long, conflicts_with_all = ["delete_author", "dry_run"])]
    stats: bool,

    /// Validate config and show what would be archived without running
    #[arg(long, conflicts_with_all = ["delete_author", "stats"])]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if let Some(author_id) = &cli.delete_author {
        handle_delete_author(&config, author_id)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("feedvault=info,warn"),
            1 => EnvFilter::new("feedvault=debug,info"),
            2 => EnvFilter::new("feedvault=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be archived
fn handle_dry_run(config: &feedvault::config::Config) {
    println!("=== Feedvault Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  WebDriver endpoint: {}", config.site.webdriver_endpoint);

    println!("\nCrawler:");
    println!(
        "  Navigation timeout: {}ms",
        config.crawler.navigation_timeout_ms
    );
    println!("  Login timeout: {}ms", config.crawler.login_timeout_ms);
    println!("  Scroll tick: {}ms", config.crawler.scroll_tick_ms);
    println!(
        "  Stability threshold: {} ticks",
        config.crawler.stability_threshold
    );
    println!("  Max attempts: {}", config.crawler.max_attempts);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Download root: {}", config.output.download_root);

    println!("\nAuthors ({}):", config.authors.len());
    for author in &config.authors {
        println!("  - {} ({})", author.id, author.name);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the archive cache
fn handle_stats(config: &feedvault::config::Config) -> Result<(), Box<dyn std::error::Error>> {
    use feedvault::output::{load_statistics, print_statistics};
    use feedvault::storage::open_store;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let store = open_store(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --delete-author mode: cascade-removes an author's archive
fn handle_delete_author(
    config: &feedvault::config::Config,
    author_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    use feedvault::storage::{open_store, Store};
    use std::path::Path;

    let mut store = open_store(Path::new(&config.output.database_path))?;

    tracing::info!("Deleting author {} from the archive", author_id);
    let report = store.delete_author_cascade(author_id)?;

    println!(
        "Removed author {}: {} posts, {} media rows, {} files unlinked",
        author_id, report.posts, report.media, report.files
    );

    Ok(())
}

/// Handles the main archive operation
async fn handle_crawl(
    config: feedvault::config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting archive run for {} authors", config.authors.len());

    match crawl(config).await {
        Ok(report) => {
            let downloaded: usize = report.authors.iter().map(|a| a.media_downloaded).sum();
            let failed: usize = report.authors.iter().map(|a| a.failed_posts.len()).sum();
            tracing::info!(
                "Run completed: {} files downloaded, {} posts without media",
                downloaded,
                failed
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
