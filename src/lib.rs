//! Feedvault: an incremental media archiver for subscription feeds
//!
//! This crate implements a resumable crawl-and-download pipeline: it walks a
//! creator's post feed through an authenticated browser session, extracts
//! media source URLs per post, downloads them to per-author directories, and
//! records everything in a local SQLite cache so re-runs only touch what is
//! still missing.

pub mod config;
pub mod crawler;
pub mod downloader;
pub mod driver;
pub mod extractor;
pub mod output;
pub mod storage;
pub mod url;
pub mod walker;

use thiserror::Error;

/// Main error type for Feedvault operations
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Page driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Failed to establish session: {0}")]
    Session(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Feedvault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use driver::{PageDriver, WaitUntil};
pub use url::{canonicalize_media_url, post_id_from_url, post_url};
