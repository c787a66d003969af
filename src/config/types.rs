use serde::Deserialize;

/// Main configuration structure for Feedvault
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub credentials: CredentialsConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "author")]
    pub authors: Vec<AuthorEntry>,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Base URL of the platform (e.g. "https://fans.example")
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Endpoint of a running WebDriver server (chromedriver/geckodriver)
    #[serde(rename = "webdriver-endpoint")]
    pub webdriver_endpoint: String,
}

/// Account credentials used to establish the session
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    pub username: String,
    pub password: String,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Timeout for a single page navigation (milliseconds)
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// How long to wait for the post feed after submitting credentials,
    /// leaving room for a manual captcha solve (milliseconds)
    #[serde(rename = "login-timeout-ms", default = "default_login_timeout")]
    pub login_timeout_ms: u64,

    /// Interval between feed scroll ticks (milliseconds)
    #[serde(rename = "scroll-tick-ms", default = "default_scroll_tick")]
    pub scroll_tick_ms: u64,

    /// Consecutive no-new-post ticks before discovery gives up
    #[serde(rename = "stability-threshold", default = "default_stability_threshold")]
    pub stability_threshold: u32,

    /// Attempt bound for navigation, extraction, and downloads
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_navigation_timeout() -> u64 {
    30_000
}

fn default_login_timeout() -> u64 {
    240_000
}

fn default_scroll_tick() -> u64 {
    2_000
}

fn default_stability_threshold() -> u32 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite cache database
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Root directory for downloaded media (one subdirectory per author)
    #[serde(rename = "download-root")]
    pub download_root: String,
}

/// A creator whose feed should be archived
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorEntry {
    /// Stable external identifier (the handle in profile URLs)
    pub id: String,

    /// Display name
    pub name: String,
}
