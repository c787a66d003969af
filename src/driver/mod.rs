//! Page driver capability
//!
//! The crawl pipeline never touches a DOM directly; every page interaction
//! goes through the [`PageDriver`] trait. The production implementation
//! ([`WebDriverSession`]) speaks the W3C WebDriver protocol to a locally
//! running chromedriver/geckodriver; tests substitute scripted fakes.
//!
//! The driver's lifecycle (launching and closing the browser process) is not
//! managed here; the crate only attaches to an already-running endpoint.

mod webdriver;

pub use webdriver::WebDriverSession;

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a page driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("WebDriver transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("WebDriver protocol error: {error}: {message}")]
    Protocol { error: String, message: String },

    #[error("Timed out waiting for {0}")]
    Timeout(String),

    #[error("No element matches selector '{0}'")]
    ElementNotFound(String),

    #[error("Unexpected WebDriver response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for page driver operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Readiness condition for a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// The document has been parsed (scripts may still be loading)
    DomContentLoaded,
    /// The document and its subresources have finished loading
    NetworkIdle,
}

/// An attached browser page the pipeline can drive
///
/// All operations are awaited strictly sequentially; the viewport is a single
/// shared mutable resource, so every method takes `&mut self`.
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    /// Navigates to a URL and waits for the given readiness condition
    async fn navigate(&mut self, url: &str, wait: WaitUntil, timeout: Duration)
        -> DriverResult<()>;

    /// Waits for a selector to appear, returning false if the timeout elapses
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration)
        -> DriverResult<bool>;

    /// Evaluates a script in the page and returns its JSON value
    ///
    /// The script receives no captured state and must return plain data; this
    /// is the only channel between the pipeline and page-side code.
    async fn evaluate(&mut self, script: &str) -> DriverResult<Value>;

    /// Returns the rendered text of the first element matching the selector
    async fn extract_text(&mut self, selector: &str) -> DriverResult<Option<String>>;

    /// Returns an attribute of the first element matching the selector
    async fn extract_attribute(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> DriverResult<Option<String>>;

    /// Returns an attribute of every element matching the selector
    async fn extract_attribute_all(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> DriverResult<Vec<String>>;

    /// Clicks the first element matching the selector
    async fn click(&mut self, selector: &str) -> DriverResult<()>;

    /// Types text into the first element matching the selector
    async fn type_text(&mut self, selector: &str, text: &str) -> DriverResult<()>;

    /// Reloads the current page
    async fn reload(&mut self) -> DriverResult<()>;
}
