//! W3C WebDriver implementation of the page driver
//!
//! Talks the raw WebDriver wire protocol over HTTP to a locally running
//! chromedriver or geckodriver. Only the handful of endpoints the pipeline
//! needs are implemented: session create/delete, navigate, refresh, and
//! synchronous script execution. Element-level operations are expressed as
//! scripts so that selectors and values cross the boundary as plain
//! arguments rather than element handles.

use crate::driver::{DriverError, DriverResult, PageDriver, WaitUntil};
use serde_json::{json, Value};
use std::time::Duration;

/// Poll interval for readiness and selector waits
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Settle time applied after the document reports complete for
/// [`WaitUntil::NetworkIdle`] navigations
const NETWORK_SETTLE: Duration = Duration::from_millis(500);

/// An attached WebDriver session
pub struct WebDriverSession {
    client: reqwest::Client,
    endpoint: String,
    session_id: String,
}

impl WebDriverSession {
    /// Attaches to a WebDriver server and opens a new session
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Base URL of the WebDriver server (e.g. "http://127.0.0.1:9515")
    ///
    /// # Returns
    ///
    /// * `Ok(WebDriverSession)` - Session created
    /// * `Err(DriverError)` - The server refused or returned a malformed response
    pub async fn connect(endpoint: &str) -> DriverResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        let base = endpoint.trim_end_matches('/').to_string();
        let body = client
            .post(format!("{}/session", base))
            .json(&json!({ "capabilities": { "alwaysMatch": {} } }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        check_protocol_error(&body)?;

        let session_id = body
            .pointer("/value/sessionId")
            .and_then(|v| v.as_str())
            .or_else(|| body.pointer("/sessionId").and_then(|v| v.as_str()))
            .map(|s| s.to_string())
            .ok_or_else(|| {
                DriverError::InvalidResponse("session id missing in create response".to_string())
            })?;

        tracing::debug!("WebDriver session {} attached at {}", session_id, base);

        Ok(Self {
            client,
            endpoint: base,
            session_id,
        })
    }

    /// Deletes the session, leaving the browser process to its owner
    pub async fn close(self) -> DriverResult<()> {
        self.client
            .delete(format!("{}/session/{}", self.endpoint, self.session_id))
            .send()
            .await?;
        Ok(())
    }

    /// Sends a session-scoped command and returns the parsed response body
    async fn command(&self, path: &str, body: Value) -> DriverResult<Value> {
        let url = format!("{}/session/{}{}", self.endpoint, self.session_id, path);
        let response = self.client.post(url).json(&body).send().await?;
        let parsed = response.json::<Value>().await?;
        check_protocol_error(&parsed)?;
        Ok(parsed)
    }

    /// Executes a synchronous script in the page with the given arguments
    async fn execute(&self, script: &str, args: Vec<Value>) -> DriverResult<Value> {
        let body = self
            .command("/execute/sync", json!({ "script": script, "args": args }))
            .await?;
        Ok(body.pointer("/value").cloned().unwrap_or(Value::Null))
    }

    /// Polls the document readiness state until it satisfies the wait condition
    async fn await_readiness(&self, wait: WaitUntil, timeout: Duration) -> DriverResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let state = self
                .execute("return document.readyState;", vec![])
                .await?
                .as_str()
                .unwrap_or_default()
                .to_string();

            let ready = match wait {
                WaitUntil::DomContentLoaded => state == "interactive" || state == "complete",
                WaitUntil::NetworkIdle => state == "complete",
            };

            if ready {
                if wait == WaitUntil::NetworkIdle {
                    tokio::time::sleep(NETWORK_SETTLE).await;
                }
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(DriverError::Timeout(format!(
                    "document readiness ({:?})",
                    wait
                )));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

impl PageDriver for WebDriverSession {
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitUntil,
        timeout: Duration,
    ) -> DriverResult<()> {
        self.command("/url", json!({ "url": url })).await?;
        self.await_readiness(wait, timeout).await
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> DriverResult<bool> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let present = self
                .execute(
                    "return document.querySelector(arguments[0]) !== null;",
                    vec![json!(selector)],
                )
                .await?
                .as_bool()
                .unwrap_or(false);

            if present {
                return Ok(true);
            }

            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&mut self, script: &str) -> DriverResult<Value> {
        self.execute(script, vec![]).await
    }

    async fn extract_text(&mut self, selector: &str) -> DriverResult<Option<String>> {
        let value = self
            .execute(
                "const el = document.querySelector(arguments[0]); \
                 return el ? el.innerText : null;",
                vec![json!(selector)],
            )
            .await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn extract_attribute(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> DriverResult<Option<String>> {
        let value = self
            .execute(
                "const el = document.querySelector(arguments[0]); \
                 return el ? el.getAttribute(arguments[1]) : null;",
                vec![json!(selector), json!(attribute)],
            )
            .await?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn extract_attribute_all(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> DriverResult<Vec<String>> {
        let value = self
            .execute(
                "return Array.from(document.querySelectorAll(arguments[0])) \
                 .map(el => el.getAttribute(arguments[1])) \
                 .filter(v => v !== null);",
                vec![json!(selector), json!(attribute)],
            )
            .await?;

        Ok(value
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn click(&mut self, selector: &str) -> DriverResult<()> {
        let clicked = self
            .execute(
                "const el = document.querySelector(arguments[0]); \
                 if (!el) return false; el.click(); return true;",
                vec![json!(selector)],
            )
            .await?
            .as_bool()
            .unwrap_or(false);

        if clicked {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(selector.to_string()))
        }
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> DriverResult<()> {
        let typed = self
            .execute(
                "const el = document.querySelector(arguments[0]); \
                 if (!el) return false; \
                 el.focus(); \
                 el.value = arguments[1]; \
                 el.dispatchEvent(new Event('input', { bubbles: true })); \
                 el.dispatchEvent(new Event('change', { bubbles: true })); \
                 return true;",
                vec![json!(selector), json!(text)],
            )
            .await?
            .as_bool()
            .unwrap_or(false);

        if typed {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(selector.to_string()))
        }
    }

    async fn reload(&mut self) -> DriverResult<()> {
        self.command("/refresh", json!({})).await?;
        Ok(())
    }
}

/// Maps a WebDriver error payload (`/value/error`) to a protocol error
fn check_protocol_error(body: &Value) -> DriverResult<()> {
    if let Some(error) = body.pointer("/value/error").and_then(|v| v.as_str()) {
        let message = body
            .pointer("/value/message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown webdriver error");
        return Err(DriverError::Protocol {
            error: error.to_string(),
            message: message.to_string(),
        });
    }
    Ok(())
}
