//! Session establishment
//!
//! Logs the browser session in by filling the site's login form. The site
//! may interpose a captcha or device challenge after submission, so the
//! final wait runs against the long `login-timeout-ms` budget: the operator
//! solves the challenge in the attached browser window and the pipeline
//! picks up as soon as the feed renders.
//!
//! Failure here is the only condition that terminates the whole run.

use crate::config::Config;
use crate::driver::{PageDriver, WaitUntil};
use crate::walker::FEED_CONTAINER;
use crate::{Result, VaultError};
use std::time::Duration;

/// Login form container
const LOGIN_FORM: &str = "form.b-loginreg__form";

/// Username/email input
const USERNAME_INPUT: &str = "input[name=\"email\"]";

/// Password input
const PASSWORD_INPUT: &str = "input[name=\"password\"]";

/// Form submit control
const SUBMIT_BUTTON: &str = "button[type=\"submit\"]";

/// Establishes an authenticated session in the attached browser
///
/// # Arguments
///
/// * `driver` - The page driver
/// * `config` - Site, credential, and timeout configuration
///
/// # Returns
///
/// * `Ok(())` - The feed rendered; the session is usable
/// * `Err(VaultError::Session)` - Login failed or timed out
pub async fn establish_session<D: PageDriver>(driver: &mut D, config: &Config) -> Result<()> {
    let nav_timeout = Duration::from_millis(config.crawler.navigation_timeout_ms);
    let login_timeout = Duration::from_millis(config.crawler.login_timeout_ms);

    tracing::info!("Loading {}", config.site.base_url);
    driver
        .navigate(&config.site.base_url, WaitUntil::DomContentLoaded, nav_timeout)
        .await?;

    if !driver.wait_for_selector(LOGIN_FORM, nav_timeout).await? {
        return Err(VaultError::Session(
            "login form never rendered".to_string(),
        ));
    }

    tracing::info!("Submitting credentials");
    driver
        .type_text(USERNAME_INPUT, &config.credentials.username)
        .await?;
    driver
        .type_text(PASSWORD_INPUT, &config.credentials.password)
        .await?;
    driver.click(SUBMIT_BUTTON).await?;

    tracing::info!(
        "Waiting up to {}s for the feed (solve any challenge in the browser window)",
        login_timeout.as_secs()
    );

    if !driver.wait_for_selector(FEED_CONTAINER, login_timeout).await? {
        return Err(VaultError::Session(format!(
            "feed did not render within {}s of submitting credentials",
            login_timeout.as_secs()
        )));
    }

    tracing::info!("Session established");
    Ok(())
}
