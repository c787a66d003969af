use crate::config::types::{AuthorEntry, Config, CrawlerConfig, CredentialsConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site(&config.site.base_url, &config.site.webdriver_endpoint)?;
    validate_credentials(&config.credentials)?;
    validate_crawler_config(&config.crawler)?;
    validate_output(&config.output.database_path, &config.output.download_root)?;
    validate_authors(&config.authors)?;
    Ok(())
}

/// Validates the site section
fn validate_site(base_url: &str, webdriver_endpoint: &str) -> Result<(), ConfigError> {
    let url = Url::parse(base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", base_url, e)))?;

    if url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "base-url must use HTTPS scheme, got '{}'",
            base_url
        )));
    }

    let endpoint = Url::parse(webdriver_endpoint).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid webdriver-endpoint '{}': {}",
            webdriver_endpoint, e
        ))
    })?;

    // The WebDriver server is expected to run locally, so plain HTTP is fine
    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "webdriver-endpoint must be an HTTP(S) URL, got '{}'",
            webdriver_endpoint
        )));
    }

    Ok(())
}

/// Validates the credentials section
fn validate_credentials(credentials: &CredentialsConfig) -> Result<(), ConfigError> {
    if credentials.username.is_empty() {
        return Err(ConfigError::Validation(
            "credentials.username cannot be empty".to_string(),
        ));
    }

    if credentials.password.is_empty() {
        return Err(ConfigError::Validation(
            "credentials.password cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.navigation_timeout_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "navigation-timeout-ms must be >= 1000ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.login_timeout_ms < config.navigation_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "login-timeout-ms ({}ms) must be >= navigation-timeout-ms ({}ms)",
            config.login_timeout_ms, config.navigation_timeout_ms
        )));
    }

    if config.scroll_tick_ms < 1 {
        return Err(ConfigError::Validation(
            "scroll-tick-ms must be >= 1ms".to_string(),
        ));
    }

    if config.stability_threshold < 1 {
        return Err(ConfigError::Validation(format!(
            "stability-threshold must be >= 1, got {}",
            config.stability_threshold
        )));
    }

    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output(database_path: &str, download_root: &str) -> Result<(), ConfigError> {
    if database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if download_root.is_empty() {
        return Err(ConfigError::Validation(
            "download-root cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates author entries: non-empty, URL-safe ids, no duplicates
fn validate_authors(authors: &[AuthorEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in authors {
        if entry.id.is_empty() {
            return Err(ConfigError::Validation(
                "author id cannot be empty".to_string(),
            ));
        }

        if !entry
            .id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ConfigError::Validation(format!(
                "author id '{}' must contain only alphanumerics, '-', '_', or '.'",
                entry.id
            )));
        }

        if entry.name.is_empty() {
            return Err(ConfigError::Validation(format!(
                "author '{}' must have a non-empty name",
                entry.id
            )));
        }

        if !seen.insert(entry.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate author id '{}'",
                entry.id
            )));
        }
    }

    Ok(())
}
