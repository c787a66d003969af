//! Media file transfer
//!
//! This module fetches a media source URL and persists the bytes under the
//! author's download directory. Failures never propagate as errors: the
//! downloader retries internally and, on exhaustion, reports a failure
//! outcome the orchestrator treats as "this one source did not download".
//!
//! Filenames are deterministic and collision-resistant: a sanitized,
//! percent-encoded slice of the post description, prefixed with the author
//! id, suffixed with the remote post id, with an ordinal for every source
//! after the first. Existing files are never overwritten; collisions get a
//! numbered variant instead.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// Maximum length of the encoded description slice in a filename
const MAX_NAME_LEN: usize = 80;

/// Minimum interval between progress log lines for one transfer
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Browser-like user agent; media CDNs refuse obviously non-browser clients
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0";

/// Result of a download attempt sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The file was written to disk
    Completed { file_path: PathBuf },

    /// All attempts failed; no file was produced
    Failed { error: String },
}

/// Builds the HTTP client used for media transfers
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the destination filename for one media source of a post
///
/// # Arguments
///
/// * `author_id` - The author's stable identifier (filename prefix)
/// * `remote_post_id` - The post's remote numeric id (bracketed suffix)
/// * `description` - The post description the name is derived from
/// * `ordinal` - 1-based position of this source within the post; sources
///   after the first get a distinguishing suffix
/// * `extension` - File extension from the source URL path, if any
pub fn build_file_name(
    author_id: &str,
    remote_post_id: &str,
    description: &str,
    ordinal: usize,
    extension: Option<&str>,
) -> String {
    let sanitized: String = description
        .chars()
        .map(|c| {
            if c.is_whitespace() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect();

    let mut encoded = urlencoding::encode(&sanitized).into_owned();
    if encoded.len() > MAX_NAME_LEN {
        // Percent-encoding leaves pure ASCII, so byte truncation is safe
        encoded.truncate(MAX_NAME_LEN);
    }

    let mut name = format!("{}_{}[{}]", author_id, encoded, remote_post_id);

    if ordinal > 1 {
        name.push_str(&format!(" ({})", ordinal - 1));
    }

    if let Some(ext) = extension {
        name.push('.');
        name.push_str(ext);
    }

    name
}

/// Creates the author's download directory and reserves a destination path
///
/// If a file with the constructed name already exists, a numbered variant is
/// chosen so the existing file is left untouched.
pub fn prepare_destination(
    download_root: &Path,
    author_id: &str,
    file_name: &str,
) -> std::io::Result<PathBuf> {
    let author_dir = download_root.join(author_id);
    std::fs::create_dir_all(&author_dir)?;
    Ok(unique_destination(author_dir.join(file_name)))
}

/// Returns the path itself, or the first numbered variant that does not exist
fn unique_destination(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let extension = path.extension().and_then(|s| s.to_str()).map(str::to_string);
    let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut attempt = 1;
    loop {
        let mut candidate = format!("{} ({})", stem, attempt);
        if let Some(ext) = &extension {
            candidate.push('.');
            candidate.push_str(ext);
        }
        let candidate_path = parent.join(candidate);
        if !candidate_path.exists() {
            return candidate_path;
        }
        attempt += 1;
    }
}

/// Downloads a media source to the given destination with bounded retries
///
/// Streams the response body to disk, logging progress at a throttled
/// cadence. Never returns an error; exhaustion yields
/// [`DownloadOutcome::Failed`] and any partial file is removed.
///
/// # Arguments
///
/// * `client` - The HTTP client
/// * `source_url` - The media source URL (the raw variant, not the canonical
///   key — signed query parameters are often required to fetch)
/// * `destination` - Reserved destination path
/// * `max_attempts` - Attempt bound
pub async fn download_media(
    client: &reqwest::Client,
    source_url: &str,
    destination: &Path,
    max_attempts: u32,
) -> DownloadOutcome {
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        match stream_to_file(client, source_url, destination).await {
            Ok(bytes) => {
                tracing::info!(
                    "Downloaded {} ({} bytes)",
                    destination.display(),
                    bytes
                );
                return DownloadOutcome::Completed {
                    file_path: destination.to_path_buf(),
                };
            }
            Err(e) => {
                last_error = e.to_string();
                tracing::warn!(
                    "Download of {} failed on attempt {}/{}: {}",
                    source_url,
                    attempt,
                    max_attempts,
                    last_error
                );

                // Drop any partial file so a retry starts clean
                if destination.exists() {
                    if let Err(cleanup) = std::fs::remove_file(destination) {
                        tracing::warn!(
                            "Could not remove partial file {}: {}",
                            destination.display(),
                            cleanup
                        );
                    }
                }
            }
        }
    }

    tracing::error!("Giving up on {} after {} attempts", source_url, max_attempts);
    DownloadOutcome::Failed { error: last_error }
}

/// Streams one HTTP response body to disk, returning the byte count
async fn stream_to_file(
    client: &reqwest::Client,
    source_url: &str,
    destination: &Path,
) -> crate::Result<u64> {
    let mut response = client
        .get(source_url)
        .send()
        .await?
        .error_for_status()?;

    let total = response.content_length();
    let mut file = tokio::fs::File::create(destination).await?;
    let mut written: u64 = 0;
    let mut last_report = Instant::now();

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;

        if last_report.elapsed() >= PROGRESS_INTERVAL {
            match total {
                Some(total) => tracing::info!(
                    "Downloading {}: {}/{} bytes",
                    destination.display(),
                    written,
                    total
                ),
                None => tracing::info!(
                    "Downloading {}: {} bytes",
                    destination.display(),
                    written
                ),
            }
            last_report = Instant::now();
        }
    }

    file.flush().await?;
    Ok(written)
}
