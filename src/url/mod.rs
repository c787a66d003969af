//! URL handling for the archiver
//!
//! This module owns two concerns:
//! - canonicalization of media source URLs, which strips the signed/expiring
//!   query parameters a CDN attaches so that the same asset always maps to
//!   the same cache key
//! - construction and deconstruction of the site's post, feed, and profile
//!   URLs

use crate::UrlError;
use url::Url;

/// Canonicalizes a media source URL for use as a de-duplication key
///
/// Strips the query string and fragment. Signed variants of the same asset
/// (`.../a.jpg?sig=1`, `.../a.jpg?sig=2`) canonicalize to the same value.
///
/// # Arguments
///
/// * `source` - The raw media source URL as extracted from the page
///
/// # Returns
///
/// * `Ok(String)` - The canonical URL
/// * `Err(UrlError)` - The source was not a parseable absolute URL
///
/// # Examples
///
/// ```
/// use feedvault::url::canonicalize_media_url;
///
/// let canonical = canonicalize_media_url("https://cdn.example/a.jpg?sig=abc#frag").unwrap();
/// assert_eq!(canonical, "https://cdn.example/a.jpg");
/// ```
pub fn canonicalize_media_url(source: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(source).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    url.set_query(None);
    url.set_fragment(None);

    Ok(url.into())
}

/// Extracts the file extension from a media source URL's path
///
/// Returns `None` when the final path segment has no extension.
pub fn media_file_extension(source: &str) -> Option<String> {
    let url = Url::parse(source).ok()?;
    let segment = url.path_segments()?.last()?.to_string();

    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_string()),
        _ => None,
    }
}

/// Builds the canonical URL of a post from its remote identifier
///
/// The site addresses posts as `{base}/{remote_id}/{author_id}`.
pub fn post_url(base_url: &str, remote_id: &str, author_id: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.trim_end_matches('/'),
        remote_id,
        author_id
    )
}

/// Builds the URL of an author's media feed, sorted oldest-first by the site
pub fn feed_url(base_url: &str, author_id: &str) -> String {
    format!(
        "{}/{}/media?order=publish_date_asc",
        base_url.trim_end_matches('/'),
        author_id
    )
}

/// Builds the URL of an author's profile page
pub fn profile_url(base_url: &str, author_id: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), author_id)
}

/// Parses the remote post identifier out of a canonical post URL
///
/// The remote id is the first path segment of `{base}/{remote_id}/{author_id}`.
/// Returns `None` for URLs that do not look like post URLs.
pub fn post_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;

    match segments.next() {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => None,
    }
}
