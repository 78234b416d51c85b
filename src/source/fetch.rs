//! Script Acquisition
//!
//! Reading scripts from disk and downloading them over HTTP.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::header::{HeaderMap, ACCEPT, CACHE_CONTROL, EXPIRES};
use reqwest::{redirect, Client};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::PacError;

/// Accept header advertising the PAC content type
pub const PAC_ACCEPT: &str = "application/x-ns-proxy-autoconfig, */*;q=0.8";

/// Decoding used when the response names no charset
pub const DEFAULT_CHARSET: &str = "ISO-8859-1";

const MAX_REDIRECTS: usize = 10;

/// A downloaded script and the expiry its response announced
#[derive(Debug)]
pub struct Download {
    pub content: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Build the HTTP client used for script downloads
pub fn build_client(connect_timeout: Duration, read_timeout: Duration) -> Result<Client, PacError> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .read_timeout(read_timeout)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
        // The script tells us which proxy to use; it must not be fetched through one.
        .no_proxy()
        .build()
        .map_err(|e| PacError::Config(format!("failed to build HTTP client: {}", e)))
}

/// Read a script file as text
pub async fn read_file(path: &Path) -> Result<String, PacError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PacError::fetch(path.display(), e))?;

    Ok(normalize_line_endings(&String::from_utf8_lossy(&bytes)))
}

/// Download a script, honouring the response charset and cache headers
pub async fn download(client: &Client, url: &Url, now: DateTime<Utc>) -> Result<Download, PacError> {
    let response = client
        .get(url.clone())
        .header(ACCEPT, PAC_ACCEPT)
        .send()
        .await
        .map_err(|e| PacError::fetch(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PacError::fetch(url, format!("server returned {}", status)));
    }

    let expires_at = expiry_from_headers(response.headers(), now);
    debug!(url = %url, status = %status, expires_at = ?expires_at, "PAC script response received");

    let text = response
        .text_with_charset(DEFAULT_CHARSET)
        .await
        .map_err(|e| PacError::fetch(url, e))?;

    Ok(Download {
        content: normalize_line_endings(&text),
        expires_at,
    })
}

/// Convert CR and CRLF line breaks to LF; a non-empty script always ends in LF
pub fn normalize_line_endings(text: &str) -> String {
    let mut normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

/// Expiry announced by a response; `None` when it says nothing
pub fn expiry_from_headers(headers: &HeaderMap, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(cache_control) = headers.get(CACHE_CONTROL).and_then(|v| v.to_str().ok()) {
        for directive in cache_control.split(',') {
            let directive = directive.trim().to_ascii_lowercase();
            if directive == "no-cache" || directive == "no-store" {
                return Some(now);
            }
            if let Some(seconds) = directive.strip_prefix("max-age=") {
                if let Ok(seconds) = seconds.trim_matches('"').parse::<i64>() {
                    return Some(now + ChronoDuration::seconds(seconds.max(0)));
                }
            }
        }
    }

    let expires = headers.get(EXPIRES)?.to_str().ok()?;
    match DateTime::parse_from_rfc2822(expires.trim()) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        // An unparsable Expires means "already expired".
        Err(_) => Some(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_normalize_line_endings() {
        assert_eq!(normalize_line_endings("a\r\nb\rc"), "a\nb\nc\n");
        assert_eq!(normalize_line_endings("a\n"), "a\n");
        assert_eq!(normalize_line_endings(""), "");
    }

    #[test]
    fn test_max_age_wins_over_expires() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("public, max-age=120"));
        headers.insert(EXPIRES, HeaderValue::from_static("Thu, 01 Jan 2026 05:00:00 GMT"));
        assert_eq!(
            expiry_from_headers(&headers, now()),
            Some(now() + ChronoDuration::seconds(120))
        );
    }

    #[test]
    fn test_no_cache_expires_immediately() {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        assert_eq!(expiry_from_headers(&headers, now()), Some(now()));
    }

    #[test]
    fn test_expires_header() {
        let mut headers = HeaderMap::new();
        headers.insert(EXPIRES, HeaderValue::from_static("Thu, 01 Jan 2026 01:00:00 GMT"));
        assert_eq!(
            expiry_from_headers(&headers, now()),
            Some(now() + ChronoDuration::hours(1))
        );

        headers.insert(EXPIRES, HeaderValue::from_static("0"));
        assert_eq!(expiry_from_headers(&headers, now()), Some(now()));
    }

    #[test]
    fn test_no_headers_means_no_expiry() {
        assert_eq!(expiry_from_headers(&HeaderMap::new(), now()), None);
    }
}
