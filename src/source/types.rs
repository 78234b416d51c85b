//! Script Source Types

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

use crate::error::PacError;

/// Where a PAC script lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLocation {
    /// Local file, given as a plain path or a `file://` URL
    File(PathBuf),
    /// `http://` or `https://` resource
    Remote(Url),
    /// Script text held in memory
    Inline(Arc<str>),
}

impl ScriptLocation {
    /// Classify a configured script source
    pub fn parse(source: &str) -> Result<Self, PacError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(PacError::Config("empty script source".to_string()));
        }

        if !source.contains("://") {
            return Ok(ScriptLocation::File(PathBuf::from(source)));
        }

        let url = Url::parse(source)
            .map_err(|e| PacError::Config(format!("invalid script URL '{}': {}", source, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(ScriptLocation::Remote(url)),
            "file" => url
                .to_file_path()
                .map(ScriptLocation::File)
                .map_err(|_| PacError::Config(format!("'{}' is not a local file URL", source))),
            scheme => Err(PacError::Config(format!(
                "unsupported script source scheme '{}'",
                scheme
            ))),
        }
    }

    pub fn inline(script: impl Into<Arc<str>>) -> Self {
        ScriptLocation::Inline(script.into())
    }

    /// Host serving the script, for remote sources
    pub fn remote_host(&self) -> Option<&str> {
        match self {
            ScriptLocation::Remote(url) => url.host_str(),
            _ => None,
        }
    }

    pub fn file_path(&self) -> Option<&PathBuf> {
        match self {
            ScriptLocation::File(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptLocation::File(path) => write!(f, "{}", path.display()),
            ScriptLocation::Remote(url) => write!(f, "{}", url),
            ScriptLocation::Inline(_) => write!(f, "<inline>"),
        }
    }
}

/// One acquired copy of the script; replaced as a whole on refresh
#[derive(Debug, Clone)]
pub struct CachedScript {
    pub content: Arc<str>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedScript {
    /// Stale once the clock reaches the recorded expiry; never without one
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_parse_plain_path() {
        assert_eq!(
            ScriptLocation::parse("/etc/proxy.pac").unwrap(),
            ScriptLocation::File(PathBuf::from("/etc/proxy.pac"))
        );
        assert_eq!(
            ScriptLocation::parse("conf/proxy.pac").unwrap(),
            ScriptLocation::File(PathBuf::from("conf/proxy.pac"))
        );
    }

    #[test]
    fn test_parse_file_url() {
        assert_eq!(
            ScriptLocation::parse("file:///srv/pac/wpad.dat").unwrap(),
            ScriptLocation::File(PathBuf::from("/srv/pac/wpad.dat"))
        );
    }

    #[test]
    fn test_parse_remote() {
        let location = ScriptLocation::parse("http://wpad.corp.example/wpad.dat").unwrap();
        assert_eq!(location.remote_host(), Some("wpad.corp.example"));
        assert!(ScriptLocation::parse("https://pac.example.org/proxy.pac").is_ok());
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(matches!(
            ScriptLocation::parse("ftp://pac.example.org/proxy.pac"),
            Err(PacError::Config(_))
        ));
        assert!(ScriptLocation::parse("   ").is_err());
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let fetched_at = Utc::now();
        let cached = CachedScript {
            content: Arc::from("function FindProxyForURL(u, h) { return 'DIRECT'; }"),
            fetched_at,
            expires_at: Some(fetched_at + Duration::seconds(60)),
        };
        assert!(!cached.is_expired(fetched_at));
        assert!(!cached.is_expired(fetched_at + Duration::seconds(59)));
        assert!(cached.is_expired(fetched_at + Duration::seconds(60)));

        let forever = CachedScript {
            expires_at: None,
            ..cached
        };
        assert!(!forever.is_expired(fetched_at + Duration::days(3650)));
    }
}
