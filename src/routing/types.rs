//! Routing Types

use serde::Serialize;
use std::fmt;
use url::Url;

use crate::error::PacError;

/// Proxy host and port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// One entry of a PAC answer, in the order the script listed it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProxyCandidate {
    Direct,
    Http(ProxyEndpoint),
    Https(ProxyEndpoint),
    Socks4(ProxyEndpoint),
    Socks5(ProxyEndpoint),
}

impl ProxyCandidate {
    pub fn endpoint(&self) -> Option<&ProxyEndpoint> {
        match self {
            ProxyCandidate::Direct => None,
            ProxyCandidate::Http(endpoint)
            | ProxyCandidate::Https(endpoint)
            | ProxyCandidate::Socks4(endpoint)
            | ProxyCandidate::Socks5(endpoint) => Some(endpoint),
        }
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, ProxyCandidate::Direct)
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyCandidate::Direct => "direct",
            ProxyCandidate::Http(_) => "http",
            ProxyCandidate::Https(_) => "https",
            ProxyCandidate::Socks4(_) => "socks4",
            ProxyCandidate::Socks5(_) => "socks5",
        }
    }

    /// URL form accepted by most HTTP clients, e.g. `socks5://host:1080`
    pub fn to_url(&self) -> String {
        match self.endpoint() {
            Some(endpoint) => format!("{}://{}", self.scheme(), endpoint),
            None => "direct://".to_string(),
        }
    }
}

impl fmt::Display for ProxyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyCandidate::Direct => write!(f, "DIRECT"),
            ProxyCandidate::Http(endpoint) => write!(f, "PROXY {}", endpoint),
            ProxyCandidate::Https(endpoint) => write!(f, "HTTPS {}", endpoint),
            ProxyCandidate::Socks4(endpoint) => write!(f, "SOCKS4 {}", endpoint),
            ProxyCandidate::Socks5(endpoint) => write!(f, "SOCKS5 {}", endpoint),
        }
    }
}

/// Target of one proxy lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub url: String,
    pub host: String,
}

impl ResolutionRequest {
    pub fn new(url: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            host: host.into(),
        }
    }

    /// Build a request from a URL, taking the host from it
    pub fn from_url(url: &str) -> Result<Self, PacError> {
        let parsed = Url::parse(url)
            .map_err(|e| PacError::Validation(format!("invalid URL '{}': {}", url, e)))?;
        let host = match parsed.host() {
            Some(url::Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => {
                return Err(PacError::Validation(format!("URL '{}' has no host", url)));
            }
        };
        Ok(Self::new(url, host))
    }
}

/// Why the resolver declined to answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "kebab-case")]
pub enum NoDecisionReason {
    /// The request targets the PAC script itself
    Bypassed,
    /// The script failed; the caller should fall back to its default
    EvaluationFailed(String),
}

impl fmt::Display for NoDecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoDecisionReason::Bypassed => write!(f, "request bypasses PAC evaluation"),
            NoDecisionReason::EvaluationFailed(reason) => write!(f, "{}", reason),
        }
    }
}

/// Result of a resolver lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "selection", rename_all = "kebab-case")]
pub enum Selection {
    /// Ordered candidates. Empty when the answer held no usable spec,
    /// which callers treat like `DIRECT`.
    Proxies { candidates: Vec<ProxyCandidate> },
    /// No PAC-driven answer; use the platform default
    NoDecision { reason: NoDecisionReason },
}

impl Selection {
    pub fn candidates(&self) -> &[ProxyCandidate] {
        match self {
            Selection::Proxies { candidates } => candidates,
            Selection::NoDecision { .. } => &[],
        }
    }

    pub fn is_no_decision(&self) -> bool {
        matches!(self, Selection::NoDecision { .. })
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Proxies { candidates } => {
                let parts: Vec<String> = candidates.iter().map(|c| c.to_string()).collect();
                write!(f, "{}", parts.join("; "))
            }
            Selection::NoDecision { reason } => write!(f, "NO-DECISION ({})", reason),
        }
    }
}

/// A parsed answer plus the segments that had to be dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedAnswer {
    pub candidates: Vec<ProxyCandidate>,
    pub rejected: Vec<PacError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_display_and_url() {
        let proxy = ProxyCandidate::Http(ProxyEndpoint::new("proxy.corp", 8080));
        assert_eq!(proxy.to_string(), "PROXY proxy.corp:8080");
        assert_eq!(proxy.to_url(), "http://proxy.corp:8080");

        let socks = ProxyCandidate::Socks5(ProxyEndpoint::new("::1", 1080));
        assert_eq!(socks.to_string(), "SOCKS5 [::1]:1080");
        assert_eq!(socks.to_url(), "socks5://[::1]:1080");

        assert_eq!(ProxyCandidate::Direct.to_string(), "DIRECT");
        assert_eq!(ProxyCandidate::Direct.to_url(), "direct://");
        assert!(ProxyCandidate::Direct.endpoint().is_none());
    }

    #[test]
    fn test_request_from_url() {
        let request = ResolutionRequest::from_url("https://www.example.com:8443/a?b=c").unwrap();
        assert_eq!(request.host, "www.example.com");
        assert_eq!(request.url, "https://www.example.com:8443/a?b=c");

        let request = ResolutionRequest::from_url("http://[2001:db8::1]/").unwrap();
        assert_eq!(request.host, "2001:db8::1");
    }

    #[test]
    fn test_request_from_url_without_host() {
        assert!(matches!(
            ResolutionRequest::from_url("mailto:someone@example.com"),
            Err(PacError::Validation(_))
        ));
        assert!(matches!(
            ResolutionRequest::from_url("not a url"),
            Err(PacError::Validation(_))
        ));
    }

    #[test]
    fn test_selection_serializes() {
        let selection = Selection::Proxies {
            candidates: vec![
                ProxyCandidate::Socks4(ProxyEndpoint::new("s", 1080)),
                ProxyCandidate::Direct,
            ],
        };
        let json = serde_json::to_value(&selection).unwrap();
        assert_eq!(json["selection"], "proxies");
        assert_eq!(json["candidates"][0]["type"], "socks4");
        assert_eq!(json["candidates"][0]["port"], 1080);
        assert_eq!(json["candidates"][1]["type"], "direct");
        assert_eq!(selection.to_string(), "SOCKS4 s:1080; DIRECT");

        let none = Selection::NoDecision {
            reason: NoDecisionReason::Bypassed,
        };
        let json = serde_json::to_value(&none).unwrap();
        assert_eq!(json["selection"], "no-decision");
        assert_eq!(json["reason"]["reason"], "bypassed");
    }
}
