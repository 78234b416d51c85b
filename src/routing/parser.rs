//! PAC answer parser
//!
//! Turns the string returned by `FindProxyForURL` into ordered
//! [`ProxyCandidate`]s. Grammar: `;`-separated specs such as
//! `PROXY host:port`, `HTTPS host`, `SOCKS host:port` or `DIRECT`.

use tracing::debug;

use super::types::{ParsedAnswer, ProxyCandidate, ProxyEndpoint};
use crate::error::PacError;

/// Segments shorter than the shortest keyword plus a space degrade to DIRECT
const MIN_SPEC_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Http,
    Https,
    Socks4,
    Socks5,
}

impl Keyword {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "PROXY" | "HTTP" => Some(Keyword::Http),
            "HTTPS" => Some(Keyword::Https),
            "SOCKS" | "SOCKS5" => Some(Keyword::Socks5),
            "SOCKS4" => Some(Keyword::Socks4),
            _ => None,
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Keyword::Https => 443,
            _ => 80,
        }
    }

    fn candidate(self, endpoint: ProxyEndpoint) -> ProxyCandidate {
        match self {
            Keyword::Http => ProxyCandidate::Http(endpoint),
            Keyword::Https => ProxyCandidate::Https(endpoint),
            Keyword::Socks4 => ProxyCandidate::Socks4(endpoint),
            Keyword::Socks5 => ProxyCandidate::Socks5(endpoint),
        }
    }
}

/// Parse a whole answer, keeping the script's order.
///
/// Malformed segments are dropped and reported in
/// [`ParsedAnswer::rejected`]; the remaining segments still parse.
pub fn parse(answer: &str) -> ParsedAnswer {
    let mut parsed = ParsedAnswer::default();
    for segment in answer.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        match parse_spec(segment) {
            Ok(candidate) => parsed.candidates.push(candidate),
            Err(e) => parsed.rejected.push(e),
        }
    }
    parsed
}

/// Parse one trimmed, non-empty segment
pub fn parse_spec(segment: &str) -> Result<ProxyCandidate, PacError> {
    if starts_with_ignore_case(segment, "DIRECT") || segment.len() < MIN_SPEC_LEN {
        return Ok(ProxyCandidate::Direct);
    }

    let (token, rest) = match segment.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim()),
        None => (segment, ""),
    };

    let keyword = match Keyword::from_token(token) {
        Some(keyword) if !rest.is_empty() => keyword,
        _ => {
            debug!(segment = %segment, "Unrecognised proxy spec, treating as DIRECT");
            return Ok(ProxyCandidate::Direct);
        }
    };

    let endpoint = parse_endpoint(segment, rest, keyword.default_port())?;
    Ok(keyword.candidate(endpoint))
}

fn parse_endpoint(segment: &str, address: &str, default_port: u16) -> Result<ProxyEndpoint, PacError> {
    let (host, port) = split_host_port(address);
    if host.is_empty() {
        return Err(PacError::parse(segment, "missing proxy host"));
    }

    let port = match port {
        None => default_port,
        Some(text) => match text.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(PacError::parse(segment, format!("invalid port '{}'", text)));
            }
            Ok(port) => port,
        },
    };

    Ok(ProxyEndpoint::new(host, port))
}

/// Split `host[:port]`, understanding `[v6]:port` and bare IPv6 literals
fn split_host_port(address: &str) -> (&str, Option<&str>) {
    if let Some(bracketed) = address.strip_prefix('[') {
        return match bracketed.split_once(']') {
            Some((host, rest)) => (host.trim(), rest.trim_start().strip_prefix(':').map(str::trim)),
            None => (address, None),
        };
    }
    if address.matches(':').count() > 1 {
        return (address, None);
    }
    match address.rsplit_once(':') {
        Some((host, port)) => (host.trim(), Some(port.trim())),
        None => (address, None),
    }
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
