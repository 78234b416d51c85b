//! Configuration Types

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub script: ScriptConfig,
    pub engine: EngineConfig,
    pub predicates: PredicateConfig,
    pub resolver: ResolverConfig,
    pub logging: LoggingConfig,
}

/// Where the PAC script comes from and how it is fetched
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Local path, `file://` URL or `http(s)://` URL
    pub source: Option<String>,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub read_timeout: Duration,
    /// Lifetime given to scripts whose source announces no expiry
    #[serde(with = "humantime_serde")]
    pub fallback_ttl: Option<Duration>,
    /// Drop the cached script when a file-backed source changes on disk
    pub watch: bool,
}

/// Interpreter limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(with = "humantime_serde")]
    pub evaluation_timeout: Duration,
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
}

/// Values the predicate library consults at evaluation time
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PredicateConfig {
    /// Forces the answer of `myIpAddress()` / `myIpAddressEx()`
    pub local_ip_override: Option<IpAddr>,
}

/// Resolver behaviour
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub bypass: BypassPolicy,
}

/// When the resolver skips the script for a host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BypassPolicy {
    /// Skip when the cached script text mentions the host, or the host serves the script
    #[default]
    ScriptText,
    /// Skip only when the host serves the script
    SourceHost,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            source: None,
            connect_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(20),
            fallback_ttl: None,
            watch: false,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evaluation_timeout: Duration::from_secs(10),
            loop_iteration_limit: 10_000_000,
            recursion_limit: 512,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
