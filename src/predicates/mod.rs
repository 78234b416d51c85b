//! Predicate Library
//!
//! The fixed set of helper functions a PAC script may call
//! (`isPlainHostName`, `isInNet`, `shExpMatch`, `weekdayRange`, ...).
//! Everything here is plain Rust; the script engine only converts values.

pub mod host;
pub mod network;
pub mod time;

use chrono::{DateTime, FixedOffset};
use std::cell::Cell;
use std::net::IpAddr;
use std::sync::Arc;

use crate::clock::Clock;
use crate::config::PredicateConfig;

pub use host::{dns_domain_is, dns_domain_levels, is_plain_host_name, local_host_or_domain_is, sh_exp_match};

/// Version reported by `getClientVersion()`
pub const CLIENT_VERSION: &str = "1.0";

/// Marker that switches date and time predicates to GMT
pub const GMT: &str = "GMT";

/// A script value handed to the variable-arity time predicates
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    Number(f64),
    Text(String),
    Missing,
}

impl ScriptArg {
    pub fn is_gmt(&self) -> bool {
        matches!(self, ScriptArg::Text(text) if text.eq_ignore_ascii_case(GMT))
    }

    /// Integer value, truncated toward zero
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptArg::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScriptArg::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<i32> for ScriptArg {
    fn from(n: i32) -> Self {
        ScriptArg::Number(f64::from(n))
    }
}

impl From<i64> for ScriptArg {
    fn from(n: i64) -> Self {
        ScriptArg::Number(n as f64)
    }
}

impl From<&str> for ScriptArg {
    fn from(text: &str) -> Self {
        ScriptArg::Text(text.to_string())
    }
}

/// Host functions exposed to PAC scripts.
///
/// Time predicates read a clock reading pinned for the whole evaluation
/// (see [`PredicateLibrary::pin_clock`]); outside an evaluation they read
/// the clock directly.
#[derive(Debug, Clone)]
pub struct PredicateLibrary {
    clock: Arc<dyn Clock>,
    local_ip_override: Option<IpAddr>,
    pinned_now: Cell<Option<DateTime<FixedOffset>>>,
}

impl PredicateLibrary {
    pub fn new(clock: Arc<dyn Clock>, config: &PredicateConfig) -> Self {
        Self {
            clock,
            local_ip_override: config.local_ip_override,
            pinned_now: Cell::new(None),
        }
    }

    pub fn local_ip_override(&self) -> Option<IpAddr> {
        self.local_ip_override
    }

    /// Take one clock reading and use it until [`release_clock`](Self::release_clock)
    pub fn pin_clock(&self) -> DateTime<FixedOffset> {
        let now = self.clock.now();
        self.pinned_now.set(Some(now));
        now
    }

    pub fn release_clock(&self) {
        self.pinned_now.set(None);
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.pinned_now.get().unwrap_or_else(|| self.clock.now())
    }

    pub fn client_version(&self) -> &'static str {
        CLIENT_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    #[test]
    fn test_pinned_clock_ignores_later_changes() {
        let clock = Arc::new(FixedClock::parse("2026-05-01T08:00:00Z").unwrap());
        let library = PredicateLibrary::new(clock.clone(), &PredicateConfig::default());

        let pinned = library.pin_clock();
        clock.advance(chrono::Duration::hours(3));
        assert_eq!(library.now(), pinned);

        library.release_clock();
        assert_eq!(library.now(), clock.now());
    }

    #[test]
    fn test_script_arg_conversions() {
        assert_eq!(ScriptArg::Number(14.9).as_int(), Some(14));
        assert_eq!(ScriptArg::Number(f64::NAN).as_int(), None);
        assert!(ScriptArg::from("gmt").is_gmt());
        assert!(!ScriptArg::from(3).is_gmt());
        assert_eq!(ScriptArg::from("JAN").as_text(), Some("JAN"));
        assert_eq!(ScriptArg::Missing.as_int(), None);
    }
}
