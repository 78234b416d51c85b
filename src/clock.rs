//! Injectable Clock
//!
//! Date and time predicates, and the script cache's expiry checks, read the
//! current time through [`Clock`] so evaluation can be made deterministic.

use chrono::{DateTime, Duration, FixedOffset, Local};
use std::fmt;
use std::sync::RwLock;

/// Source of "now" for predicates and cache expiry
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current local time, carrying the local UTC offset
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall-clock time in the host's local timezone
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Parse an RFC 3339 timestamp such as `2026-10-17T09:30:00+02:00`
    pub fn parse(timestamp: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(timestamp).map(Self::new)
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        match self.now.write() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
