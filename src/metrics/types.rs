//! Metrics Types

use serde::Serialize;

/// Point-in-time view of the resolver counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolverStats {
    pub resolutions: u64,
    pub bypassed: u64,
    pub no_decisions: u64,
    pub fetch_failures: u64,
    pub evaluation_failures: u64,
    pub rejected_candidates: u64,
}

impl ResolverStats {
    /// Lookups that produced at least one candidate list
    pub fn answered(&self) -> u64 {
        self.resolutions
            .saturating_sub(self.no_decisions)
            .saturating_sub(self.fetch_failures)
    }
}
