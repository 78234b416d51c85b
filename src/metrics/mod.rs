//! Metrics Module
//!
//! Resolver counters and their Prometheus export.

pub mod collector;
pub mod types;

pub use collector::PacMetrics;
pub use types::ResolverStats;
