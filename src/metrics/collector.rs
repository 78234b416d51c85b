//! Metrics Collector

use super::ResolverStats;
use prometheus::{Counter, Histogram, HistogramOpts, Registry, TextEncoder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::error;

/// Counters for resolver activity, exportable in Prometheus text format
pub struct PacMetrics {
    prometheus_registry: Registry,

    // Prometheus metrics
    resolutions_total: Counter,
    bypassed_total: Counter,
    no_decision_total: Counter,
    fetch_failures_total: Counter,
    evaluation_failures_total: Counter,
    rejected_candidates_total: Counter,
    evaluation_duration: Histogram,

    // Internal counters
    resolutions: AtomicU64,
    bypassed: AtomicU64,
    no_decisions: AtomicU64,
    fetch_failures: AtomicU64,
    evaluation_failures: AtomicU64,
    rejected_candidates: AtomicU64,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Counter {
    let counter = Counter::new(name, help).expect("Failed to create counter");
    registry
        .register(Box::new(counter.clone()))
        .expect("Failed to register counter");
    counter
}

impl PacMetrics {
    pub fn new() -> Self {
        let prometheus_registry = Registry::new();

        let resolutions_total = counter(
            &prometheus_registry,
            "pac_resolutions_total",
            "Total proxy lookups handled by the resolver",
        );
        let bypassed_total = counter(
            &prometheus_registry,
            "pac_bypassed_total",
            "Lookups answered without evaluating the script",
        );
        let no_decision_total = counter(
            &prometheus_registry,
            "pac_no_decision_total",
            "Lookups that ended without a PAC-driven answer",
        );
        let fetch_failures_total = counter(
            &prometheus_registry,
            "pac_fetch_failures_total",
            "Failed attempts to read or download the PAC script",
        );
        let evaluation_failures_total = counter(
            &prometheus_registry,
            "pac_evaluation_failures_total",
            "Script evaluations that failed or timed out",
        );
        let rejected_candidates_total = counter(
            &prometheus_registry,
            "pac_rejected_candidates_total",
            "Malformed proxy specs dropped from script answers",
        );

        let evaluation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "pac_evaluation_duration_seconds",
                "Time spent evaluating FindProxyForURL",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )
        .expect("Failed to create evaluation_duration histogram");
        prometheus_registry
            .register(Box::new(evaluation_duration.clone()))
            .expect("Failed to register evaluation_duration");

        Self {
            prometheus_registry,
            resolutions_total,
            bypassed_total,
            no_decision_total,
            fetch_failures_total,
            evaluation_failures_total,
            rejected_candidates_total,
            evaluation_duration,
            resolutions: AtomicU64::new(0),
            bypassed: AtomicU64::new(0),
            no_decisions: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            evaluation_failures: AtomicU64::new(0),
            rejected_candidates: AtomicU64::new(0),
        }
    }

    pub fn record_resolution(&self) {
        self.resolutions_total.inc();
        self.resolutions.fetch_add(1, Ordering::Relaxed);
    }

    /// A bypass is also a no-decision outcome
    pub fn record_bypass(&self) {
        self.bypassed_total.inc();
        self.bypassed.fetch_add(1, Ordering::Relaxed);
        self.record_no_decision();
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures_total.inc();
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A failed evaluation is also a no-decision outcome
    pub fn record_evaluation_failure(&self) {
        self.evaluation_failures_total.inc();
        self.evaluation_failures.fetch_add(1, Ordering::Relaxed);
        self.record_no_decision();
    }

    pub fn record_rejected_candidates(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.rejected_candidates_total.inc_by(count as f64);
        self.rejected_candidates
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn observe_evaluation(&self, elapsed: Duration) {
        self.evaluation_duration.observe(elapsed.as_secs_f64());
    }

    fn record_no_decision(&self) {
        self.no_decision_total.inc();
        self.no_decisions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            resolutions: self.resolutions.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
            no_decisions: self.no_decisions.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            evaluation_failures: self.evaluation_failures.load(Ordering::Relaxed),
            rejected_candidates: self.rejected_candidates.load(Ordering::Relaxed),
        }
    }

    /// Export all metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.prometheus_registry.gather();

        match encoder.encode_to_string(&metric_families) {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Failed to encode Prometheus metrics");
                String::new()
            }
        }
    }
}

impl Default for PacMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PacMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacMetrics")
            .field("stats", &self.stats())
            .finish()
    }
}
