//! Proxy Resolver
//!
//! Entry point for callers: validates the request, decides whether the
//! script should be consulted at all, then runs source, engine and parser
//! in turn.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::parser;
use super::types::{NoDecisionReason, ResolutionRequest, Selection};
use crate::clock::Clock;
use crate::config::{BypassPolicy, Config};
use crate::engine::ScriptEngine;
use crate::error::PacError;
use crate::metrics::PacMetrics;
use crate::predicates::PredicateLibrary;
use crate::source::{ScriptLocation, ScriptSource};

/// Resolves proxy candidates for URLs from one PAC script
pub struct Resolver {
    source: Arc<ScriptSource>,
    engine: ScriptEngine,
    bypass: BypassPolicy,
    metrics: Arc<PacMetrics>,
}

impl Resolver {
    /// Build the full pipeline from configuration
    pub fn new(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, PacError> {
        let source = config
            .script
            .source
            .as_deref()
            .ok_or_else(|| PacError::Config("no PAC script source configured".to_string()))?;
        let location = ScriptLocation::parse(source)?;
        let source = ScriptSource::new(location, &config.script, clock.clone())?;

        Self::from_parts(Arc::new(source), config, clock)
    }

    /// Build around an existing script source
    pub fn from_parts(
        source: Arc<ScriptSource>,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PacError> {
        let library = PredicateLibrary::new(clock, &config.predicates);
        let engine = ScriptEngine::new(library, &config.engine)?;

        info!(
            source = %source.location(),
            bypass = ?config.resolver.bypass,
            evaluation_timeout = ?config.engine.evaluation_timeout,
            "PAC resolver ready"
        );

        Ok(Self {
            source,
            engine,
            bypass: config.resolver.bypass,
            metrics: Arc::new(PacMetrics::new()),
        })
    }

    pub fn source(&self) -> &Arc<ScriptSource> {
        &self.source
    }

    pub fn metrics(&self) -> &Arc<PacMetrics> {
        &self.metrics
    }

    /// Ordered proxy candidates for a request.
    ///
    /// Script failures become [`Selection::NoDecision`]; fetch failures and
    /// invalid requests are returned as errors.
    pub async fn select(&self, request: &ResolutionRequest) -> Result<Selection, PacError> {
        if request.host.trim().is_empty() {
            return Err(PacError::Validation("request host is empty".to_string()));
        }
        self.metrics.record_resolution();

        if self.should_bypass(&request.host).await {
            debug!(host = %request.host, "Bypassing PAC evaluation");
            self.metrics.record_bypass();
            return Ok(Selection::NoDecision {
                reason: NoDecisionReason::Bypassed,
            });
        }

        let script = match self.source.load().await {
            Ok(script) => script,
            Err(e) => {
                self.metrics.record_fetch_failure();
                return Err(e);
            }
        };

        let started = Instant::now();
        let evaluated = self.engine.evaluate(script, &request.url, &request.host).await;
        self.metrics.observe_evaluation(started.elapsed());

        let answer = match evaluated {
            Ok(answer) => answer,
            Err(e) if e.is_evaluation() => {
                warn!(url = %request.url, error = %e, "PAC evaluation failed, no decision");
                self.metrics.record_evaluation_failure();
                return Ok(Selection::NoDecision {
                    reason: NoDecisionReason::EvaluationFailed(e.to_string()),
                });
            }
            Err(e) => return Err(e),
        };

        let parsed = parser::parse(&answer);
        for rejected in &parsed.rejected {
            warn!(url = %request.url, error = %rejected, "Skipping malformed proxy spec");
        }
        self.metrics.record_rejected_candidates(parsed.rejected.len());

        debug!(
            url = %request.url,
            answer = %answer,
            candidates = parsed.candidates.len(),
            "PAC answer parsed"
        );

        Ok(Selection::Proxies {
            candidates: parsed.candidates,
        })
    }

    /// Parse `url`, take its host and select
    pub async fn select_url(&self, url: &str) -> Result<Selection, PacError> {
        let request = ResolutionRequest::from_url(url)?;
        self.select(&request).await
    }

    /// Requests to the script's own server must not be routed by the script.
    ///
    /// The script-text rule is a substring test on the cached text, so it also
    /// skips hosts the script merely mentions.
    async fn should_bypass(&self, host: &str) -> bool {
        let serves_script = self
            .source
            .location()
            .remote_host()
            .is_some_and(|source_host| source_host.eq_ignore_ascii_case(host));
        if serves_script {
            return true;
        }

        match self.bypass {
            BypassPolicy::SourceHost => false,
            BypassPolicy::ScriptText => self
                .source
                .cached()
                .await
                .is_some_and(|script| script.contains(host)),
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("source", self.source.location())
            .field("engine", &self.engine)
            .field("bypass", &self.bypass)
            .finish()
    }
}
