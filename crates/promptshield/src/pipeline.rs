//! Fallback detection pipeline.
//!
//! One pass per request: expand encoded candidates, then walk the enabled
//! models in priority order, each behind its own circuit breaker. The first
//! model that answers wins; a high-confidence score ends the walk early; a
//! fully failed chain degrades to a conservative verdict plus an
//! all-models-failed error for the transport.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::breaker::{BreakerStats, CircuitBreaker};
use crate::encoding;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::normalize::{self, Analysis};
use crate::providers::adapter_for;
use crate::registry::{ModelDescriptor, ModelRegistry};
use crate::types::{
    DetectionRequest, DetectionResponse, Diagnostics, HealthState, HealthStatus, ModelDiagnostic,
    ENDPOINT_FALLBACK_FAILED, ENDPOINT_NONE,
};

/// Default score at or above which a verdict is malicious.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Any candidate scoring at or above this ends the fallback chain.
const EARLY_EXIT_SCORE: f64 = 0.8;

/// Pause before moving on after a model failed outright. Open circuits skip
/// without waiting.
const INTER_MODEL_DELAY: Duration = Duration::from_millis(100);

pub struct FallbackPipeline {
    registry: ModelRegistry,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    http: HttpClient,
    metrics: Metrics,
    confidence_threshold: f64,
    started_at: Instant,
}

impl FallbackPipeline {
    pub fn new() -> Self {
        Self::with_registry(ModelRegistry::with_defaults())
    }

    pub fn with_registry(registry: ModelRegistry) -> Self {
        let pipeline = Self {
            registry,
            breakers: DashMap::new(),
            http: HttpClient::new(),
            metrics: Metrics::new(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            started_at: Instant::now(),
        };

        for model in pipeline.registry.enabled_ordered() {
            pipeline.breaker_for(&model);
            info!(
                model = %model.name,
                provider = model.provider.as_str(),
                priority = model.priority,
                failure_threshold = model.breaker.failure_threshold,
                "model registered for fallback"
            );
        }

        pipeline
    }

    /// Override the process-wide malicious threshold. Non-positive values
    /// keep the default.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        if threshold > 0.0 {
            self.confidence_threshold = threshold;
        }
        self
    }

    /// Analyze one request without an overall deadline; each model call is
    /// still bounded by its descriptor timeout.
    pub async fn analyze(&self, request: &DetectionRequest) -> Result<DetectionResponse> {
        self.analyze_with_deadline(request, None).await
    }

    /// Analyze one request. When `deadline` is set it bounds the whole pass:
    /// in-flight calls are capped to the remaining budget (an expiry there is
    /// a breaker failure), and once it is exhausted the walk stops with the
    /// degraded verdict.
    pub async fn analyze_with_deadline(
        &self,
        request: &DetectionRequest,
        deadline: Option<Instant>,
    ) -> Result<DetectionResponse> {
        let started = Instant::now();

        if request.text.is_empty() {
            return Ok(DetectionResponse {
                is_malicious: false,
                confidence: 0.0,
                threat_types: Vec::new(),
                processing_time_ms: elapsed_ms(started),
                reason: "Empty input - not malicious".to_string(),
                endpoint: ENDPOINT_NONE.to_string(),
            });
        }

        let threshold = self.effective_threshold(request);
        let candidates = encoding::expand(&request.text);
        let models = self.registry.enabled_ordered();

        debug!(
            text_len = request.text.len(),
            candidates = candidates.len(),
            models = models.len(),
            "starting detection pass"
        );

        let mut attempted: Vec<String> = Vec::new();
        let mut best: Option<Analysis> = None;

        'models: for model in &models {
            attempted.push(model.name.clone());
            let breaker = self.breaker_for(model);

            let mut model_succeeded = false;
            let mut model_failed = false;

            for candidate in &candidates {
                if let Err(retry_in) = breaker.allow().await {
                    warn!(
                        model = %model.name,
                        retry_in_ms = retry_in.as_millis() as u64,
                        "circuit open, skipping model"
                    );
                    break;
                }

                let Some(budget) = call_budget(model.timeout, deadline) else {
                    warn!(model = %model.name, "request deadline exhausted, stopping fallback walk");
                    break 'models;
                };

                match self.call_model(model, candidate, budget).await {
                    Ok(analysis) => {
                        breaker.record(true).await;
                        model_succeeded = true;
                        debug!(model = %model.name, score = analysis.score, "candidate scored");

                        let improved = match &best {
                            None => true,
                            Some(current) => analysis.score > current.score,
                        };
                        if improved {
                            best = Some(analysis);
                        }

                        if let Some(current) = &best {
                            if current.score >= EARLY_EXIT_SCORE {
                                return Ok(self.finish(
                                    current.clone(),
                                    &model.name,
                                    threshold,
                                    started,
                                ));
                            }
                        }
                    }
                    Err(e) => {
                        breaker.record(false).await;
                        model_failed = true;
                        warn!(model = %model.name, error = %e, "model call failed");
                    }
                }
            }

            if model_succeeded {
                if let Some(analysis) = best.take() {
                    return Ok(self.finish(analysis, &model.name, threshold, started));
                }
            }

            if model_failed {
                tokio::time::sleep(INTER_MODEL_DELAY).await;
            }
        }

        self.metrics.record_failure(started.elapsed());

        let response = DetectionResponse {
            is_malicious: false,
            confidence: 0.5,
            threat_types: Vec::new(),
            processing_time_ms: elapsed_ms(started),
            reason: format!(
                "All detection models unavailable (tried: [{}]) - returning safe classification",
                attempted.join(", ")
            ),
            endpoint: ENDPOINT_FALLBACK_FAILED.to_string(),
        };

        warn!(attempted = ?attempted, "all detection models failed");
        Err(Error::AllModelsFailed(Box::new(response)))
    }

    async fn call_model(
        &self,
        model: &ModelDescriptor,
        text: &str,
        budget: Duration,
    ) -> Result<Analysis> {
        let adapter = adapter_for(model.provider);
        let raw = adapter.call(&self.http, model, text, budget).await?;
        normalize::normalize(&raw)
    }

    fn finish(
        &self,
        analysis: Analysis,
        model_name: &str,
        threshold: f64,
        started: Instant,
    ) -> DetectionResponse {
        let response = DetectionResponse {
            is_malicious: analysis.score >= threshold,
            confidence: analysis.score,
            threat_types: analysis.threats,
            processing_time_ms: elapsed_ms(started),
            reason: analysis.reason,
            endpoint: model_name.to_string(),
        };

        self.metrics.record_success(started.elapsed(), &response);
        info!(
            model = model_name,
            confidence = response.confidence,
            is_malicious = response.is_malicious,
            duration_ms = response.processing_time_ms,
            "detection completed"
        );

        response
    }

    fn effective_threshold(&self, request: &DetectionRequest) -> f64 {
        request
            .config
            .as_ref()
            .and_then(|c| c.confidence_threshold)
            .filter(|t| *t > 0.0)
            .unwrap_or(self.confidence_threshold)
    }

    fn breaker_for(&self, model: &ModelDescriptor) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(model.name.clone())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(
                    model.name.clone(),
                    model.breaker.clone(),
                ))
            })
            .clone()
    }

    /// Health snapshot derived from breaker states. Never touches the
    /// providers.
    pub async fn health(&self) -> HealthStatus {
        let models = self.registry.enabled_ordered();

        let mut circuit_breakers = BTreeMap::new();
        let mut available = 0;
        for model in &models {
            let stats = self.breaker_for(model).stats().await;
            if !stats.is_open {
                available += 1;
            }
            circuit_breakers.insert(model.name.clone(), stats);
        }

        let status = if available == 0 {
            HealthState::Critical
        } else if available == models.len() {
            HealthState::Healthy
        } else {
            HealthState::Degraded
        };

        let snapshot = self.metrics.snapshot();
        HealthStatus {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
            requests_served: snapshot.requests_total,
            average_latency_ms: snapshot.average_latency_ms,
            models_available: available,
            total_models: models.len(),
            circuit_breakers,
            api_key_configured: self.registry.any_credential_configured(),
        }
    }

    pub async fn breaker_stats(&self) -> BTreeMap<String, BreakerStats> {
        // Clone the handles out first: map guards must not live across awaits.
        let breakers: Vec<(String, Arc<CircuitBreaker>)> = self
            .breakers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let mut stats = BTreeMap::new();
        for (name, breaker) in breakers {
            stats.insert(name, breaker.stats().await);
        }
        stats
    }

    /// Manually close a named breaker. Unknown names are an error the
    /// transport maps to 404.
    pub async fn reset_breaker(&self, name: &str) -> Result<()> {
        let Some(breaker) = self.breakers.get(name).map(|b| b.value().clone()) else {
            return Err(Error::ModelNotFound(name.to_string()));
        };
        breaker.reset().await;
        info!(model = name, "circuit breaker manually reset");
        Ok(())
    }

    /// Ordered descriptor dump with breaker state, plus the fallback chain
    /// rendered for humans.
    pub async fn diagnostics(&self) -> Diagnostics {
        let models = self.registry.enabled_ordered();

        let mut rows = Vec::with_capacity(models.len());
        let mut available = 0;
        for model in &models {
            let stats = self.breaker_for(model).stats().await;
            if !stats.is_open {
                available += 1;
            }
            rows.push(ModelDiagnostic {
                name: model.name.clone(),
                provider: model.provider,
                endpoint: model.endpoint.clone(),
                priority: model.priority,
                enabled: model.enabled,
                state: stats.state,
                is_healthy: !stats.is_open,
                total_requests: stats.total_requests,
                success_rate: stats.success_rate,
                consecutive_failures: stats.consecutive_failures,
                last_failure_time: stats.last_failure_time,
            });
        }

        let mut chain: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        chain.push("HTTP 503");

        Diagnostics {
            models: rows,
            fallback_chain: chain.join(" -> "),
            models_available: available,
            total_models: models.len(),
            api_key_configured: self.registry.any_credential_configured(),
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }
}

impl Default for FallbackPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn call_budget(model_timeout: Duration, deadline: Option<Instant>) -> Option<Duration> {
    match deadline {
        None => Some(model_timeout),
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                None
            } else {
                Some(model_timeout.min(remaining))
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
