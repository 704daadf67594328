//! Request, verdict and operational snapshot types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::breaker::{BreakerStats, CircuitState};
use crate::providers::Provider;

/// Endpoint name reported for empty input (no model consulted).
pub const ENDPOINT_NONE: &str = "none";

/// Endpoint name reported when every model in the chain failed.
pub const ENDPOINT_FALLBACK_FAILED: &str = "fallback_failed";

/// Threat categories the service can report. The set is closed; generative
/// providers emitting anything else have the unknown token dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThreatType {
    Jailbreak,
    SystemPromptLeak,
    DataExtraction,
    Injection,
    EncodingAttack,
    DelimiterAttack,
}

impl ThreatType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jailbreak => "jailbreak",
            Self::SystemPromptLeak => "system-prompt-leak",
            Self::DataExtraction => "data-extraction",
            Self::Injection => "injection",
            Self::EncodingAttack => "encoding-attack",
            Self::DelimiterAttack => "delimiter-attack",
        }
    }
}

/// An incoming prompt analysis request.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectionRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<DetectionConfig>,
}

/// Per-request overrides.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Score at or above which the verdict is malicious. Zero or absent falls
    /// back to the process-wide default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,
}

impl DetectionRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            config: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.config = Some(DetectionConfig {
            confidence_threshold: Some(threshold),
        });
        self
    }
}

/// The analysis verdict returned to callers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub is_malicious: bool,
    pub confidence: f64,
    pub threat_types: Vec<ThreatType>,
    pub processing_time_ms: u64,
    pub reason: String,
    /// Name of the model that produced the verdict, or one of the sentinels
    /// [`ENDPOINT_NONE`] / [`ENDPOINT_FALLBACK_FAILED`].
    pub endpoint: String,
}

/// Overall service condition derived from breaker states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Every enabled model is accepting traffic.
    Healthy,
    /// At least one model is open, at least one is not.
    Degraded,
    /// Every enabled model is open.
    Critical,
}

/// Health snapshot for the operational surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub version: String,
    pub uptime_seconds: u64,
    pub requests_served: u64,
    pub average_latency_ms: u64,
    pub models_available: usize,
    pub total_models: usize,
    pub circuit_breakers: BTreeMap<String, BreakerStats>,
    pub api_key_configured: bool,
}

/// One descriptor's diagnostic row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelDiagnostic {
    pub name: String,
    pub provider: Provider,
    pub endpoint: String,
    pub priority: u32,
    pub enabled: bool,
    pub state: CircuitState,
    pub is_healthy: bool,
    pub total_requests: u64,
    pub success_rate: f64,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_time: Option<DateTime<Utc>>,
}

/// Diagnostic dump: the ordered model list plus the rendered fallback chain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostics {
    pub models: Vec<ModelDiagnostic>,
    pub fallback_chain: String,
    pub models_available: usize,
    pub total_models: usize,
    pub api_key_configured: bool,
}
