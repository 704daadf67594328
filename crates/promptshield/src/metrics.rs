//! Pipeline metrics: request totals, mean latency, per-threat counters.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::DetectionResponse;

#[derive(Default)]
struct Inner {
    requests_total: u64,
    requests_successful: u64,
    requests_failed: u64,
    total_latency: Duration,
    detections_by_threat: BTreeMap<String, u64>,
}

/// Shared request counters. One lock; writers hold it for a handful of
/// integer updates, readers take snapshots.
#[derive(Default)]
pub struct Metrics {
    inner: Mutex<Inner>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, latency: Duration, response: &DetectionResponse) {
        let mut inner = self.lock();
        inner.requests_total += 1;
        inner.requests_successful += 1;
        inner.total_latency += latency;
        for threat in &response.threat_types {
            *inner
                .detections_by_threat
                .entry(threat.as_str().to_string())
                .or_insert(0) += 1;
        }
    }

    pub fn record_failure(&self, latency: Duration) {
        let mut inner = self.lock();
        inner.requests_total += 1;
        inner.requests_failed += 1;
        inner.total_latency += latency;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();

        let success_rate = if inner.requests_total > 0 {
            inner.requests_successful as f64 / inner.requests_total as f64
        } else {
            0.0
        };
        let average_latency_ms = if inner.requests_total > 0 {
            (inner.total_latency / inner.requests_total as u32).as_millis() as u64
        } else {
            0
        };

        MetricsSnapshot {
            requests_total: inner.requests_total,
            requests_successful: inner.requests_successful,
            requests_failed: inner.requests_failed,
            success_rate,
            average_latency_ms,
            detections_by_threat: inner.detections_by_threat.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Point-in-time metrics for the operational surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_successful: u64,
    pub requests_failed: u64,
    pub success_rate: f64,
    pub average_latency_ms: u64,
    pub detections_by_threat: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ThreatType;

    fn response(threats: Vec<ThreatType>) -> DetectionResponse {
        DetectionResponse {
            is_malicious: !threats.is_empty(),
            confidence: 0.9,
            threat_types: threats,
            processing_time_ms: 5,
            reason: "test".to_string(),
            endpoint: "m".to_string(),
        }
    }

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new();
        metrics.record_success(
            Duration::from_millis(10),
            &response(vec![ThreatType::Jailbreak, ThreatType::Injection]),
        );
        metrics.record_success(
            Duration::from_millis(30),
            &response(vec![ThreatType::Jailbreak]),
        );
        metrics.record_failure(Duration::from_millis(20));

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_total, 3);
        assert_eq!(snap.requests_successful, 2);
        assert_eq!(snap.requests_failed, 1);
        assert_eq!(snap.average_latency_ms, 20);
        assert_eq!(snap.detections_by_threat.get("jailbreak"), Some(&2));
        assert_eq!(snap.detections_by_threat.get("injection"), Some(&1));
    }

    #[test]
    fn empty_metrics_snapshot_is_zeroed() {
        let snap = Metrics::new().snapshot();
        assert_eq!(snap.requests_total, 0);
        assert_eq!(snap.success_rate, 0.0);
        assert_eq!(snap.average_latency_ms, 0);
    }
}
