//! Per-model circuit breaker.
//!
//! Each enabled model owns one breaker. Consecutive failures open it; an open
//! breaker rejects calls in O(1) until its backoff elapses, then admits a
//! probe (half-open). Probes close it again after enough consecutive
//! successes; a single probe failure reopens it.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Failure-isolation settings carried by each model descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BreakerSettings {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close it again.
    pub success_threshold: u32,
    /// Initial open interval; also what `reset()` restores.
    pub base_timeout: Duration,
    /// Cap for the growing open interval.
    pub max_timeout: Duration,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            base_timeout: Duration::from_secs(30),
            max_timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_at: Option<Instant>,
    last_failure_time: Option<DateTime<Utc>>,
    current_backoff: Duration,
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    settings: BreakerSettings,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: BreakerSettings) -> Self {
        let current_backoff = settings.base_timeout;
        Self {
            name: name.into(),
            settings,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_failure_at: None,
                last_failure_time: None,
                current_backoff,
                total_requests: 0,
                successful_requests: 0,
                failed_requests: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Admission check. `Ok` admits the call (and counts it); `Err` carries
    /// the time left until the next probe window.
    pub async fn allow(&self) -> Result<(), Duration> {
        let mut inner = self.inner.lock().await;

        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => {
                inner.total_requests += 1;
                Ok(())
            }
            CircuitState::Open => {
                let elapsed = match inner.last_failure_at {
                    Some(at) => at.elapsed(),
                    // Open without a recorded failure cannot happen through
                    // the public API; admit a probe rather than wedge.
                    None => inner.current_backoff + Duration::from_millis(1),
                };

                if elapsed > inner.current_backoff {
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_successes = 0;
                    inner.total_requests += 1;
                    Ok(())
                } else {
                    Err(inner.current_backoff.saturating_sub(elapsed))
                }
            }
        }
    }

    /// Record the outcome of an admitted call.
    pub async fn record(&self, success: bool) {
        let mut inner = self.inner.lock().await;

        if success {
            inner.consecutive_failures = 0;
            inner.consecutive_successes += 1;
            inner.successful_requests += 1;

            if inner.state == CircuitState::HalfOpen
                && inner.consecutive_successes >= self.settings.success_threshold
            {
                inner.state = CircuitState::Closed;
                inner.consecutive_successes = 0;
                // current_backoff survives the close; only reset() restores it.
            }
        } else {
            inner.consecutive_successes = 0;
            inner.consecutive_failures += 1;
            inner.failed_requests += 1;
            inner.last_failure_at = Some(Instant::now());
            inner.last_failure_time = Some(Utc::now());

            let reopen = inner.state == CircuitState::HalfOpen
                || inner.consecutive_failures >= self.settings.failure_threshold;
            if reopen {
                inner.state = CircuitState::Open;
                inner.current_backoff = inner
                    .current_backoff
                    .checked_mul(inner.consecutive_failures)
                    .unwrap_or(self.settings.max_timeout)
                    .min(self.settings.max_timeout);
            }
        }
    }

    /// Manually close the circuit and restore the initial backoff.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.current_backoff = self.settings.base_timeout;
    }

    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.state == CircuitState::Open
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    pub async fn stats(&self) -> BreakerStats {
        let inner = self.inner.lock().await;

        let success_rate = if inner.total_requests > 0 {
            inner.successful_requests as f64 / inner.total_requests as f64
        } else {
            0.0
        };

        BreakerStats {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            last_failure_time: inner.last_failure_time,
            timeout_duration_ms: inner.current_backoff.as_millis() as u64,
            total_requests: inner.total_requests,
            successful_requests: inner.successful_requests,
            failed_requests: inner.failed_requests,
            success_rate,
            is_open: inner.state == CircuitState::Open,
        }
    }
}

/// Point-in-time breaker statistics for the operational surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BreakerStats {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_time: Option<DateTime<Utc>>,
    pub timeout_duration_ms: u64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub is_open: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_ms: u64) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: 3,
            success_threshold: 2,
            base_timeout: Duration::from_millis(base_ms),
            max_timeout: Duration::from_millis(base_ms * 10),
        }
    }

    #[tokio::test]
    async fn closed_admits_and_counts() {
        let cb = CircuitBreaker::new("m", settings(50));
        assert!(cb.allow().await.is_ok());
        assert!(cb.allow().await.is_ok());
        let stats = cb.stats().await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn consecutive_failures_open_the_circuit() {
        let cb = CircuitBreaker::new("m", settings(50));
        for _ in 0..3 {
            cb.allow().await.unwrap();
            cb.record(false).await;
        }
        assert!(cb.is_open().await);
        // An open circuit rejects without counting an admission.
        let before = cb.stats().await.total_requests;
        assert!(cb.allow().await.is_err());
        assert_eq!(cb.stats().await.total_requests, before);
    }

    #[tokio::test]
    async fn a_success_clears_the_failure_streak() {
        let cb = CircuitBreaker::new("m", settings(50));
        for _ in 0..2 {
            cb.allow().await.unwrap();
            cb.record(false).await;
        }
        cb.allow().await.unwrap();
        cb.record(true).await;
        cb.allow().await.unwrap();
        cb.record(false).await;
        // 2 failures, success, failure: streak is 1, circuit stays closed.
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn open_circuit_admits_probe_after_backoff() {
        let cb = CircuitBreaker::new("m", settings(20));
        for _ in 0..3 {
            cb.allow().await.unwrap();
            cb.record(false).await;
        }
        assert!(cb.allow().await.is_err());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cb.allow().await.is_ok());
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_immediately() {
        let cb = CircuitBreaker::new("m", settings(20));
        for _ in 0..3 {
            cb.allow().await.unwrap();
            cb.record(false).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;
        cb.allow().await.unwrap();
        cb.record(false).await;
        assert!(cb.is_open().await);
    }

    #[tokio::test]
    async fn half_open_closes_after_success_threshold() {
        let cb = CircuitBreaker::new("m", settings(20));
        for _ in 0..3 {
            cb.allow().await.unwrap();
            cb.record(false).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        cb.allow().await.unwrap();
        cb.record(true).await;
        // One success of two required: still half-open.
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        cb.allow().await.unwrap();
        cb.record(true).await;
        assert_eq!(cb.state().await, CircuitState::Closed);
        assert_eq!(cb.stats().await.consecutive_successes, 0);
    }

    #[tokio::test]
    async fn backoff_grows_with_failures_and_caps() {
        let cb = CircuitBreaker::new("m", settings(20));
        for _ in 0..3 {
            cb.allow().await.unwrap();
            cb.record(false).await;
        }
        // base 20ms x 3 consecutive failures.
        assert_eq!(cb.stats().await.timeout_duration_ms, 60);

        tokio::time::sleep(Duration::from_millis(120)).await;
        for _ in 0..5 {
            cb.allow().await.ok();
            cb.record(false).await;
        }
        // Never exceeds max_timeout (200ms).
        assert!(cb.stats().await.timeout_duration_ms <= 200);
    }

    #[tokio::test]
    async fn reset_closes_and_restores_base_backoff() {
        let cb = CircuitBreaker::new("m", settings(20));
        for _ in 0..3 {
            cb.allow().await.unwrap();
            cb.record(false).await;
        }
        assert!(cb.is_open().await);

        cb.reset().await;
        let stats = cb.stats().await;
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.consecutive_failures, 0);
        assert_eq!(stats.consecutive_successes, 0);
        assert_eq!(stats.timeout_duration_ms, 20);
        assert!(cb.allow().await.is_ok());
    }

    #[tokio::test]
    async fn counters_track_admissions_and_outcomes() {
        let cb = CircuitBreaker::new("m", settings(50));
        cb.allow().await.unwrap();
        cb.record(true).await;
        cb.allow().await.unwrap();
        cb.record(false).await;

        let stats = cb.stats().await;
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert!(stats.successful_requests + stats.failed_requests <= stats.total_requests);
        assert!((stats.success_rate - 0.5).abs() < f64::EPSILON);
        assert!(stats.last_failure_time.is_some());
    }

    #[test]
    fn state_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&CircuitState::HalfOpen).unwrap();
        assert_eq!(json, "\"HALF_OPEN\"");
        assert_eq!(CircuitState::HalfOpen.as_str(), "HALF_OPEN");
    }
}
