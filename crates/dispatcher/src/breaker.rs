//! Circuit breaker
//!
//! Closed → Open after `failure_threshold` consecutive failures; Open →
//! HalfOpen on the first request after `recovery_timeout`; HalfOpen → Closed
//! on a probe success, back to Open on any probe failure.
//!
//! State lives behind the breaker's own lock so status reporting never
//! contends with the router.

use contracts::CircuitBreakerConfig;
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

/// Circuit breaker state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow through
    Closed,
    /// Requests fail fast
    Open,
    /// Limited probes allowed
    HalfOpen,
}

impl CircuitState {
    /// Prometheus gauge value (0=Closed, 1=Open, 2=HalfOpen)
    pub fn as_metric_value(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::Open => 1.0,
            CircuitState::HalfOpen => 2.0,
        }
    }
}

/// Error returned by `CircuitBreaker::call`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BreakerError<E> {
    /// Rejected without invoking the operation
    #[error("circuit breaker '{name}' is open")]
    Open { name: String },

    /// The operation itself failed (already recorded)
    #[error("{0}")]
    Inner(E),
}

/// Point-in-time view of a breaker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    /// Consecutive failures since the last success
    pub failure_count: u32,
    pub half_open_calls: u32,
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_rejected: u64,
    pub last_error: Option<String>,
    /// Seconds since the breaker last opened, while not closed
    pub open_for_secs: Option<f64>,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: f64,
    pub half_open_max_calls: u32,
}

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    half_open_calls: u32,
    total_successes: u64,
    total_failures: u64,
    total_rejected: u64,
    last_error: Option<String>,
}

impl BreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            opened_at: None,
            half_open_calls: 0,
            total_successes: 0,
            total_failures: 0,
            total_rejected: 0,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Permit {
    Denied,
    Granted,
    /// Granted as a half-open probe; must be released if abandoned
    Probe,
}

/// Per-target circuit breaker
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(BreakerState::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state, without evaluating time-based transitions
    pub fn state(&self) -> CircuitState {
        self.state.lock().state
    }

    /// Whether a request may proceed now
    pub fn allow_request(&self) -> bool {
        self.acquire() != Permit::Denied
    }

    fn acquire(&self) -> Permit {
        let mut s = self.state.lock();
        match s.state {
            CircuitState::Closed => Permit::Granted,
            CircuitState::Open => {
                if self.recovery_elapsed(&s) {
                    s.state = CircuitState::HalfOpen;
                    s.half_open_calls = 1;
                    self.transitioned(CircuitState::HalfOpen);
                    info!(breaker = %self.name, "circuit breaker half-open, probing");
                    Permit::Probe
                } else {
                    s.total_rejected += 1;
                    Permit::Denied
                }
            }
            CircuitState::HalfOpen => {
                if s.half_open_calls < self.config.half_open_max_calls {
                    s.half_open_calls += 1;
                    Permit::Probe
                } else {
                    s.total_rejected += 1;
                    Permit::Denied
                }
            }
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        let mut s = self.state.lock();
        s.failure_count = 0;
        s.total_successes += 1;

        if s.state == CircuitState::HalfOpen {
            s.state = CircuitState::Closed;
            s.half_open_calls = 0;
            s.opened_at = None;
            self.transitioned(CircuitState::Closed);
            info!(breaker = %self.name, "circuit breaker closed, target recovered");
        }
    }

    /// Record a failed call
    pub fn record_failure(&self, error: impl Into<String>) {
        let mut s = self.state.lock();
        s.failure_count = s.failure_count.saturating_add(1);
        s.total_failures += 1;
        s.last_error = Some(error.into());

        match s.state {
            CircuitState::Closed => {
                if s.failure_count >= self.config.failure_threshold {
                    s.state = CircuitState::Open;
                    s.opened_at = Some(Instant::now());
                    self.transitioned(CircuitState::Open);
                    warn!(
                        breaker = %self.name,
                        failures = s.failure_count,
                        last_error = ?s.last_error,
                        "circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // any probe failure reopens
                s.state = CircuitState::Open;
                s.opened_at = Some(Instant::now());
                s.half_open_calls = 0;
                self.transitioned(CircuitState::Open);
                warn!(breaker = %self.name, "circuit breaker re-opened, probe failed");
            }
            CircuitState::Open => {}
        }
    }

    /// Run `op` through the breaker
    ///
    /// Rejected calls never invoke `op`. Dropping the returned future while
    /// `op` is in flight releases a half-open probe slot without recording an
    /// outcome.
    pub async fn call<F, Fut, T, E>(&self, op: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let permit = self.acquire();
        if permit == Permit::Denied {
            return Err(BreakerError::Open {
                name: self.name.clone(),
            });
        }

        let mut guard = ProbeGuard {
            breaker: self,
            armed: permit == Permit::Probe,
        };
        let result = op().await;
        guard.armed = false;

        match &result {
            Ok(_) => self.record_success(),
            Err(e) => self.record_failure(e.to_string()),
        }
        result.map_err(BreakerError::Inner)
    }

    /// Consistent view, applying a due Open → HalfOpen transition
    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut s = self.state.lock();
        if s.state == CircuitState::Open && self.recovery_elapsed(&s) {
            s.state = CircuitState::HalfOpen;
            s.half_open_calls = 0;
            self.transitioned(CircuitState::HalfOpen);
        }

        BreakerSnapshot {
            name: self.name.clone(),
            state: s.state,
            failure_count: s.failure_count,
            half_open_calls: s.half_open_calls,
            total_successes: s.total_successes,
            total_failures: s.total_failures,
            total_rejected: s.total_rejected,
            last_error: s.last_error.clone(),
            open_for_secs: s.opened_at.map(|t| t.elapsed().as_secs_f64()),
            failure_threshold: self.config.failure_threshold,
            recovery_timeout_secs: self.config.recovery_timeout_secs,
            half_open_max_calls: self.config.half_open_max_calls,
        }
    }

    /// Administrative reset to Closed; cumulative counters are kept
    pub fn reset(&self) {
        let mut s = self.state.lock();
        s.state = CircuitState::Closed;
        s.failure_count = 0;
        s.half_open_calls = 0;
        s.opened_at = None;
        s.last_error = None;
        self.transitioned(CircuitState::Closed);
        info!(breaker = %self.name, "circuit breaker reset");
    }

    fn recovery_elapsed(&self, s: &BreakerState) -> bool {
        s.opened_at
            .is_none_or(|t| t.elapsed() >= self.config.recovery_timeout())
    }

    fn release_probe(&self) {
        let mut s = self.state.lock();
        if s.state == CircuitState::HalfOpen && s.half_open_calls > 0 {
            s.half_open_calls -= 1;
        }
    }

    fn transitioned(&self, to: CircuitState) {
        observability::record_breaker_state(&self.name, to.as_metric_value());
    }
}

struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.release_probe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn breaker(threshold: u32, recovery_secs: f64) -> CircuitBreaker {
        CircuitBreaker::new(
            "controller:plc_001:write",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                recovery_timeout_secs: recovery_secs,
                half_open_max_calls: 1,
            },
        )
    }

    #[tokio::test]
    async fn test_open_half_open_close_cycle() {
        let cb = breaker(2, 0.05);
        assert!(cb.allow_request());
        cb.record_failure("e1");
        assert_eq!(cb.state(), CircuitState::Closed);
        cb.record_failure("e2");
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cb.allow_request());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        // budget of one probe is taken
        assert!(!cb.allow_request());

        cb.record_success();
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::Closed);
        assert_eq!(snap.failure_count, 0);
        assert_eq!(snap.half_open_calls, 0);
        assert_eq!(snap.total_rejected, 2);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let cb = breaker(3, 0.02);
        for i in 0..3 {
            cb.record_failure(format!("e{i}"));
        }
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cb.allow_request());
        cb.record_failure("probe failed");
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.allow_request());
        assert_eq!(cb.snapshot().last_error.as_deref(), Some("probe failed"));
    }

    #[test]
    fn test_success_resets_consecutive_failures() {
        let cb = breaker(3, 30.0);
        cb.record_failure("a");
        cb.record_failure("b");
        cb.record_success();
        cb.record_failure("c");
        cb.record_failure("d");
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().failure_count, 2);
    }

    #[tokio::test]
    async fn test_snapshot_applies_due_transition() {
        let cb = breaker(1, 0.01);
        cb.record_failure("down");
        assert_eq!(cb.snapshot().state, CircuitState::Open);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let snap = cb.snapshot();
        assert_eq!(snap.state, CircuitState::HalfOpen);
        assert_eq!(snap.half_open_calls, 0);
        assert!(cb.allow_request());
    }

    #[tokio::test]
    async fn test_call_records_outcomes() {
        let cb = breaker(1, 30.0);
        let ok: Result<u32, BreakerError<String>> = cb.call(|| async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<(), _> = cb.call(|| async { Err("refused".to_string()) }).await;
        assert_eq!(err, Err(BreakerError::Inner("refused".to_string())));
        assert_eq!(cb.state(), CircuitState::Open);

        let mut invoked = false;
        let rejected: Result<(), BreakerError<String>> = cb
            .call(|| {
                invoked = true;
                async { Ok(()) }
            })
            .await;
        assert!(matches!(rejected, Err(BreakerError::Open { .. })));
        assert!(!invoked);
    }

    #[tokio::test]
    async fn test_cancelled_probe_releases_slot() {
        let cb = breaker(1, 0.01);
        cb.record_failure("down");
        tokio::time::sleep(Duration::from_millis(20)).await;

        let stuck = cb.call(|| async {
            std::future::pending::<()>().await;
            Ok::<(), String>(())
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(10), stuck).await;
        assert!(timed_out.is_err());

        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.allow_request());
    }

    #[test]
    fn test_reset_closes() {
        let cb = breaker(1, 30.0);
        cb.record_failure("x");
        cb.reset();
        assert!(cb.allow_request());
        assert_eq!(cb.snapshot().total_failures, 1);
    }
}
