//! Dispatch counters for in-process stats

use contracts::ErrorClass;
use observability::{RunningStats, StatsSummary};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every dispatch
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Targets delivered
    success_count: AtomicU64,
    /// Targets failed (any class)
    failure_count: AtomicU64,
    /// Subset of failures rejected by an open breaker
    circuit_open_count: AtomicU64,
    /// Latency of external adapter calls
    latency_ms: Mutex<RunningStats>,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one target outcome
    pub fn record(&self, failure: Option<ErrorClass>) {
        match failure {
            None => {
                self.success_count.fetch_add(1, Ordering::Relaxed);
            }
            Some(class) => {
                self.failure_count.fetch_add(1, Ordering::Relaxed);
                if class == ErrorClass::CircuitOpen {
                    self.circuit_open_count.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    pub fn record_latency_ms(&self, latency_ms: f64) {
        self.latency_ms.lock().push(latency_ms);
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            success_count: self.success_count(),
            failure_count: self.failure_count(),
            circuit_open_count: self.circuit_open_count.load(Ordering::Relaxed),
            latency_ms: self.latency_ms.lock().summary(),
        }
    }
}

/// Snapshot of dispatch counters (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DispatchMetricsSnapshot {
    pub success_count: u64,
    pub failure_count: u64,
    pub circuit_open_count: u64,
    pub latency_ms: StatsSummary,
}
