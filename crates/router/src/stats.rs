//! Router stats

use cache::{BlobCacheStats, TelemetryCacheStats};
use dispatcher::DispatchMetricsSnapshot;
use serde::Serialize;

/// Event-level counters kept under the router lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub(crate) struct Counters {
    pub events_received: u64,
    pub events_routed: u64,
    pub events_rejected: u64,
    pub events_rate_limited: u64,
    pub route_matches: u64,
    pub dispatch_success: u64,
    pub dispatch_failed: u64,
    pub subscriber_errors: u64,
}

/// Snapshot returned by `Router::get_routing_stats`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingStats {
    /// Every `route` call
    pub events_received: u64,
    /// Calls that returned `true`
    pub events_routed: u64,
    /// Validation rejects
    pub events_rejected: u64,
    /// Rate-limit rejects (including the suspending event)
    pub events_rate_limited: u64,
    /// Route matches across all events
    pub route_matches: u64,
    /// Target deliveries that succeeded
    pub dispatch_success: u64,
    /// Target deliveries that were dead-lettered
    pub dispatch_failed: u64,
    /// Subscriber callbacks that panicked
    pub subscriber_errors: u64,
    pub routes_loaded: usize,
    pub subscribers: usize,
    pub suspended_sources: usize,
    pub circuit_breakers: usize,
    pub telemetry: TelemetryCacheStats,
    pub blob: BlobCacheStats,
    /// Includes reprocessing attempts
    pub dispatch: DispatchMetricsSnapshot,
}

/// Outcome of one `reprocess_dead_letters` pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReprocessReport {
    /// Entries taken from the queue
    pub attempted: usize,
    pub succeeded: usize,
    /// Failed again, back in the queue
    pub requeued: usize,
    /// Failed again past `max_attempts`
    pub dropped: usize,
}
