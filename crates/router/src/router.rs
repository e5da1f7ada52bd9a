//! Router - ingestion, matching, dispatch and dead letters
//!
//! All shared state sits behind one lock. Validation and normalization run
//! before it is taken; adapter calls and subscriber callbacks run after it is
//! released. The lock is taken again only to record outcomes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use bytes::Bytes;
use cache::{notify_all, BlobCache, SubscriberTable, SubscriptionId, TelemetryCache};
use contracts::{
    DataPoint, DeadLetterEntry, IngressValue, Route, RouterConfig, TargetAdapter, TargetClass,
    TargetSpec, Value,
};
use dispatcher::{
    BreakerRegistry, BreakerSnapshot, CircuitBreaker, DeadLetterQueue, DeadLetterStats,
    Dispatcher, DispatcherBuilder, RequeueOutcome, UiUpdate,
};
use ingestion::{normalize, Admission, IngressValidator, RateLimiter, SourceStats};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::matching::{compile_routes, match_routes, CompiledRoute};
use crate::stats::{Counters, ReprocessReport, RoutingStats};

/// State guarded by the router lock
struct RouterState {
    routes: Vec<Arc<CompiledRoute>>,
    limiter: RateLimiter,
    telemetry: TelemetryCache<Value>,
    blobs: BlobCache,
    subscribers: SubscriberTable,
    breakers: BreakerRegistry,
    dlq: DeadLetterQueue,
    counters: Counters,
}

/// One target delivery planned under the lock, executed outside it
struct Delivery {
    route: Arc<CompiledRoute>,
    target: usize,
    breaker: Option<Arc<CircuitBreaker>>,
}

enum Intake {
    Admitted {
        deliveries: Vec<Delivery>,
        callbacks: Vec<cache::SubscriberCallback>,
    },
    Suspended,
    Rejected,
}

/// Builder for creating a Router
pub struct RouterBuilder {
    config: RouterConfig,
    dispatcher: DispatcherBuilder,
}

impl RouterBuilder {
    pub fn new(config: RouterConfig) -> Self {
        let dispatcher = Dispatcher::builder(config.dispatch.clone());
        Self { config, dispatcher }
    }

    /// Register the adapter serving `class`
    pub fn adapter(mut self, class: TargetClass, adapter: Arc<dyn TargetAdapter>) -> Self {
        self.dispatcher = self.dispatcher.adapter(class, adapter);
        self
    }

    /// Compile the configured routes and build the router
    ///
    /// # Errors
    /// Fails if any configured route is incomplete or ids collide.
    #[instrument(
        name = "router_builder_build",
        skip(self),
        fields(routes = self.config.routes.len())
    )]
    pub fn build(self) -> Result<Router> {
        let config = self.config;
        let routes = compile_routes(config.routes.clone())?;

        let state = RouterState {
            routes,
            limiter: RateLimiter::new(config.rate_limit.clone()),
            telemetry: TelemetryCache::new(
                config.cache.telemetry_limit,
                config.cache.effective_prune_batch(),
            ),
            blobs: BlobCache::new(config.cache.blob_budget_bytes),
            subscribers: SubscriberTable::new(),
            breakers: BreakerRegistry::new(config.circuit_breaker.clone()),
            dlq: DeadLetterQueue::new(config.dead_letter.clone()),
            counters: Counters::default(),
        };

        info!(routes = state.routes.len(), "router ready");

        Ok(Router {
            validator: IngressValidator::new(config.validation.clone()),
            dispatcher: self.dispatcher.build(),
            state: Mutex::new(state),
            config,
        })
    }
}

/// Universal data router
pub struct Router {
    validator: IngressValidator,
    dispatcher: Dispatcher,
    state: Mutex<RouterState>,
    config: RouterConfig,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl Router {
    pub fn builder(config: RouterConfig) -> RouterBuilder {
        RouterBuilder::new(config)
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Ingest one event
    ///
    /// Returns `false` when the event is rejected by validation or rate
    /// limiting. Dispatch failures are dead-lettered and do not affect the
    /// result.
    pub async fn route(
        &self,
        source_id: &str,
        tag: &str,
        value: impl Into<IngressValue>,
        metadata: Option<IngressValue>,
    ) -> bool {
        observability::record_event_received();

        let input = match self.validator.validate(source_id, tag, value.into(), metadata) {
            Ok(input) => input,
            Err(reason) => {
                {
                    let mut state = self.state.lock();
                    state.counters.events_received += 1;
                    state.counters.events_rejected += 1;
                }
                observability::record_event_rejected(reason.reason_code());
                warn!(source_id = %source_id.trim(), tag = %tag.trim(), %reason, "event rejected");
                return false;
            }
        };
        let event = normalize(input);

        match self.intake(&event) {
            Intake::Admitted {
                deliveries,
                callbacks,
            } => {
                self.notify(&callbacks, &event);
                self.deliver(&event, deliveries).await;
                self.state.lock().counters.events_routed += 1;
                true
            }
            Intake::Suspended => {
                self.announce_suspension(&event.source_id);
                false
            }
            Intake::Rejected => {
                observability::record_rate_limited(false);
                debug!(source_id = %event.source_id, "source suspended, event dropped");
                false
            }
        }
    }

    /// Rate limit, cache, match and plan deliveries in one critical section
    fn intake(&self, event: &DataPoint) -> Intake {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.counters.events_received += 1;

        match state.limiter.admit(&event.source_id) {
            Admission::Allowed => {}
            Admission::Suspended => {
                state.counters.events_rate_limited += 1;
                return Intake::Suspended;
            }
            Admission::Rejected => {
                state.counters.events_rate_limited += 1;
                return Intake::Rejected;
            }
        }

        state.telemetry.put(event.key(), event.value.clone());
        let callbacks = state.subscribers.matching(event);

        let matched = match_routes(&state.routes, event);
        state.counters.route_matches += matched.len() as u64;

        let mut deliveries = Vec::new();
        for route in matched {
            for (index, target) in route.targets.iter().enumerate() {
                deliveries.push(Delivery {
                    breaker: state.breakers.for_target(&target.spec),
                    route: Arc::clone(&route),
                    target: index,
                });
            }
        }

        Intake::Admitted {
            deliveries,
            callbacks,
        }
    }

    fn notify(&self, callbacks: &[cache::SubscriberCallback], event: &DataPoint) {
        if callbacks.is_empty() {
            return;
        }
        let failed = notify_all(callbacks, event);
        if failed > 0 {
            self.state.lock().counters.subscriber_errors += failed as u64;
        }
    }

    /// Execute deliveries sequentially; one target's failure never stops the rest
    ///
    /// Each outcome is recorded as soon as its send returns, so a caller
    /// cancelled mid-way still leaves dead letters for the targets that failed.
    async fn deliver(&self, event: &DataPoint, deliveries: Vec<Delivery>) {
        for delivery in &deliveries {
            let target = &delivery.route.targets[delivery.target];
            let result = self
                .dispatcher
                .send(&target.spec, delivery.breaker.as_deref(), event)
                .await;

            let mut state = self.state.lock();
            match result {
                Ok(()) => state.counters.dispatch_success += 1,
                Err(error) => {
                    state.counters.dispatch_failed += 1;
                    state
                        .dlq
                        .enqueue(event, &delivery.route.route, &target.raw, &error);
                }
            }
        }
    }

    fn announce_suspension(&self, source_id: &str) {
        let max_pps = self.config.rate_limit.max_packets_per_sec;
        observability::record_rate_limited(true);
        warn!(
            source_id = %source_id,
            max_packets_per_sec = max_pps,
            "source suspended by rate limiter"
        );

        let update = UiUpdate::new(
            format!("system.rate_limit.{source_id}"),
            json!({
                "status": "suspended",
                "source_id": source_id,
                "max_packets_per_sec": max_pps,
                "suspended_at": chrono::Utc::now().to_rfc3339(),
            }),
        );
        self.dispatcher.publish_ui(update);
    }

    /// Register a callback for events matching `pattern`
    pub fn subscribe<F>(&self, pattern: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&DataPoint) + Send + Sync + 'static,
    {
        let id = self.state.lock().subscribers.subscribe(pattern, Arc::new(callback));
        debug!(pattern = %pattern, ?id, "subscribed");
        id
    }

    /// Remove a registration; `false` if it does not exist
    pub fn unsubscribe(&self, pattern: &str, id: SubscriptionId) -> bool {
        self.state.lock().subscribers.unsubscribe(pattern, id)
    }

    /// Receiver for UI broadcasts (`ui` targets and system notifications)
    pub fn subscribe_ui(&self) -> broadcast::Receiver<UiUpdate> {
        self.dispatcher.subscribe_ui()
    }

    /// Lift a rate-limit suspension; `false` for an unknown source
    pub fn reset_rate_limit(&self, source_id: &str) -> bool {
        let reset = self.state.lock().limiter.reset(source_id);
        if reset {
            info!(source_id = %source_id, "rate limit reset");
            self.dispatcher.publish_ui(UiUpdate::new(
                format!("system.rate_limit.{source_id}"),
                json!({ "status": "active", "source_id": source_id }),
            ));
        }
        reset
    }

    pub fn get_source_stats(&self) -> Vec<SourceStats> {
        self.state.lock().limiter.snapshot()
    }

    pub fn get_routing_stats(&self) -> RoutingStats {
        let state = self.state.lock();
        let c = state.counters;
        RoutingStats {
            events_received: c.events_received,
            events_routed: c.events_routed,
            events_rejected: c.events_rejected,
            events_rate_limited: c.events_rate_limited,
            route_matches: c.route_matches,
            dispatch_success: c.dispatch_success,
            dispatch_failed: c.dispatch_failed,
            subscriber_errors: c.subscriber_errors,
            routes_loaded: state.routes.len(),
            subscribers: state.subscribers.len(),
            suspended_sources: state.limiter.suspended_count(),
            circuit_breakers: state.breakers.len(),
            telemetry: state.telemetry.stats(),
            blob: state.blobs.stats(),
            dispatch: self.dispatcher.metrics(),
        }
    }

    pub fn get_dead_letter_stats(&self) -> DeadLetterStats {
        self.state.lock().dlq.stats()
    }

    /// Up to `limit` most recent dead letters, newest first
    pub fn get_dead_letters(&self, limit: usize) -> Vec<DeadLetterEntry> {
        self.state.lock().dlq.recent(limit)
    }

    /// Drop every dead letter; returns how many were removed
    pub fn clear_dead_letters(&self) -> usize {
        let cleared = self.state.lock().dlq.clear();
        info!(cleared, "dead letters cleared");
        cleared
    }

    /// Retry up to `limit` oldest dead letters (`None` = configured batch)
    ///
    /// Each entry is re-sent to its recorded target through that target's
    /// breaker. If this future is dropped midway, entries not yet retried go
    /// back to the front of the queue.
    pub async fn reprocess_dead_letters(&self, limit: Option<usize>) -> ReprocessReport {
        let mut pending = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let batch = state.dlq.take_batch(limit);
            let items = batch
                .into_iter()
                .map(|entry| {
                    let spec = TargetSpec::parse(&entry.target);
                    let breaker = state.breakers.for_target(&spec);
                    (entry, spec, breaker)
                })
                .collect();
            PendingBatch {
                state: &self.state,
                items,
            }
        };

        let mut report = ReprocessReport {
            attempted: pending.items.len(),
            ..Default::default()
        };

        loop {
            let result = match pending.items.front() {
                Some((entry, spec, breaker)) => {
                    self.dispatcher
                        .send(spec, breaker.as_deref(), &entry.event)
                        .await
                }
                None => break,
            };
            let Some((entry, _, _)) = pending.items.pop_front() else {
                break;
            };

            let mut state = self.state.lock();
            match result {
                Ok(()) => {
                    state.dlq.record_reprocessed(&entry);
                    report.succeeded += 1;
                }
                Err(error) => match state.dlq.requeue_failed(entry, &error) {
                    RequeueOutcome::Requeued => report.requeued += 1,
                    RequeueOutcome::Dropped => report.dropped += 1,
                },
            }
        }

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            requeued = report.requeued,
            dropped = report.dropped,
            "dead letters reprocessed"
        );
        report
    }

    /// Store a blob; `false` if it exceeds the whole cache budget
    pub fn put_blob(&self, key: &str, data: impl Into<Bytes>) -> bool {
        self.state.lock().blobs.put(key, data.into())
    }

    pub fn get_blob(&self, key: &str) -> Option<Bytes> {
        self.state.lock().blobs.get(key)
    }

    /// Latest value for `source_id.tag`
    pub fn get_telemetry(&self, key: &str) -> Option<Value> {
        self.state.lock().telemetry.get(key).cloned()
    }

    pub fn get_all_telemetry(&self) -> HashMap<String, Value> {
        self.state.lock().telemetry.get_all()
    }

    /// Atomically replace the rule set
    ///
    /// # Errors
    /// On an incomplete rule or duplicate id the current rules are kept.
    pub fn reload_routes(&self, routes: Vec<Route>) -> Result<usize> {
        let compiled = compile_routes(routes).inspect_err(|e| {
            warn!(error = %e, "route reload rejected, keeping current rules");
        })?;
        let count = compiled.len();
        self.state.lock().routes = compiled;
        info!(routes = count, "routes reloaded");
        Ok(count)
    }

    /// Current rules in declaration order
    pub fn routes(&self) -> Vec<Route> {
        self.state
            .lock()
            .routes
            .iter()
            .map(|r| r.route.clone())
            .collect()
    }

    pub fn get_circuit_breakers(&self) -> Vec<BreakerSnapshot> {
        let breakers = self.state.lock().breakers.breakers();
        breakers.iter().map(|b| b.snapshot()).collect()
    }

    /// Force a breaker closed by name (`controller:plc_001:write`)
    pub fn reset_circuit_breaker(&self, name: &str) -> bool {
        let breaker = self.state.lock().breakers.get(name);
        match breaker {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Log what is left behind; the router holds no background tasks
    #[instrument(name = "router_shutdown", skip(self))]
    pub fn shutdown(&self) {
        let (dlq, breakers) = {
            let state = self.state.lock();
            (state.dlq.stats(), state.breakers.breakers())
        };
        for snapshot in breakers.iter().map(|b| b.snapshot()) {
            info!(breaker = %snapshot.name, state = ?snapshot.state, "breaker state at shutdown");
        }
        if dlq.size > 0 {
            warn!(pending = dlq.size, "router shutting down with undelivered dead letters");
        }
        info!(dead_letters = dlq.size, "router shut down");
    }
}

/// Entries taken for reprocessing and not yet resolved
struct PendingBatch<'a> {
    state: &'a Mutex<RouterState>,
    items: VecDeque<(DeadLetterEntry, TargetSpec, Option<Arc<CircuitBreaker>>)>,
}

impl Drop for PendingBatch<'_> {
    fn drop(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let entries: Vec<_> = self.items.drain(..).map(|(entry, _, _)| entry).collect();
        warn!(restored = entries.len(), "reprocessing abandoned, restoring dead letters");
        self.state.lock().dlq.restore(entries);
    }
}
