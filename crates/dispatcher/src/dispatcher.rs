//! Dispatcher - per-target delivery
//!
//! Executes one parsed target for one event. In-process targets (log, ui,
//! sink) act immediately; controller and broker targets go through their
//! adapter, gated by a circuit breaker and bounded by the send timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{DataPoint, DispatchConfig, TargetAdapter, TargetClass, TargetSpec};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

use crate::breaker::{BreakerError, CircuitBreaker};
use crate::error::DispatchError;
use crate::metrics::{DispatchMetrics, DispatchMetricsSnapshot};
use crate::targets::{LogTarget, UiBroadcast, UiUpdate};

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    config: DispatchConfig,
    adapters: HashMap<TargetClass, Arc<dyn TargetAdapter>>,
    log_name: String,
}

impl DispatcherBuilder {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            adapters: HashMap::new(),
            log_name: "gateway_audit".to_string(),
        }
    }

    /// Register the adapter serving `class` (controller or broker)
    pub fn adapter(mut self, class: TargetClass, adapter: Arc<dyn TargetAdapter>) -> Self {
        self.adapters.insert(class, adapter);
        self
    }

    /// Name reported by the log target
    pub fn log_name(mut self, name: impl Into<String>) -> Self {
        self.log_name = name.into();
        self
    }

    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(adapters = self.adapters.len())
    )]
    pub fn build(self) -> Dispatcher {
        for (class, adapter) in &self.adapters {
            info!(class = %class, adapter = adapter.name(), "adapter registered");
        }
        Dispatcher {
            adapters: self.adapters,
            log: LogTarget::new(self.log_name),
            ui: UiBroadcast::new(self.config.ui_channel_capacity),
            send_timeout: self.config.send_timeout(),
            metrics: DispatchMetrics::new(),
        }
    }
}

/// Target dispatcher
pub struct Dispatcher {
    adapters: HashMap<TargetClass, Arc<dyn TargetAdapter>>,
    log: LogTarget,
    ui: UiBroadcast,
    send_timeout: Duration,
    metrics: DispatchMetrics,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

impl Dispatcher {
    pub fn builder(config: DispatchConfig) -> DispatcherBuilder {
        DispatcherBuilder::new(config)
    }

    /// Deliver `event` to one target
    ///
    /// `breaker` gates external targets; pass the registry's breaker for the
    /// target. Without one the adapter is called directly.
    pub async fn send(
        &self,
        target: &TargetSpec,
        breaker: Option<&CircuitBreaker>,
        event: &DataPoint,
    ) -> Result<(), DispatchError> {
        let started = Instant::now();
        let result = match target {
            TargetSpec::Log { label } => {
                self.log.write(label.as_deref(), event);
                Ok(())
            }
            TargetSpec::Ui { channel } => {
                self.ui.publish(UiUpdate::from_event(event, channel.as_deref()));
                Ok(())
            }
            TargetSpec::Sink => Ok(()),
            TargetSpec::Unknown { raw } => Err(DispatchError::invalid_target(raw.as_str())),
            TargetSpec::Controller { .. } | TargetSpec::Broker { .. } => {
                self.send_external(target, breaker, event).await
            }
        };

        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let failure = result.as_ref().err().map(DispatchError::class);
        self.metrics.record(failure);
        if target.is_external() {
            self.metrics.record_latency_ms(latency_ms);
        }
        observability::record_dispatch(target.class().as_str(), failure, latency_ms);

        match &result {
            Ok(()) => debug!(to = %target, correlation_id = %event.correlation_id, "delivered"),
            Err(e) => debug!(to = %target, error_class = %e.class(), error = %e, "delivery failed"),
        }
        result
    }

    async fn send_external(
        &self,
        target: &TargetSpec,
        breaker: Option<&CircuitBreaker>,
        event: &DataPoint,
    ) -> Result<(), DispatchError> {
        match breaker {
            Some(breaker) => breaker
                .call(|| self.attempt(target, event))
                .await
                .map_err(|e| match e {
                    BreakerError::Open { name } => DispatchError::CircuitOpen { breaker: name },
                    BreakerError::Inner(e) => e,
                }),
            None => self.attempt(target, event).await,
        }
    }

    async fn attempt(&self, target: &TargetSpec, event: &DataPoint) -> Result<(), DispatchError> {
        let class = target.class();
        let adapter = self.adapters.get(&class).ok_or_else(|| {
            DispatchError::connection(target.to_string(), format!("no {class} adapter registered"))
        })?;

        if !adapter.connected() {
            return Err(DispatchError::connection(
                target.to_string(),
                format!("adapter '{}' is not connected", adapter.name()),
            ));
        }

        match tokio::time::timeout(self.send_timeout, adapter.send(target.address(), event)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(DispatchError::from_adapter(target.to_string(), e)),
            Err(_) => Err(DispatchError::Timeout {
                target: target.to_string(),
                message: format!("no answer within {} ms", self.send_timeout.as_millis()),
            }),
        }
    }

    /// Publish directly on the UI channel
    pub fn publish_ui(&self, update: UiUpdate) -> usize {
        self.ui.publish(update)
    }

    pub fn subscribe_ui(&self) -> broadcast::Receiver<UiUpdate> {
        self.ui.subscribe()
    }

    pub fn has_adapter(&self, class: TargetClass) -> bool {
        self.adapters.contains_key(&class)
    }

    pub fn log_target(&self) -> &LogTarget {
        &self.log
    }

    pub fn metrics(&self) -> DispatchMetricsSnapshot {
        self.metrics.snapshot()
    }
}
