//! Breaker registry
//!
//! One breaker per (target class, target id, operation), created lazily and
//! kept for the router's lifetime.

use contracts::{CircuitBreakerConfig, TargetClass, TargetSpec};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::breaker::{BreakerSnapshot, CircuitBreaker};

/// Breaker identity, displayed as `class:target_id:operation`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BreakerKey {
    pub class: TargetClass,
    pub target_id: String,
    pub operation: &'static str,
}

impl BreakerKey {
    /// Key for an external target; `None` for in-process targets
    pub fn for_target(target: &TargetSpec) -> Option<Self> {
        let class = target.class();
        let operation = class.operation()?;
        Some(Self {
            class,
            target_id: target.target_id().to_string(),
            operation,
        })
    }
}

impl fmt::Display for BreakerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.class, self.target_id, self.operation)
    }
}

/// Lazily populated breaker table
///
/// Not internally synchronized; each breaker has its own lock.
#[derive(Debug)]
pub struct BreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: HashMap<BreakerKey, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: HashMap::new(),
        }
    }

    /// Breaker gating `target`, created on first use
    pub fn for_target(&mut self, target: &TargetSpec) -> Option<Arc<CircuitBreaker>> {
        BreakerKey::for_target(target).map(|key| self.get_or_create(key))
    }

    pub fn get_or_create(&mut self, key: BreakerKey) -> Arc<CircuitBreaker> {
        let config = &self.config;
        let breaker = self
            .breakers
            .entry(key)
            .or_insert_with_key(|key| {
                Arc::new(CircuitBreaker::new(key.to_string(), config.clone()))
            });
        Arc::clone(breaker)
    }

    /// Look up by display name (`controller:plc_001:write`)
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .values()
            .find(|b| b.name() == name)
            .map(Arc::clone)
    }

    /// Every breaker, sorted by name
    pub fn breakers(&self) -> Vec<Arc<CircuitBreaker>> {
        let mut all: Vec<_> = self.breakers.values().map(Arc::clone).collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        self.breakers().iter().map(|b| b.snapshot()).collect()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
