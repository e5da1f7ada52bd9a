//! Last-value telemetry cache with batch eviction.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Telemetry cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TelemetryCacheStats {
    pub entries: usize,
    pub limit: usize,
    pub updates: u64,
    pub evictions: u64,
}

/// Telemetry cache
///
/// Keeps the latest value per key. Once the entry count exceeds `limit`, the
/// `prune_batch` oldest keys (by first insertion) are dropped in one pass.
#[derive(Debug)]
pub struct TelemetryCache<V> {
    limit: usize,
    prune_batch: usize,
    values: HashMap<String, V>,
    order: VecDeque<String>,
    updates: u64,
    evictions: u64,
}

impl<V: Clone> TelemetryCache<V> {
    pub fn new(limit: usize, prune_batch: usize) -> Self {
        Self {
            limit,
            prune_batch: prune_batch.max(1),
            values: HashMap::new(),
            order: VecDeque::new(),
            updates: 0,
            evictions: 0,
        }
    }

    /// Store the latest value for `key`
    ///
    /// Returns the number of keys pruned by this call.
    pub fn put(&mut self, key: impl Into<String>, value: V) -> usize {
        let key = key.into();
        self.updates += 1;

        if let Some(slot) = self.values.get_mut(&key) {
            *slot = value;
            return 0;
        }

        self.order.push_back(key.clone());
        self.values.insert(key, value);

        if self.values.len() <= self.limit {
            return 0;
        }

        let batch = self.prune_batch.min(self.order.len());
        for oldest in self.order.drain(..batch) {
            self.values.remove(&oldest);
        }
        self.evictions += batch as u64;
        debug!(pruned = batch, remaining = self.values.len(), "telemetry cache pruned");
        batch
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.values.get(key)
    }

    /// Snapshot of every cached value
    pub fn get_all(&self) -> HashMap<String, V> {
        self.values.clone()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn stats(&self) -> TelemetryCacheStats {
        TelemetryCacheStats {
            entries: self.values.len(),
            limit: self.limit,
            updates: self.updates,
            evictions: self.evictions,
        }
    }
}
