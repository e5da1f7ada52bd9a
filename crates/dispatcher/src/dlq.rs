//! Dead letter queue
//!
//! Bounded, insertion-ordered store of failed target deliveries. The queue
//! never retries on its own: the router takes a batch, re-sends outside its
//! lock, and reports each outcome back here.
//!
//! Not internally synchronized; the router owns it under its lock.

use chrono::Utc;
use contracts::{DataPoint, DeadLetterConfig, DeadLetterEntry, Route};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DispatchError;

/// Dead letter counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeadLetterStats {
    pub size: usize,
    pub max_entries: usize,
    pub max_attempts: u32,
    /// Entries ever created
    pub enqueued: u64,
    /// Entries pushed out by the size bound
    pub evicted: u64,
    /// Entries delivered on reprocessing
    pub reprocessed: u64,
    /// Entries dropped after exceeding `max_attempts`
    pub dropped: u64,
}

/// What happened to an entry that failed again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueOutcome {
    Requeued,
    Dropped,
}

/// Dead letter queue
#[derive(Debug)]
pub struct DeadLetterQueue {
    config: DeadLetterConfig,
    entries: VecDeque<DeadLetterEntry>,
    enqueued: u64,
    evicted: u64,
    reprocessed: u64,
    dropped: u64,
}

impl DeadLetterQueue {
    pub fn new(config: DeadLetterConfig) -> Self {
        Self {
            entries: VecDeque::with_capacity(config.max_entries.min(1024)),
            config,
            enqueued: 0,
            evicted: 0,
            reprocessed: 0,
            dropped: 0,
        }
    }

    pub fn config(&self) -> &DeadLetterConfig {
        &self.config
    }

    /// Record a failed delivery; returns the new entry's id
    pub fn enqueue(
        &mut self,
        event: &DataPoint,
        route: &Route,
        target: &str,
        error: &DispatchError,
    ) -> String {
        let now = Utc::now();
        let entry = DeadLetterEntry {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            last_failed_at: now,
            correlation_id: event.correlation_id.clone(),
            source_id: event.source_id.clone(),
            tag: event.tag.clone(),
            target: target.to_string(),
            route_id: route.id.clone(),
            error_class: error.class(),
            error_message: error.to_string(),
            attempts: 1,
            event: event.clone(),
            route: route.clone(),
        };
        let id = entry.id.clone();

        warn!(
            route_id = %entry.route_id,
            to = %entry.target,
            error_class = %entry.error_class,
            correlation_id = %entry.correlation_id,
            error = %entry.error_message,
            "dead-lettered"
        );

        self.enqueued += 1;
        self.push(entry);
        id
    }

    /// Remove up to `limit` oldest entries for reprocessing
    ///
    /// `None` uses the configured batch size.
    pub fn take_batch(&mut self, limit: Option<usize>) -> Vec<DeadLetterEntry> {
        let limit = limit.unwrap_or_else(|| self.config.effective_reprocess_batch());
        let n = limit.min(self.entries.len());
        let batch: Vec<_> = self.entries.drain(..n).collect();
        observability::record_dlq_depth(self.entries.len());
        batch
    }

    /// A taken entry was delivered
    pub fn record_reprocessed(&mut self, entry: &DeadLetterEntry) {
        self.reprocessed += 1;
        debug!(id = %entry.id, attempts = entry.attempts, "dead letter delivered");
    }

    /// A taken entry failed again: requeue it or drop it past `max_attempts`
    pub fn requeue_failed(
        &mut self,
        mut entry: DeadLetterEntry,
        error: &DispatchError,
    ) -> RequeueOutcome {
        entry.attempts += 1;
        entry.last_failed_at = Utc::now();
        entry.error_class = error.class();
        entry.error_message = error.to_string();

        if entry.attempts > self.config.max_attempts {
            self.dropped += 1;
            observability::record_dlq_dropped(1);
            warn!(
                id = %entry.id,
                to = %entry.target,
                attempts = entry.attempts,
                error_class = %entry.error_class,
                "dead letter dropped after max attempts"
            );
            return RequeueOutcome::Dropped;
        }

        self.push(entry);
        RequeueOutcome::Requeued
    }

    /// Put taken-but-unprocessed entries back at the front, oldest first
    ///
    /// Used when a reprocessing pass is abandoned midway.
    pub fn restore(&mut self, entries: Vec<DeadLetterEntry>) {
        for entry in entries.into_iter().rev() {
            self.entries.push_front(entry);
        }
        self.enforce_bound();
    }

    fn push(&mut self, entry: DeadLetterEntry) {
        self.entries.push_back(entry);
        self.enforce_bound();
    }

    fn enforce_bound(&mut self) {
        let mut evicted = 0;
        while self.entries.len() > self.config.max_entries {
            if let Some(old) = self.entries.pop_front() {
                warn!(id = %old.id, to = %old.target, "dead letter evicted, queue full");
                evicted += 1;
            }
        }
        self.evicted += evicted;
        observability::record_dlq_evicted(evicted);
        observability::record_dlq_depth(self.entries.len());
    }

    /// Up to `limit` most recent entries, newest first
    pub fn recent(&self, limit: usize) -> Vec<DeadLetterEntry> {
        self.entries.iter().rev().take(limit).cloned().collect()
    }

    /// Remove every entry; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        observability::record_dlq_depth(0);
        n
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> DeadLetterStats {
        DeadLetterStats {
            size: self.entries.len(),
            max_entries: self.config.max_entries,
            max_attempts: self.config.max_attempts,
            enqueued: self.enqueued,
            evicted: self.evicted,
            reprocessed: self.reprocessed,
            dropped: self.dropped,
        }
    }
}
