//! Per-source rate limiter (spam protection)
//!
//! Fixed-width window per `source_id`. A source whose rate exceeds
//! `max_packets_per_sec` is suspended and stays suspended until `reset`.
//!
//! The rate is `count / max(elapsed, window)`, so a burst only trips the limit
//! once the window holds more than `max_packets_per_sec * window_secs` events.

use chrono::{DateTime, Utc};
use contracts::RateLimitConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Instant;

/// Source status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Active,
    Suspended,
}

/// Admission decision for one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Event may proceed
    Allowed,
    /// This event pushed the source over the limit; it is now suspended
    Suspended,
    /// Source was already suspended
    Rejected,
}

impl Admission {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Snapshot of one source's counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStats {
    pub source_id: String,
    pub status: SourceStatus,
    /// Events counted in the current window
    pub window_count: u64,
    /// Events seen since the source first appeared
    pub total: u64,
    pub suspended_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct SourceRateState {
    count: u64,
    window_start: Instant,
    total: u64,
    status: SourceStatus,
    suspended_at: Option<DateTime<Utc>>,
}

impl SourceRateState {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            total: 0,
            status: SourceStatus::Active,
            suspended_at: None,
        }
    }
}

/// Rate limiter
///
/// Not internally synchronized; the router owns it under its lock.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    sources: HashMap<String, SourceRateState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            sources: HashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit one event from `source_id`
    pub fn admit(&mut self, source_id: &str) -> Admission {
        self.admit_at(source_id, Instant::now())
    }

    /// Admit one event observed at `now`
    pub fn admit_at(&mut self, source_id: &str, now: Instant) -> Admission {
        let window = self.config.window();
        let state = self
            .sources
            .entry(source_id.to_string())
            .or_insert_with(|| SourceRateState::new(now));

        if state.status == SourceStatus::Suspended {
            return Admission::Rejected;
        }

        let mut elapsed = now.saturating_duration_since(state.window_start);
        if elapsed >= window {
            state.count = 0;
            state.window_start = now;
            elapsed = std::time::Duration::ZERO;
        }

        state.count += 1;
        state.total += 1;

        if !self.config.enabled {
            return Admission::Allowed;
        }

        let rate = state.count as f64 / elapsed.max(window).as_secs_f64();
        if rate > self.config.max_packets_per_sec {
            state.status = SourceStatus::Suspended;
            state.suspended_at = Some(Utc::now());
            return Admission::Suspended;
        }

        Admission::Allowed
    }

    /// Clear a suspension and zero the window counter
    ///
    /// Returns `false` if the source has never been seen.
    pub fn reset(&mut self, source_id: &str) -> bool {
        match self.sources.get_mut(source_id) {
            Some(state) => {
                state.status = SourceStatus::Active;
                state.count = 0;
                state.window_start = Instant::now();
                state.suspended_at = None;
                true
            }
            None => false,
        }
    }

    pub fn status(&self, source_id: &str) -> Option<SourceStatus> {
        self.sources.get(source_id).map(|s| s.status)
    }

    /// Snapshot of every known source, sorted by id
    pub fn snapshot(&self) -> Vec<SourceStats> {
        let mut stats: Vec<SourceStats> = self
            .sources
            .iter()
            .map(|(source_id, state)| SourceStats {
                source_id: source_id.clone(),
                status: state.status,
                window_count: state.count,
                total: state.total,
                suspended_at: state.suspended_at,
            })
            .collect();
        stats.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        stats
    }

    pub fn suspended_count(&self) -> usize {
        self.sources
            .values()
            .filter(|s| s.status == SourceStatus::Suspended)
            .count()
    }
}
