//! Pattern subscriber table
//!
//! Patterns use the same syntax as route `from` fields. Callbacks are cloned
//! out of the table and invoked by the caller, so the router can release its
//! lock first.

use contracts::{DataPoint, Pattern};
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Subscriber callback
pub type SubscriberCallback = Arc<dyn Fn(&DataPoint) + Send + Sync>;

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    raw: String,
    pattern: Pattern,
    callback: SubscriberCallback,
}

/// Registered subscribers, in registration order
#[derive(Default)]
pub struct SubscriberTable {
    next_id: u64,
    entries: Vec<Subscription>,
}

impl std::fmt::Debug for SubscriberTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberTable")
            .field("len", &self.entries.len())
            .finish()
    }
}

impl SubscriberTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, pattern: &str, callback: SubscriberCallback) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.entries.push(Subscription {
            id,
            raw: pattern.trim().to_string(),
            pattern: Pattern::parse(pattern),
            callback,
        });
        id
    }

    /// Remove one registration; `false` if it was not registered under `pattern`
    pub fn unsubscribe(&mut self, pattern: &str, id: SubscriptionId) -> bool {
        let pattern = pattern.trim();
        let before = self.entries.len();
        self.entries.retain(|s| !(s.id == id && s.raw == pattern));
        self.entries.len() != before
    }

    /// Callbacks whose pattern matches `event`, in registration order
    pub fn matching(&self, event: &DataPoint) -> Vec<SubscriberCallback> {
        self.entries
            .iter()
            .filter(|s| s.pattern.matches(&event.source_id, &event.tag))
            .map(|s| Arc::clone(&s.callback))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Invoke every callback; a panicking callback is logged and skipped
///
/// Returns the number of callbacks that panicked.
pub fn notify_all(callbacks: &[SubscriberCallback], event: &DataPoint) -> usize {
    let mut failed = 0;
    for callback in callbacks {
        if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
            failed += 1;
            error!(
                source_id = %event.source_id,
                tag = %event.tag,
                correlation_id = %event.correlation_id,
                "subscriber callback panicked"
            );
        }
    }
    failed
}
