//! UI broadcast channel
//!
//! `ui` targets and rate-limit notifications publish `(key, value)` pairs on a
//! tokio broadcast channel. Publishing never blocks; with no receivers the
//! update is dropped.

use contracts::{DataPoint, Value};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// One UI update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UiUpdate {
    pub key: String,
    pub value: Value,
    /// `ui.<channel>` suffix, if any
    pub channel: Option<String>,
}

impl UiUpdate {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            channel: None,
        }
    }

    pub fn from_event(event: &DataPoint, channel: Option<&str>) -> Self {
        Self {
            key: event.key(),
            value: event.value.clone(),
            channel: channel.map(str::to_string),
        }
    }
}

/// Sender side of the UI channel
#[derive(Debug, Clone)]
pub struct UiBroadcast {
    tx: broadcast::Sender<UiUpdate>,
}

impl UiBroadcast {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiUpdate> {
        self.tx.subscribe()
    }

    /// Publish; returns the number of receivers reached
    pub fn publish(&self, update: UiUpdate) -> usize {
        match self.tx.send(update) {
            Ok(n) => n,
            Err(broadcast::error::SendError(update)) => {
                trace!(key = %update.key, "no ui receivers");
                0
            }
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let ui = UiBroadcast::new(8);
        assert_eq!(ui.publish(UiUpdate::new("k", json!(1))), 0);

        let mut rx = ui.subscribe();
        assert_eq!(ui.publish(UiUpdate::new("plc.temp", json!(2))), 1);
        let update = rx.recv().await.unwrap();
        assert_eq!(update.key, "plc.temp");
        assert_eq!(update.value, json!(2));
    }
}
