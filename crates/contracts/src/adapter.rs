//! TargetAdapter trait - Dispatcher output interface
//!
//! Protocol adapters (controller client, broker client) live outside the
//! router; this is the boundary the dispatcher calls into.

use async_trait::async_trait;
use thiserror::Error;

use crate::DataPoint;

/// Adapter failure as reported by the adapter itself
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// Transport could not reach the device / broker
    #[error("connection error: {0}")]
    Connection(String),

    /// Adapter gave up waiting
    #[error("timed out: {0}")]
    Timeout(String),

    /// Any other adapter failure
    #[error("{0}")]
    Failed(String),
}

/// Destination adapter
///
/// Adapters own their transport retries; the router calls `send` once per
/// dispatch attempt and gates the call with a circuit breaker.
#[async_trait]
pub trait TargetAdapter: Send + Sync {
    /// Adapter name (used for logging)
    fn name(&self) -> &str;

    /// Whether the adapter currently holds a live connection
    fn connected(&self) -> bool;

    /// Deliver one event to `address`
    ///
    /// # Errors
    /// Returns the adapter's failure; the caller classifies it.
    async fn send(&self, address: &str, event: &DataPoint) -> Result<(), AdapterError>;
}
