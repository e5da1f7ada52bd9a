//! Dispatcher error types

use contracts::{AdapterError, ErrorClass};
use thiserror::Error;

/// Failure of one target within one dispatch
///
/// Never propagated to the caller of `route`; it is classified and turned
/// into a dead letter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// Breaker rejected the call before the adapter was invoked
    #[error("circuit breaker '{breaker}' is open")]
    CircuitOpen { breaker: String },

    /// Unrecognized target class
    #[error("invalid target '{target}'")]
    InvalidTarget { target: String },

    /// Adapter did not answer in time
    #[error("timeout sending to '{target}': {message}")]
    Timeout { target: String, message: String },

    /// Adapter missing, disconnected, or failed to reach its peer
    #[error("connection error sending to '{target}': {message}")]
    Connection { target: String, message: String },

    /// Any other adapter failure
    #[error("routing error sending to '{target}': {message}")]
    Routing { target: String, message: String },
}

impl DispatchError {
    /// Create a connection error
    pub fn connection(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create an invalid target error
    pub fn invalid_target(target: impl Into<String>) -> Self {
        Self::InvalidTarget {
            target: target.into(),
        }
    }

    /// Classify an adapter failure
    pub fn from_adapter(target: impl Into<String>, err: AdapterError) -> Self {
        let target = target.into();
        match err {
            AdapterError::Connection(message) => Self::Connection { target, message },
            AdapterError::Timeout(message) => Self::Timeout { target, message },
            AdapterError::Failed(message) => Self::Routing { target, message },
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CircuitOpen { .. } => ErrorClass::CircuitOpen,
            Self::InvalidTarget { .. } => ErrorClass::InvalidTarget,
            Self::Timeout { .. } => ErrorClass::Timeout,
            Self::Connection { .. } => ErrorClass::ConnectionError,
            Self::Routing { .. } => ErrorClass::RoutingError,
        }
    }
}
