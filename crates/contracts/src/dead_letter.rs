//! Dead letter record and error taxonomy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DataPoint, Route};

/// Failure classification
///
/// `ValidationReject` and `RateLimited` are reported to the caller of `route`
/// and never queued; the remaining classes end up in dead letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    ValidationReject,
    RateLimited,
    CircuitOpen,
    InvalidTarget,
    Timeout,
    ConnectionError,
    RoutingError,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationReject => "validation_reject",
            Self::RateLimited => "rate_limited",
            Self::CircuitOpen => "circuit_open",
            Self::InvalidTarget => "invalid_target",
            Self::Timeout => "timeout",
            Self::ConnectionError => "connection_error",
            Self::RoutingError => "routing_error",
        }
    }

    /// Permanent failures repeat identically until configuration changes
    pub fn is_permanent(self) -> bool {
        matches!(self, Self::ValidationReject | Self::InvalidTarget)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed dispatch attempt, with everything needed to retry it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_failed_at: DateTime<Utc>,
    pub correlation_id: String,
    pub source_id: String,
    pub tag: String,
    /// Target descriptor as declared in the route
    pub target: String,
    pub route_id: String,
    pub error_class: ErrorClass,
    pub error_message: String,
    /// Delivery attempts so far (1 on creation)
    pub attempts: u32,
    /// Snapshot of the event at failure time
    pub event: DataPoint,
    /// Snapshot of the route at failure time
    pub route: Route,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_class_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorClass::InvalidTarget).unwrap();
        assert_eq!(json, "\"invalid_target\"");
        assert_eq!(ErrorClass::CircuitOpen.to_string(), "circuit_open");
    }

    #[test]
    fn test_permanent_classes() {
        assert!(ErrorClass::InvalidTarget.is_permanent());
        assert!(!ErrorClass::Timeout.is_permanent());
    }
}
