//! Target descriptors
//!
//! A descriptor is `<class>[.<address>]`. It is parsed once when routes are
//! loaded so dispatch never re-parses strings per event.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination class; selects the adapter and breaker family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetClass {
    /// Industrial controller write
    Controller,
    /// Message broker publish
    Broker,
    /// Audit log line
    Log,
    /// UI broadcast
    Ui,
    /// Cache only, no external call
    Sink,
    /// Unrecognized class (permanent error)
    Unknown,
}

impl TargetClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Controller => "controller",
            Self::Broker => "broker",
            Self::Log => "log",
            Self::Ui => "ui",
            Self::Sink => "sink",
            Self::Unknown => "unknown",
        }
    }

    /// Operation kind used in breaker keys, `None` for in-process targets
    pub fn operation(self) -> Option<&'static str> {
        match self {
            Self::Controller => Some("write"),
            Self::Broker => Some("publish"),
            _ => None,
        }
    }
}

impl fmt::Display for TargetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed target descriptor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetSpec {
    /// `controller.<device>.<point>`
    Controller { address: String },
    /// `broker.<topic>`
    Broker { topic: String },
    /// `log` or `log.<label>`
    Log { label: Option<String> },
    /// `ui` or `ui.<channel>`
    Ui { channel: Option<String> },
    /// `sink`
    Sink,
    /// Anything else, kept verbatim for the dead letter trail
    Unknown { raw: String },
}

impl TargetSpec {
    /// Parse a descriptor. Never fails: unrecognized input becomes `Unknown`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let (class, rest) = match trimmed.split_once('.') {
            Some((class, rest)) => (class, rest.trim()),
            None => (trimmed, ""),
        };
        let rest_opt = (!rest.is_empty()).then(|| rest.to_string());

        match class {
            "controller" if !rest.is_empty() => Self::Controller {
                address: rest.to_string(),
            },
            "broker" if !rest.is_empty() => Self::Broker {
                topic: rest.to_string(),
            },
            "log" => Self::Log { label: rest_opt },
            "ui" => Self::Ui { channel: rest_opt },
            "sink" if rest.is_empty() => Self::Sink,
            _ => Self::Unknown {
                raw: trimmed.to_string(),
            },
        }
    }

    pub fn class(&self) -> TargetClass {
        match self {
            Self::Controller { .. } => TargetClass::Controller,
            Self::Broker { .. } => TargetClass::Broker,
            Self::Log { .. } => TargetClass::Log,
            Self::Ui { .. } => TargetClass::Ui,
            Self::Sink => TargetClass::Sink,
            Self::Unknown { .. } => TargetClass::Unknown,
        }
    }

    /// Address handed to the adapter (empty for in-process targets)
    pub fn address(&self) -> &str {
        match self {
            Self::Controller { address } => address,
            Self::Broker { topic } => topic,
            Self::Log { label } => label.as_deref().unwrap_or(""),
            Self::Ui { channel } => channel.as_deref().unwrap_or(""),
            Self::Sink => "",
            Self::Unknown { raw } => raw,
        }
    }

    /// Target identity for breaker isolation: device for controllers, topic root for brokers
    pub fn target_id(&self) -> &str {
        let address = self.address();
        let sep = match self {
            Self::Broker { .. } => '/',
            _ => '.',
        };
        address.split(sep).next().unwrap_or(address)
    }

    /// True when dispatch goes through an external adapter
    pub fn is_external(&self) -> bool {
        self.class().operation().is_some()
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown { raw } => f.write_str(raw),
            Self::Sink => f.write_str("sink"),
            other => {
                let address = other.address();
                if address.is_empty() {
                    f.write_str(other.class().as_str())
                } else {
                    write!(f, "{}.{}", other.class(), address)
                }
            }
        }
    }
}
