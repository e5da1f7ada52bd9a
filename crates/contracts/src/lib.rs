//! # Contracts
//!
//! Frozen interface contracts shared by every gateway crate.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Data flow
//! `IngressValue` (untrusted) → `DataPoint` (validated, normalized) → `Route`
//! targets (`TargetSpec`) → `TargetAdapter::send` or `DeadLetterEntry`.

mod adapter;
mod config;
mod data_point;
mod dead_letter;
mod error;
mod ingress_value;
mod pattern;
mod route;
mod target;

pub use adapter::{AdapterError, TargetAdapter};
pub use config::*;
pub use data_point::{DataPoint, DEFAULT_QUALITY};
pub use dead_letter::{DeadLetterEntry, ErrorClass};
pub use error::ContractError;
pub use ingress_value::IngressValue;
pub use pattern::Pattern;
pub use route::{Route, RouteTargets};
pub use target::{TargetClass, TargetSpec};

/// Re-export so downstream crates agree on the JSON value type.
pub use serde_json::{Map, Value};
