//! # Ingestion
//!
//! Front of the router pipeline.
//!
//! Responsibilities:
//! - Validate untrusted input shape (`IngressValidator`)
//! - Per-source packets-per-second limiting with latching suspension (`RateLimiter`)
//! - Normalize validated input into a `DataPoint` (timestamp, quality, correlation id)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{normalize, IngressValidator, RateLimiter};
//!
//! let validator = IngressValidator::new(config.validation.clone());
//! let mut limiter = RateLimiter::new(config.rate_limit.clone());
//!
//! let input = validator.validate("plc_001", "MAIN.temp", 21.5.into(), None)?;
//! if limiter.admit(&input.source_id).is_allowed() {
//!     let event = normalize(input);
//! }
//! ```

mod context;
mod error;
mod normalize;
mod rate_limiter;
mod validator;

// Re-exports
pub use context::{current_correlation_id, scope_correlation_id};
pub use error::{IngestionError, Result};
pub use normalize::{normalize, normalize_at, parse_timestamp};
pub use rate_limiter::{Admission, RateLimiter, SourceStats, SourceStatus};
pub use validator::{IngressValidator, ValidatedInput};

/// Reason an event was rejected at ingress
pub type RejectReason = IngestionError;
