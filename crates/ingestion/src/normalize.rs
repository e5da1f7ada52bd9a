//! Normalization: validated input -> `DataPoint`
//!
//! Metadata keys consulted:
//! - `timestamp`: epoch seconds (number or numeric string) or ISO-8601 string
//! - `quality`: string, defaults to `"good"`
//! - `correlation_id`: string, else the ambient id, else a fresh UUID

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use contracts::{DataPoint, Value, DEFAULT_QUALITY};
use uuid::Uuid;

use crate::context::current_correlation_id;
use crate::validator::ValidatedInput;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Normalize with the current time as fallback timestamp
pub fn normalize(input: ValidatedInput) -> DataPoint {
    normalize_at(input, Utc::now())
}

/// Normalize with an explicit fallback timestamp
pub fn normalize_at(input: ValidatedInput, now: DateTime<Utc>) -> DataPoint {
    let instant = input
        .metadata
        .get("timestamp")
        .and_then(parse_timestamp)
        .unwrap_or(now);

    let quality = input
        .metadata
        .get("quality")
        .and_then(Value::as_str)
        .filter(|q| !q.is_empty())
        .unwrap_or(DEFAULT_QUALITY)
        .to_string();

    let correlation_id = input
        .metadata
        .get("correlation_id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .or_else(current_correlation_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    DataPoint {
        source_id: input.source_id,
        tag: input.tag,
        value: input.value,
        timestamp: instant.timestamp_micros() as f64 / 1_000_000.0,
        timestamp_iso: instant.to_rfc3339_opts(SecondsFormat::Micros, true),
        quality,
        correlation_id,
        metadata: input.metadata,
    }
}

/// Parse a raw timestamp: epoch seconds or an ISO-8601 string
///
/// Naive ISO strings are taken as UTC. Returns `None` for anything unparseable.
pub fn parse_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::Number(n) => n.as_f64().and_then(from_epoch_secs),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(secs) = s.parse::<f64>() {
                return from_epoch_secs(secs);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}

fn from_epoch_secs(secs: f64) -> Option<DateTime<Utc>> {
    let micros = (secs * 1_000_000.0).round();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_micros(micros as i64)
}
