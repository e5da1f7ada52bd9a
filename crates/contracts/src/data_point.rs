//! DataPoint - Ingestion output
//!
//! The canonical event flowing through the router.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Quality assigned when the source does not report one
pub const DEFAULT_QUALITY: &str = "good";

/// Validated, normalized event
///
/// Every field satisfies the ingress bounds; created once per `route` call and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Source identifier (trimmed, allow-listed characters)
    pub source_id: String,

    /// Tag within the source, may contain path separators
    pub tag: String,

    /// Sanitized, depth-limited value
    pub value: Value,

    /// Epoch seconds (UTC)
    pub timestamp: f64,

    /// Same instant as `timestamp`, RFC 3339 with `Z` suffix
    pub timestamp_iso: String,

    /// Source-reported quality, `"good"` by default
    pub quality: String,

    /// Correlation id propagated from caller, ambient context or synthesized
    pub correlation_id: String,

    /// Sanitized metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DataPoint {
    /// Cache key: `source_id.tag`
    pub fn key(&self) -> String {
        format!("{}.{}", self.source_id, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_joins_source_and_tag() {
        let point = DataPoint {
            source_id: "plc_001".into(),
            tag: "MAIN.temp".into(),
            value: json!(21.5),
            timestamp: 0.0,
            timestamp_iso: "1970-01-01T00:00:00.000000Z".into(),
            quality: DEFAULT_QUALITY.into(),
            correlation_id: "c".into(),
            metadata: Map::new(),
        };
        assert_eq!(point.key(), "plc_001.MAIN.temp");
    }
}
