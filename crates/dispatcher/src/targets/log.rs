//! LogTarget - one audit line per dispatched event via tracing

use contracts::DataPoint;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Target that writes a human-readable audit line per event
#[derive(Debug)]
pub struct LogTarget {
    name: String,
    lines: AtomicU64,
}

impl LogTarget {
    /// Create a new LogTarget with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lines: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lines written so far
    pub fn lines_written(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    /// Render the audit line for `event`
    pub fn format_line(label: Option<&str>, event: &DataPoint) -> String {
        let prefix = label.map(|l| format!("[{l}] ")).unwrap_or_default();
        format!(
            "{prefix}{}.{} = {} (quality={}, ts={})",
            event.source_id, event.tag, event.value, event.quality, event.timestamp_iso
        )
    }

    pub fn write(&self, label: Option<&str>, event: &DataPoint) {
        let line = Self::format_line(label, event);
        info!(
            sink = %self.name,
            source_id = %event.source_id,
            tag = %event.tag,
            correlation_id = %event.correlation_id,
            "{line}"
        );
        self.lines.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Map, DEFAULT_QUALITY};
    use serde_json::json;

    fn event() -> DataPoint {
        DataPoint {
            source_id: "plc_001".into(),
            tag: "MAIN.temp".into(),
            value: json!(21.5),
            timestamp: 0.0,
            timestamp_iso: "1970-01-01T00:00:00.000000Z".into(),
            quality: DEFAULT_QUALITY.into(),
            correlation_id: "c-1".into(),
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_log_line_format() {
        assert_eq!(
            LogTarget::format_line(Some("audit"), &event()),
            "[audit] plc_001.MAIN.temp = 21.5 (quality=good, ts=1970-01-01T00:00:00.000000Z)"
        );
        assert!(LogTarget::format_line(None, &event()).starts_with("plc_001.MAIN.temp"));
    }

    #[test]
    fn test_log_target_counts_lines() {
        let target = LogTarget::new("audit_log");
        target.write(None, &event());
        target.write(Some("x"), &event());
        assert_eq!(target.lines_written(), 2);
        assert_eq!(target.name(), "audit_log");
    }
}
