//! Ingress validator
//!
//! Bounds untrusted input shape before anything else touches it. Pure: no
//! counters, no logging beyond `debug!` for dropped metadata entries.
//!
//! Rules, short-circuiting on the first failure:
//! 1. `source_id` / `tag` trimmed, non-empty, length-bounded, allow-listed characters
//! 2. `value` sanitized with a depth limit
//! 3. `metadata` must be a bounded mapping; unsanitizable entries are dropped

use contracts::{IngressValue, Map, ValidationConfig, Value};
use serde_json::Number;
use tracing::debug;

use crate::error::{IngestionError, Result};

/// Characters allowed in identifiers besides alphanumerics
const IDENT_EXTRA: &[char] = &['_', '.', ':', '/', '-'];
/// Tags may additionally index arrays
const TAG_EXTRA: &[char] = &['[', ']'];

/// Validated input, ready for normalization
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    pub source_id: String,
    pub tag: String,
    pub value: Value,
    pub metadata: Map<String, Value>,
}

/// Ingress validator
#[derive(Debug, Clone, Default)]
pub struct IngressValidator {
    config: ValidationConfig,
}

impl IngressValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate one ingress call
    ///
    /// # Errors
    /// Returns the first rule violated.
    pub fn validate(
        &self,
        source_id: &str,
        tag: &str,
        value: IngressValue,
        metadata: Option<IngressValue>,
    ) -> Result<ValidatedInput> {
        let source_id =
            check_identifier("source_id", source_id, self.config.max_source_len, &[])?;
        let tag = check_identifier("tag", tag, self.config.max_tag_len, TAG_EXTRA)?;
        let value = self.sanitize("value", value, 0)?;
        let metadata = self.sanitize_metadata(metadata)?;

        Ok(ValidatedInput {
            source_id,
            tag,
            value,
            metadata,
        })
    }

    /// Depth-limited sanitization of a single value
    ///
    /// `depth` is the nesting level of `value` itself (0 for a top-level value).
    pub fn sanitize(
        &self,
        field: &'static str,
        value: IngressValue,
        depth: usize,
    ) -> Result<Value> {
        if depth > self.config.max_depth {
            return Err(IngestionError::TooDeep {
                field,
                max: self.config.max_depth,
            });
        }

        match value {
            IngressValue::Null => Ok(Value::Null),
            IngressValue::Bool(b) => Ok(Value::Bool(b)),
            IngressValue::Int(i) => Ok(Value::from(i)),
            IngressValue::UInt(u) => Ok(Value::from(u)),
            IngressValue::Float(f) => Number::from_f64(f)
                .map(Value::Number)
                .ok_or(IngestionError::NonFiniteNumber { field }),
            IngressValue::Str(s) => self.bounded_string(field, s).map(Value::String),
            IngressValue::Bytes(b) => {
                let s = String::from_utf8_lossy(&b).into_owned();
                self.bounded_string(field, s).map(Value::String)
            }
            IngressValue::List(items) => {
                if items.len() > self.config.max_list_items {
                    return Err(IngestionError::ListTooLarge {
                        field,
                        len: items.len(),
                        max: self.config.max_list_items,
                    });
                }
                items
                    .into_iter()
                    .map(|item| self.sanitize(field, item, depth + 1))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
            IngressValue::Map(pairs) => {
                if pairs.len() > self.config.max_map_keys {
                    return Err(IngestionError::MapTooLarge {
                        field,
                        len: pairs.len(),
                        max: self.config.max_map_keys,
                    });
                }
                let mut map = Map::new();
                for (key, item) in pairs {
                    let key = self.coerce_key(field, key)?;
                    map.insert(key, self.sanitize(field, item, depth + 1)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn sanitize_metadata(&self, metadata: Option<IngressValue>) -> Result<Map<String, Value>> {
        let pairs = match metadata {
            None | Some(IngressValue::Null) => return Ok(Map::new()),
            Some(IngressValue::Map(pairs)) => pairs,
            Some(other) => {
                return Err(IngestionError::MetadataNotMapping { kind: other.kind() });
            }
        };

        if pairs.len() > self.config.max_metadata_keys {
            return Err(IngestionError::MapTooLarge {
                field: "metadata",
                len: pairs.len(),
                max: self.config.max_metadata_keys,
            });
        }

        let mut map = Map::new();
        for (key, item) in pairs {
            let entry = self
                .coerce_key("metadata", key)
                .and_then(|key| Ok((key, self.sanitize("metadata", item, 0)?)));
            match entry {
                Ok((key, value)) => {
                    map.insert(key, value);
                }
                Err(reason) => debug!(%reason, "dropping metadata entry"),
            }
        }
        Ok(map)
    }

    fn bounded_string(&self, field: &'static str, s: String) -> Result<String> {
        let len = s.chars().count();
        if len > self.config.max_string_len {
            return Err(IngestionError::StringTooLong {
                field,
                len,
                max: self.config.max_string_len,
            });
        }
        Ok(s)
    }

    /// Coerce a mapping key to a string truncated to `max_key_len` characters
    fn coerce_key(&self, field: &'static str, key: IngressValue) -> Result<String> {
        let key = match key {
            IngressValue::Str(s) => s,
            IngressValue::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
            IngressValue::Int(i) => i.to_string(),
            IngressValue::UInt(u) => u.to_string(),
            IngressValue::Float(f) if f.is_finite() => f.to_string(),
            IngressValue::Bool(b) => b.to_string(),
            IngressValue::Null => "null".to_string(),
            other => {
                return Err(IngestionError::InvalidKey {
                    field,
                    kind: other.kind(),
                });
            }
        };
        Ok(truncate_chars(key, self.config.max_key_len))
    }
}

fn check_identifier(
    field: &'static str,
    raw: &str,
    max: usize,
    extra: &[char],
) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IngestionError::EmptyField { field });
    }

    let len = trimmed.chars().count();
    if len > max {
        return Err(IngestionError::FieldTooLong { field, len, max });
    }

    if let Some(ch) = trimmed
        .chars()
        .find(|c| !(c.is_alphanumeric() || IDENT_EXTRA.contains(c) || extra.contains(c)))
    {
        return Err(IngestionError::InvalidCharacter { field, ch });
    }

    Ok(trimmed.to_string())
}

fn truncate_chars(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s,
    }
}
