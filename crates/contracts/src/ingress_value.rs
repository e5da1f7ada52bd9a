//! IngressValue - untrusted input shape
//!
//! Adapters hand the router whatever they decoded off the wire. Nothing here is
//! bounded yet; the ingestion validator turns it into a bounded `Value`.

use bytes::Bytes;
use serde_json::Value;

/// Untrusted value as received from a source adapter.
///
/// Unlike `serde_json::Value` this can carry non-finite floats, non-string map
/// keys and raw bytes, all of which must be rejected or coerced on ingress.
#[derive(Debug, Clone, PartialEq)]
pub enum IngressValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// Opaque bytes, converted to their bounded string form on ingress
    Bytes(Bytes),
    List(Vec<IngressValue>),
    /// Key/value pairs in arrival order; keys are coerced to strings
    Map(Vec<(IngressValue, IngressValue)>),
}

impl IngressValue {
    /// Build a mapping from string keys
    pub fn map<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<IngressValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            pairs
                .into_iter()
                .map(|(k, v)| (IngressValue::Str(k.into()), v.into()))
                .collect(),
        )
    }

    /// Short type name used in rejection messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::UInt(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<Value> for IngressValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (Self::Str(k), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for IngressValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for IngressValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for IngressValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u64> for IngressValue {
    fn from(u: u64) -> Self {
        Self::UInt(u)
    }
}

impl From<f64> for IngressValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for IngressValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for IngressValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<Bytes> for IngressValue {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl<T: Into<IngressValue>> From<Vec<T>> for IngressValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<IngressValue>> From<Option<T>> for IngressValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}
