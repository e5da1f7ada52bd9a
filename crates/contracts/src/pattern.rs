//! Source/tag patterns shared by routes and subscribers

use std::fmt;

/// Compiled `from` pattern
///
/// - `"*"` matches every event
/// - `"prefix*"` matches when `source.tag` starts with `prefix`
/// - anything else matches `source.tag`, `tag` or `source_id` exactly
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    Any,
    Prefix(String),
    Exact(String),
}

impl Pattern {
    /// Parse pattern syntax. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == "*" {
            Self::Any
        } else if let Some(prefix) = raw.strip_suffix('*') {
            Self::Prefix(prefix.to_string())
        } else {
            Self::Exact(raw.to_string())
        }
    }

    /// Check whether an event with this source and tag matches
    pub fn matches(&self, source_id: &str, tag: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Prefix(prefix) => {
                // source.tag starts with prefix, without allocating the joined key
                match prefix.strip_prefix(source_id) {
                    Some("") => true,
                    Some(rest) => match rest.strip_prefix('.') {
                        Some(tag_prefix) => tag.starts_with(tag_prefix),
                        None => false,
                    },
                    None => source_id.starts_with(prefix.as_str()),
                }
            }
            Self::Exact(exact) => {
                exact == tag || exact == source_id || Self::is_joined(exact, source_id, tag)
            }
        }
    }

    fn is_joined(exact: &str, source_id: &str, tag: &str) -> bool {
        exact
            .strip_prefix(source_id)
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|rest| rest == tag)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Prefix(p) => write!(f, "{p}*"),
            Self::Exact(e) => write!(f, "{e}"),
        }
    }
}
