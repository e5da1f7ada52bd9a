//! Route - declarative routing rule
//!
//! Loaded from durable configuration as an ordered list.

use serde::{Deserialize, Serialize};

/// A routing rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Rule identifier (used in logs and dead letters)
    #[serde(default)]
    pub id: String,

    /// Source pattern: `*`, exact `source.tag` / `tag` / `source_id`, or `prefix*`
    #[serde(default)]
    pub from: String,

    /// One or more target descriptors
    #[serde(default)]
    pub to: RouteTargets,

    /// Disabled rules never match
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Route {
    /// Create an enabled route
    pub fn new(
        id: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<RouteTargets>,
    ) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            to: to.into(),
            enabled: true,
        }
    }
}

/// Target list; a single string is treated as a singleton list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteTargets {
    One(String),
    Many(Vec<String>),
}

impl Default for RouteTargets {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl RouteTargets {
    /// Iterate target descriptors in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Self::One(target) => std::slice::from_ref(target),
            Self::Many(targets) => targets,
        };
        slice.iter().map(String::as_str)
    }

    /// True when no non-blank target is declared
    pub fn is_empty(&self) -> bool {
        self.iter().all(|t| t.trim().is_empty())
    }
}

impl From<&str> for RouteTargets {
    fn from(target: &str) -> Self {
        Self::One(target.to_string())
    }
}

impl From<String> for RouteTargets {
    fn from(target: String) -> Self {
        Self::One(target)
    }
}

impl From<Vec<&str>> for RouteTargets {
    fn from(targets: Vec<&str>) -> Self {
        Self::Many(targets.into_iter().map(String::from).collect())
    }
}

impl From<Vec<String>> for RouteTargets {
    fn from(targets: Vec<String>) -> Self {
        Self::Many(targets)
    }
}
