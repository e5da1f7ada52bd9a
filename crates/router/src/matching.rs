//! Rule compilation and matching
//!
//! Routes are compiled once (pattern + parsed targets) when loaded. Matching
//! is inclusive: every enabled route whose pattern matches is returned, in
//! declaration order.

use std::collections::HashSet;
use std::sync::Arc;

use contracts::{DataPoint, Pattern, Route, TargetClass, TargetSpec};
use tracing::warn;

use crate::error::{Result, RouterError};

/// One parsed target, with the descriptor as declared
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTarget {
    pub raw: String,
    pub spec: TargetSpec,
}

/// Route ready for matching
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRoute {
    pub route: Route,
    pub pattern: Pattern,
    pub targets: Vec<CompiledTarget>,
}

impl CompiledRoute {
    /// Compile one route; `from` and `to` must be non-empty
    pub fn compile(route: Route) -> Result<Self> {
        if route.from.trim().is_empty() {
            return Err(RouterError::invalid_route(&route.id, "missing 'from'"));
        }
        if route.to.is_empty() {
            return Err(RouterError::invalid_route(&route.id, "missing 'to'"));
        }

        let targets: Vec<CompiledTarget> = route
            .to
            .iter()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| CompiledTarget {
                raw: raw.trim().to_string(),
                spec: TargetSpec::parse(raw),
            })
            .collect();

        for target in targets.iter().filter(|t| t.spec.class() == TargetClass::Unknown) {
            // kept: dispatch dead-letters it as invalid_target
            warn!(route_id = %route.id, to = %target.raw, "route has an unknown target class");
        }

        Ok(Self {
            pattern: Pattern::parse(&route.from),
            route,
            targets,
        })
    }

    pub fn id(&self) -> &str {
        &self.route.id
    }

    pub fn matches(&self, event: &DataPoint) -> bool {
        self.route.enabled && self.pattern.matches(&event.source_id, &event.tag)
    }
}

/// Compile a rule set; blank ids get a positional id (`route_1`, ...)
///
/// Fails on the first incomplete rule or duplicate id.
pub fn compile_routes(routes: Vec<Route>) -> Result<Vec<Arc<CompiledRoute>>> {
    let mut seen = HashSet::new();
    let mut compiled = Vec::with_capacity(routes.len());

    for (index, mut route) in routes.into_iter().enumerate() {
        if route.id.trim().is_empty() {
            route.id = format!("route_{}", index + 1);
        }
        if !seen.insert(route.id.clone()) {
            return Err(RouterError::DuplicateRoute(route.id));
        }
        compiled.push(Arc::new(CompiledRoute::compile(route)?));
    }

    Ok(compiled)
}

/// Every enabled route matching `event`, in declaration order
pub fn match_routes(routes: &[Arc<CompiledRoute>], event: &DataPoint) -> Vec<Arc<CompiledRoute>> {
    routes
        .iter()
        .filter(|r| r.matches(event))
        .map(Arc::clone)
        .collect()
}
