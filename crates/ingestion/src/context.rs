//! Ambient correlation id
//!
//! Source adapters that already carry a request id run their `route` calls
//! inside `scope_correlation_id` so the id reaches every event they produce.

use std::future::Future;

tokio::task_local! {
    static CORRELATION_ID: String;
}

/// Run `fut` with `id` as the ambient correlation id
pub async fn scope_correlation_id<F>(id: impl Into<String>, fut: F) -> F::Output
where
    F: Future,
{
    CORRELATION_ID.scope(id.into(), fut).await
}

/// Correlation id of the enclosing scope, if any
pub fn current_correlation_id() -> Option<String> {
    CORRELATION_ID.try_with(Clone::clone).ok()
}
