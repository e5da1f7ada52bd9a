//! # Router
//!
//! 通用数据路由器。
//!
//! 负责：
//! - 入口校验、限流、规范化
//! - 按规则匹配事件并分发到各目标
//! - 失败投递进入死信队列，支持有上限的重处理
//! - 维护 telemetry / blob 缓存与订阅通知
//!
//! ## 使用示例
//!
//! ```ignore
//! use contracts::{Route, RouterConfig, TargetClass};
//! use router::Router;
//!
//! let config = RouterConfig {
//!     routes: vec![Route::new("plc_to_ui", "plc_001.*", vec!["ui", "log"])],
//!     ..Default::default()
//! };
//! let router = Router::builder(config)
//!     .adapter(TargetClass::Controller, controller_adapter)
//!     .build()?;
//!
//! router.route("plc_001", "MAIN.temp", 21.5, None).await;
//! ```

mod error;
mod matching;
mod router;
mod stats;

// Re-exports
pub use cache::SubscriptionId;
pub use dispatcher::{BreakerSnapshot, CircuitState, DeadLetterStats, UiUpdate};
pub use error::{Result, RouterError};
pub use ingestion::{scope_correlation_id, SourceStats, SourceStatus};
pub use matching::{compile_routes, match_routes, CompiledRoute, CompiledTarget};
pub use router::{Router, RouterBuilder};
pub use stats::{ReprocessReport, RoutingStats};
