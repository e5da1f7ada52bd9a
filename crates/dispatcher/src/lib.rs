//! # Dispatcher
//!
//! 目标分发模块。
//!
//! 负责：
//! - 解析后的目标执行（log / ui / sink / controller / broker）
//! - 每个外部目标一个熔断器，隔离故障目标
//! - 死信队列：记录失败投递，支持有上限的重试
//! - 测试用 mock adapter

pub mod adapters;
pub mod breaker;
pub mod dispatcher;
pub mod dlq;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod targets;

pub use adapters::{MockAdapter, MockBehavior};
pub use breaker::{BreakerError, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use dlq::{DeadLetterQueue, DeadLetterStats, RequeueOutcome};
pub use error::DispatchError;
pub use metrics::{DispatchMetrics, DispatchMetricsSnapshot};
pub use registry::{BreakerKey, BreakerRegistry};
pub use targets::{LogTarget, UiBroadcast, UiUpdate};
