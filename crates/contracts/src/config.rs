//! RouterConfig - Config Loader 输出
//!
//! 描述路由器的完整配置：入口校验上限、限流、熔断、死信队列、缓存、分发与路由规则。

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::Route;

/// 完整的路由器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RouterConfig {
    /// 入口校验上限
    #[serde(default)]
    #[validate(nested)]
    pub validation: ValidationConfig,

    /// 每个 source 的限流（spam protection）
    #[serde(default)]
    #[validate(nested)]
    pub rate_limit: RateLimitConfig,

    /// 每个目标的熔断器参数
    #[serde(default)]
    #[validate(nested)]
    pub circuit_breaker: CircuitBreakerConfig,

    /// 死信队列
    #[serde(default)]
    #[validate(nested)]
    pub dead_letter: DeadLetterConfig,

    /// Blob / telemetry 缓存预算
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheConfig,

    /// 分发参数
    #[serde(default)]
    #[validate(nested)]
    pub dispatch: DispatchConfig,

    /// 路由规则（按声明顺序匹配）
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// 入口校验上限
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ValidationConfig {
    /// source_id 最大字符数
    #[validate(range(min = 1))]
    pub max_source_len: usize,
    /// tag 最大字符数
    #[validate(range(min = 1))]
    pub max_tag_len: usize,
    /// value / metadata 最大嵌套深度
    #[validate(range(min = 1, max = 32))]
    pub max_depth: usize,
    /// 字符串最大字符数
    #[validate(range(min = 1))]
    pub max_string_len: usize,
    /// 列表最大元素数
    #[validate(range(min = 1))]
    pub max_list_items: usize,
    /// 映射最大键数
    #[validate(range(min = 1))]
    pub max_map_keys: usize,
    /// 键截断长度
    #[validate(range(min = 1))]
    pub max_key_len: usize,
    /// metadata 最大键数
    #[validate(range(min = 1))]
    pub max_metadata_keys: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_source_len: 128,
            max_tag_len: 256,
            max_depth: 5,
            max_string_len: 4096,
            max_list_items: 128,
            max_map_keys: 64,
            max_key_len: 64,
            max_metadata_keys: 32,
        }
    }
}

/// 限流配置（滑动窗口）
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RateLimitConfig {
    /// 是否启用
    pub enabled: bool,
    /// 窗口宽度（秒）
    #[validate(range(min = 0.001))]
    pub window_secs: f64,
    /// 每秒最大包数，超过即挂起 source
    #[validate(range(min = 1.0))]
    pub max_packets_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 1.0,
            max_packets_per_sec: 500.0,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::try_from_secs_f64(self.window_secs).unwrap_or(Duration::from_secs(1))
    }
}

/// 熔断器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// 连续失败次数阈值
    #[validate(range(min = 1))]
    pub failure_threshold: u32,
    /// Open → HalfOpen 等待时间（秒）
    #[validate(range(min = 0.0))]
    pub recovery_timeout_secs: f64,
    /// HalfOpen 状态允许的并发探测数
    #[validate(range(min = 1))]
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout_secs: 30.0,
            half_open_max_calls: 1,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.recovery_timeout_secs)
            .unwrap_or(Duration::from_secs(30))
    }
}

/// 死信队列配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeadLetterConfig {
    /// 最大条目数，超出后 FIFO 淘汰
    #[validate(range(min = 1))]
    pub max_entries: usize,
    /// 最大投递次数，超出后丢弃
    #[validate(range(min = 1))]
    pub max_attempts: u32,
    /// 每次重处理的默认条数（None = max_entries / 2）
    #[validate(range(min = 1))]
    pub reprocess_batch: Option<usize>,
}

impl Default for DeadLetterConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            max_attempts: 5,
            reprocess_batch: None,
        }
    }
}

impl DeadLetterConfig {
    pub fn effective_reprocess_batch(&self) -> usize {
        self.reprocess_batch
            .unwrap_or(self.max_entries / 2)
            .max(1)
    }
}

/// 缓存配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    /// Blob 缓存总字节预算
    #[validate(range(min = 1))]
    pub blob_budget_bytes: usize,
    /// Telemetry 缓存最大条目数
    #[validate(range(min = 1))]
    pub telemetry_limit: usize,
    /// 超限时一次淘汰的条目数（None = limit / 2）
    #[validate(range(min = 1))]
    pub telemetry_prune_batch: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            blob_budget_bytes: 512 * 1024 * 1024,
            telemetry_limit: 10_000,
            telemetry_prune_batch: None,
        }
    }
}

impl CacheConfig {
    pub fn effective_prune_batch(&self) -> usize {
        self.telemetry_prune_batch
            .unwrap_or(self.telemetry_limit / 2)
            .max(1)
    }
}

/// 分发配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DispatchConfig {
    /// 单次 adapter 调用超时（毫秒）
    #[validate(range(min = 1))]
    pub send_timeout_ms: u64,
    /// UI 广播通道容量
    #[validate(range(min = 1))]
    pub ui_channel_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: 5_000,
            ui_channel_capacity: 1024,
        }
    }
}

impl DispatchConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}
