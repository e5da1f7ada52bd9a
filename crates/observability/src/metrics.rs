//! 网关指标
//!
//! 通过 `metrics` facade 记录路由器运行指标；未安装 recorder 时所有调用都是空操作。

use contracts::ErrorClass;
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use serde::Serialize;

/// 向已安装的 recorder 注册指标说明
pub(crate) fn describe_all() {
    describe_counter!(
        "gateway_events_received_total",
        "Events passed to route()"
    );
    describe_counter!(
        "gateway_events_rejected_total",
        "Events rejected by ingress validation"
    );
    describe_counter!(
        "gateway_events_rate_limited_total",
        "Events dropped by the per-source rate limiter"
    );
    describe_counter!(
        "gateway_dispatch_total",
        "Target deliveries by class and status"
    );
    describe_histogram!(
        "gateway_dispatch_latency_ms",
        Unit::Milliseconds,
        "Target delivery latency"
    );
    describe_gauge!("gateway_dlq_depth", "Entries in the dead letter queue");
    describe_counter!(
        "gateway_dlq_evicted_total",
        "Dead letters evicted by the size bound"
    );
    describe_counter!(
        "gateway_dlq_dropped_total",
        "Dead letters dropped after max attempts"
    );
    describe_gauge!(
        "gateway_breaker_state",
        "Breaker state: 0 closed, 1 open, 2 half-open"
    );
}

/// 记录入口事件
pub fn record_event_received() {
    counter!("gateway_events_received_total").increment(1);
}

/// 记录校验拒绝
pub fn record_event_rejected(reason: &'static str) {
    counter!("gateway_events_rejected_total", "reason" => reason).increment(1);
}

/// 记录限流拒绝
///
/// `suspended` 为 true 表示这一事件触发了挂起。source 不作为标签，
/// 以免不可信的 source_id 撑爆序列数；具体 source 见日志和 `get_source_stats`。
pub fn record_rate_limited(suspended: bool) {
    let outcome = if suspended { "suspended" } else { "dropped" };
    counter!("gateway_events_rate_limited_total", "outcome" => outcome).increment(1);
}

/// 记录单个目标的分发结果
///
/// `failure` 为 `None` 表示成功。
pub fn record_dispatch(target_class: &'static str, failure: Option<ErrorClass>, latency_ms: f64) {
    let status = failure.map_or("success", ErrorClass::as_str);
    counter!(
        "gateway_dispatch_total",
        "target_class" => target_class,
        "status" => status
    )
    .increment(1);
    histogram!("gateway_dispatch_latency_ms", "target_class" => target_class).record(latency_ms);
}

/// 记录死信队列深度
pub fn record_dlq_depth(depth: usize) {
    gauge!("gateway_dlq_depth").set(depth as f64);
}

/// 记录死信队列容量淘汰
pub fn record_dlq_evicted(count: u64) {
    if count > 0 {
        counter!("gateway_dlq_evicted_total").increment(count);
    }
}

/// 记录超过最大投递次数被丢弃的死信
pub fn record_dlq_dropped(count: u64) {
    if count > 0 {
        counter!("gateway_dlq_dropped_total").increment(count);
    }
}

/// 记录熔断器状态 (0=Closed, 1=Open, 2=HalfOpen)
pub fn record_breaker_state(breaker: &str, state: f64) {
    gauge!("gateway_breaker_state", "breaker" => breaker.to_string()).set(state);
}

/// 统计摘要
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
