//! Mock 目标 adapter
//!
//! 用于测试的 mock 实现，支持注入失败、延迟、断线和卡死场景。

use async_trait::async_trait;
use contracts::{AdapterError, DataPoint, TargetAdapter};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Mock 行为
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MockBehavior {
    /// 成功
    #[default]
    Succeed,
    /// 返回连接错误
    FailConnection,
    /// 返回 adapter 自身的超时错误
    FailTimeout,
    /// 返回一般错误
    Fail(String),
    /// 永不返回
    Hang,
}

/// Mock 目标 adapter
#[derive(Debug)]
pub struct MockAdapter {
    name: String,
    connected: AtomicBool,
    behavior: Mutex<MockBehavior>,
    delay: Mutex<Duration>,
    /// 成功送达的 (address, event)
    sent: Mutex<Vec<(String, DataPoint)>>,
    calls: AtomicU64,
}

impl MockAdapter {
    /// 创建默认（总是成功、已连接）的 mock
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_behavior(name, MockBehavior::Succeed)
    }

    pub fn with_behavior(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            connected: AtomicBool::new(true),
            behavior: Mutex::new(behavior),
            delay: Mutex::new(Duration::ZERO),
            sent: Mutex::new(Vec::new()),
            calls: AtomicU64::new(0),
        }
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// 每次 send 前的人为延迟
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// 已成功送达的事件
    pub fn sent(&self) -> Vec<(String, DataPoint)> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// send 被调用的次数（含失败）
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetAdapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, address: &str, event: &DataPoint) -> Result<(), AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let behavior = self.behavior.lock().clone();
        match behavior {
            MockBehavior::Succeed => {
                self.sent.lock().push((address.to_string(), event.clone()));
                Ok(())
            }
            MockBehavior::FailConnection => Err(AdapterError::Connection(format!(
                "{} refused connection",
                self.name
            ))),
            MockBehavior::FailTimeout => {
                Err(AdapterError::Timeout(format!("{} did not answer", self.name)))
            }
            MockBehavior::Fail(message) => Err(AdapterError::Failed(message)),
            MockBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}
