//! # Cache
//!
//! 路由器在路由过程中维护的有界内存缓存。
//!
//! 负责：
//! - Blob 缓存：按字节预算、严格 FIFO 淘汰
//! - Telemetry 缓存：每个 key 只保留最新值，超限时批量淘汰
//! - 订阅表：按 pattern 通知回调
//!
//! 三者都不做内部同步，由 `Router` 在自己的锁内持有。
//!
//! ## 使用示例
//!
//! ```ignore
//! use cache::{BlobCache, TelemetryCache};
//!
//! let mut blobs = BlobCache::new(512 * 1024 * 1024);
//! blobs.put("frame.jpg", payload);
//!
//! let mut telemetry = TelemetryCache::new(10_000, 5_000);
//! telemetry.put(event.key(), event.value.clone());
//! ```

mod blob;
mod subscribers;
mod telemetry;

// Re-exports
pub use blob::{BlobCache, BlobCacheStats};
pub use subscribers::{notify_all, SubscriberCallback, SubscriberTable, SubscriptionId};
pub use telemetry::{TelemetryCache, TelemetryCacheStats};
