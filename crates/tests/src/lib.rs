//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 路由器端到端行为（校验、限流、匹配、分发、死信、缓存）
//! - 并发测试：卡住的目标不阻塞其他 source 的摄入

#[cfg(test)]
mod contract_tests {
    use contracts::{ErrorClass, TargetClass, TargetSpec};

    #[test]
    fn test_error_class_wire_names() {
        let names: Vec<_> = [
            ErrorClass::ValidationReject,
            ErrorClass::RateLimited,
            ErrorClass::CircuitOpen,
            ErrorClass::InvalidTarget,
            ErrorClass::Timeout,
            ErrorClass::ConnectionError,
            ErrorClass::RoutingError,
        ]
        .iter()
        .map(|c| c.as_str())
        .collect();
        assert_eq!(
            names,
            [
                "validation_reject",
                "rate_limited",
                "circuit_open",
                "invalid_target",
                "timeout",
                "connection_error",
                "routing_error"
            ]
        );
    }

    #[test]
    fn test_target_descriptors() {
        assert_eq!(
            TargetSpec::parse("controller.plc_001.MAIN.SP").class(),
            TargetClass::Controller
        );
        assert_eq!(TargetSpec::parse("unknowntype.foo").class(), TargetClass::Unknown);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        CircuitBreakerConfig, ErrorClass, IngressValue, Route, RouterConfig, TargetClass,
    };
    use dispatcher::{CircuitBreaker, CircuitState, MockAdapter, MockBehavior};
    use router::{scope_correlation_id, Router, SourceStatus};
    use serde_json::json;

    const MIB: usize = 1024 * 1024;

    fn router_with(config: RouterConfig) -> Router {
        Router::builder(config).build().unwrap()
    }

    fn nested(depth: usize) -> IngressValue {
        (0..depth).fold(IngressValue::Int(1), |inner, _| IngressValue::List(vec![inner]))
    }

    /// 非法 source_id / tag：返回 false，且不进入缓存和订阅者
    #[tokio::test]
    async fn test_invalid_identity_never_reaches_cache_or_subscribers() {
        observability::init_for_tests();
        let router = router_with(RouterConfig {
            routes: vec![Route::new("all", "*", "log")],
            ..Default::default()
        });
        let notified = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&notified);
        router.subscribe("*", move |_| {
            n.fetch_add(1, Ordering::SeqCst);
        });

        let long_source = "s".repeat(129);
        let long_tag = "t".repeat(257);
        let cases: [(&str, &str); 6] = [
            ("", "MAIN.temp"),
            ("plc_001", ""),
            (&long_source, "MAIN.temp"),
            ("plc_001", &long_tag),
            ("plc 001", "MAIN.temp"),
            ("plc_001", "MAIN;temp"),
        ];
        for (source_id, tag) in cases {
            assert!(!router.route(source_id, tag, 1, None).await, "{source_id:?}/{tag:?}");
        }

        assert!(router.get_all_telemetry().is_empty());
        assert_eq!(notified.load(Ordering::SeqCst), 0);
        let stats = router.get_routing_stats();
        assert_eq!(stats.events_rejected, 6);
        assert_eq!(stats.dispatch_success, 0);
    }

    /// 嵌套超过 5 层或含非有限数：返回 false
    #[tokio::test]
    async fn test_depth_and_non_finite_rejected() {
        let router = router_with(RouterConfig::default());

        assert!(router.route("s", "ok", nested(5), None).await);
        assert!(!router.route("s", "deep", nested(6), None).await);
        assert!(!router.route("s", "nan", f64::NAN, None).await);
        assert!(!router.route("s", "inf", f64::INFINITY, None).await);
        let in_list = IngressValue::List(vec![IngressValue::Float(f64::NEG_INFINITY)]);
        assert!(!router.route("s", "inf_list", in_list, None).await);

        assert!(router.get_telemetry("s.ok").is_some());
        assert_eq!(router.get_all_telemetry().len(), 1);
    }

    /// 500 pps / 1s 窗口：第 501 个事件被拒绝并挂起 source，reset 后恢复
    #[tokio::test]
    async fn test_rate_limit_latches_until_reset() {
        let router = router_with(RouterConfig::default());

        for i in 0..500 {
            assert!(router.route("spam", "t", i, None).await, "event {i}");
        }
        assert!(!router.route("spam", "t", 500, None).await);
        assert!(!router.route("spam", "t", 501, None).await);
        assert!(router.route("other", "t", 1, None).await);

        let spam = router
            .get_source_stats()
            .into_iter()
            .find(|s| s.source_id == "spam")
            .unwrap();
        assert_eq!(spam.status, SourceStatus::Suspended);
        assert_eq!(router.get_routing_stats().suspended_sources, 1);

        assert!(router.reset_rate_limit("spam"));
        assert!(router.route("spam", "t", 502, None).await);
        assert!(!router.reset_rate_limit("never_seen"));
    }

    /// failure_threshold=2, recovery=0.05s, half_open_max_calls=1
    #[tokio::test]
    async fn test_breaker_open_half_open_closed() {
        let breaker = CircuitBreaker::new(
            "controller:plc_001:write",
            CircuitBreakerConfig {
                failure_threshold: 2,
                recovery_timeout_secs: 0.05,
                half_open_max_calls: 1,
            },
        );

        breaker.record_failure("refused");
        assert!(breaker.allow_request());
        breaker.record_failure("refused");
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        let snapshot = breaker.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 0);
    }

    /// unknowntype.foo：invalid_target 入死信，重处理直到超过 max_attempts 后丢弃
    #[tokio::test]
    async fn test_invalid_target_reprocessed_until_dropped() {
        let router = router_with(RouterConfig {
            routes: vec![Route::new("odd", "*", "unknowntype.foo")],
            ..Default::default()
        });

        assert!(router.route("plc_001", "MAIN.temp", 1, None).await);
        let entry = &router.get_dead_letters(1)[0];
        assert_eq!(entry.error_class, ErrorClass::InvalidTarget);
        assert_eq!(entry.target, "unknowntype.foo");
        assert_eq!(entry.route_id, "odd");

        let max_attempts = router.config().dead_letter.max_attempts;
        for attempt in 2..=max_attempts {
            let report = router.reprocess_dead_letters(None).await;
            assert_eq!(report.requeued, 1);
            assert_eq!(router.get_dead_letters(1)[0].attempts, attempt);
        }

        let report = router.reprocess_dead_letters(None).await;
        assert_eq!(report.dropped, 1);
        let stats = router.get_dead_letter_stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.dropped, 1);
    }

    /// 512 MiB 预算：400 MiB 之后放入 300 MiB 会先淘汰前者
    #[tokio::test]
    async fn test_blob_budget_evicts_fifo() {
        let router = router_with(RouterConfig::default());

        assert!(router.put_blob("first", Bytes::from(vec![0u8; 400 * MIB])));
        assert!(router.put_blob("second", Bytes::from(vec![0u8; 300 * MIB])));

        assert!(router.get_blob("first").is_none());
        assert_eq!(router.get_blob("second").map(|b| b.len()), Some(300 * MIB));

        let blob = router.get_routing_stats().blob;
        assert_eq!(blob.misses, 1);
        assert_eq!(blob.hits, 1);
        assert_eq!(blob.evictions, 1);
        assert_eq!(blob.bytes_used, 300 * MIB);
    }

    /// plc_001.* 只匹配 plc_001；* 匹配全部
    #[tokio::test]
    async fn test_route_matching_end_to_end() {
        let plc = Arc::new(MockAdapter::new("plc"));
        let router = Router::builder(RouterConfig {
            routes: vec![
                Route::new("plc1", "plc_001.*", "controller.plc_100.MIRROR"),
                Route::new("all", "*", "ui"),
            ],
            ..Default::default()
        })
        .adapter(TargetClass::Controller, plc.clone())
        .build()
        .unwrap();
        let mut ui = router.subscribe_ui();

        assert!(router.route("plc_001", "MAIN.temp", 21.5, None).await);
        assert!(router.route("plc_002", "MAIN.temp", 19.0, None).await);

        let sent = plc.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "plc_100.MIRROR");
        assert_eq!(sent[0].1.source_id, "plc_001");

        assert_eq!(ui.recv().await.unwrap().key, "plc_001.MAIN.temp");
        assert_eq!(ui.recv().await.unwrap().key, "plc_002.MAIN.temp");
        assert_eq!(router.get_routing_stats().route_matches, 3);
    }

    /// limit=10000, prune_batch=5000：第 10001 个 key 一次淘汰 5000 个最旧 key
    #[tokio::test]
    async fn test_telemetry_batch_eviction() {
        let mut config = RouterConfig::default();
        config.rate_limit.enabled = false;
        let router = router_with(config);

        for i in 0..10_000 {
            assert!(router.route("plc_001", &format!("tag_{i}"), i, None).await);
        }
        assert_eq!(router.get_all_telemetry().len(), 10_000);

        assert!(router.route("plc_001", "tag_10000", 10_000, None).await);
        let telemetry = router.get_all_telemetry();
        assert_eq!(telemetry.len(), 5_001);
        assert!(!telemetry.contains_key("plc_001.tag_0"));
        assert!(!telemetry.contains_key("plc_001.tag_4999"));
        assert!(telemetry.contains_key("plc_001.tag_5000"));
        assert_eq!(router.get_routing_stats().telemetry.evictions, 5_000);
    }

    /// 失败目标互不影响：一个目标失败入死信，另一个照常送达
    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let plc = Arc::new(MockAdapter::with_behavior("plc", MockBehavior::FailTimeout));
        let broker = Arc::new(MockAdapter::new("broker"));
        let router = Router::builder(RouterConfig {
            routes: vec![Route::new(
                "fanout",
                "*",
                vec!["controller.plc_001.SP", "broker.plant/line1", "log.audit"],
            )],
            ..Default::default()
        })
        .adapter(TargetClass::Controller, plc)
        .adapter(TargetClass::Broker, broker.clone())
        .build()
        .unwrap();

        let metadata = IngressValue::map([("quality", IngressValue::from("uncertain"))]);
        let accepted = scope_correlation_id(
            "req-7",
            router.route("hmi", "MAIN.setpoint", json!({"sp": 42}), Some(metadata)),
        )
        .await;
        assert!(accepted);

        assert_eq!(broker.sent_count(), 1);
        assert_eq!(broker.sent()[0].1.quality, "uncertain");

        let letters = router.get_dead_letters(10);
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].error_class, ErrorClass::Timeout);
        assert_eq!(letters[0].correlation_id, "req-7");

        let stats = router.get_routing_stats();
        assert_eq!(stats.dispatch_success, 2);
        assert_eq!(stats.dispatch_failed, 1);
    }

    /// 断开的 adapter 触发熔断，之后直接 circuit_open 入死信
    #[tokio::test]
    async fn test_disconnected_adapter_opens_breaker() {
        let plc = Arc::new(MockAdapter::new("plc"));
        plc.set_connected(false);
        let mut config = RouterConfig {
            routes: vec![Route::new("w", "*", "controller.plc_001.SP")],
            ..Default::default()
        };
        config.circuit_breaker.failure_threshold = 2;
        let router = Router::builder(config)
            .adapter(TargetClass::Controller, plc.clone())
            .build()
            .unwrap();

        for i in 0..3 {
            router.route("hmi", "sp", i, None).await;
        }

        let classes: Vec<_> = router
            .get_dead_letters(3)
            .into_iter()
            .rev()
            .map(|e| e.error_class)
            .collect();
        assert_eq!(
            classes,
            [
                ErrorClass::ConnectionError,
                ErrorClass::ConnectionError,
                ErrorClass::CircuitOpen
            ]
        );
        assert_eq!(plc.call_count(), 0);

        let breakers = router.get_circuit_breakers();
        assert_eq!(breakers[0].name, "controller:plc_001:write");
        assert_eq!(breakers[0].state, CircuitState::Open);
    }

    /// 订阅者 panic 被捕获计数，不影响路由；取消订阅后不再通知
    #[tokio::test]
    async fn test_subscribers_isolated_and_removable() {
        let router = router_with(RouterConfig::default());
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        let id = router.subscribe("plc_001.*", move |event| {
            assert_eq!(event.source_id, "plc_001");
            s.fetch_add(1, Ordering::SeqCst);
        });
        router.subscribe("*", |_| panic!("bad subscriber"));

        assert!(router.route("plc_001", "MAIN.temp", 1, None).await);
        assert!(router.route("plc_002", "MAIN.temp", 1, None).await);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(router.get_routing_stats().subscriber_errors, 2);

        assert!(router.unsubscribe("plc_001.*", id));
        assert!(!router.unsubscribe("plc_001.*", id));
        assert!(router.route("plc_001", "MAIN.temp", 2, None).await);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    /// 从配置文件加载规则并热替换
    #[tokio::test]
    async fn test_config_routes_and_reload() {
        let content = r#"
[dead_letter]
max_entries = 10

[[routes]]
id = "temps"
from = "MAIN.temp"
to = "log"
"#;
        let config = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();
        let router = router_with(config);
        assert_eq!(router.get_dead_letter_stats().max_entries, 10);

        assert!(router.route("plc_009", "MAIN.temp", 1, None).await);
        assert_eq!(router.get_routing_stats().route_matches, 1);

        assert!(router.reload_routes(vec![Route::new("none", "", "log")]).is_err());
        assert_eq!(router.routes()[0].id, "temps");

        assert_eq!(router.reload_routes(vec![]).unwrap(), 0);
        assert!(router.route("plc_009", "MAIN.temp", 2, None).await);
        assert_eq!(router.get_routing_stats().route_matches, 1);
        assert_eq!(router.get_telemetry("plc_009.MAIN.temp"), Some(json!(2)));
    }

    /// 卡住的 controller 不阻塞其他调用者的摄入
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stuck_target_does_not_block_ingestion() {
        let plc = Arc::new(MockAdapter::with_behavior("plc", MockBehavior::Hang));
        let mut config = RouterConfig {
            routes: vec![Route::new("stuck", "plc_001.*", "controller.plc_001.SP")],
            ..Default::default()
        };
        config.dispatch.send_timeout_ms = 60_000;
        let router = Arc::new(
            Router::builder(config)
                .adapter(TargetClass::Controller, plc.clone())
                .build()
                .unwrap(),
        );

        let stuck = {
            let router = Arc::clone(&router);
            tokio::spawn(async move { router.route("plc_001", "MAIN.temp", 1, None).await })
        };
        while plc.call_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let others = async {
            for i in 0..50 {
                assert!(router.route("hmi", &format!("tag_{i}"), i, None).await);
            }
            router.get_routing_stats()
        };
        let stats = tokio::time::timeout(Duration::from_secs(2), others)
            .await
            .expect("ingestion blocked by a stuck target");
        assert_eq!(stats.events_routed, 50);
        assert_eq!(router.get_telemetry("plc_001.MAIN.temp"), Some(json!(1)));

        // 取消卡住的调用者不破坏共享状态
        stuck.abort();
        assert!(stuck.await.unwrap_err().is_cancelled());
        assert!(router.route("hmi", "after", 1, None).await);
        assert_eq!(router.get_dead_letter_stats().size, 0);
    }

    /// 重处理被取消时，未处理的死信回到队列
    #[tokio::test]
    async fn test_cancelled_reprocess_restores_entries() {
        let plc = Arc::new(MockAdapter::with_behavior("plc", MockBehavior::FailConnection));
        let mut config = RouterConfig {
            routes: vec![Route::new("w", "*", "controller.plc_001.SP")],
            ..Default::default()
        };
        config.circuit_breaker.failure_threshold = 100;
        let router = Router::builder(config)
            .adapter(TargetClass::Controller, plc.clone())
            .build()
            .unwrap();

        for i in 0..3 {
            router.route("hmi", &format!("t{i}"), i, None).await;
        }
        assert_eq!(router.get_dead_letter_stats().size, 3);

        plc.set_behavior(MockBehavior::Hang);
        let pass = router.reprocess_dead_letters(Some(3));
        let cancelled = tokio::time::timeout(Duration::from_millis(50), pass).await;
        assert!(cancelled.is_err());

        let tags: Vec<_> = router
            .get_dead_letters(3)
            .into_iter()
            .rev()
            .map(|e| e.tag)
            .collect();
        assert_eq!(tags, ["t0", "t1", "t2"]);

        plc.set_behavior(MockBehavior::Succeed);
        let report = router.reprocess_dead_letters(None).await;
        assert_eq!(report.succeeded, 3);
        router.clear_dead_letters();
        router.shutdown();
    }
}
