//! Integration tests for the SQLite layer

mod common;

use chrono::{Duration as ChronoDuration, Utc};
use common::fixtures::*;
use std::collections::HashSet;

use monitor::database::{Database, SiteRecord};
use monitor::errors::MonitorError;
use monitor::types::{CheckResult, CheckStatus, LastResult, MonitorStatus, MonitorType};

#[tokio::test]
async fn test_monitor_roundtrip_preserves_definition() {
    let db = TestDatabase::new().await.unwrap();
    let mut monitor = http_monitor("api", sites::SHOP);
    monitor.monitor_type = MonitorType::Http {
        url: "https://shop.example.com/health".to_string(),
        expected_status: Some(204),
    };
    monitor.retry_attempts = 3;
    monitor.last_result = Some(LastResult::from_check(
        &CheckResult::up(17, "HTTP 204"),
        Utc::now(),
    ));
    db.seed_monitor(&monitor).await.unwrap();

    let stored = db.monitor("api").await;
    assert_eq!(stored.monitor_type, monitor.monitor_type);
    assert_eq!(stored.retry_attempts, 3);
    assert_eq!(stored.check_interval_ms, 60_000);
    assert_eq!(stored.status, MonitorStatus::Pending);
    assert!(!stored.is_monitoring);
    assert_eq!(stored.last_result.unwrap().response_time_ms, 17);
    assert!(stored.active_operations.is_empty());
}

#[tokio::test]
async fn test_duplicate_monitor_insert_fails() {
    let db = TestDatabase::new().await.unwrap();
    let monitor = http_monitor("api", sites::SHOP);
    db.seed_monitor(&monitor).await.unwrap();

    let err = db.database().insert_monitor(&monitor).await.unwrap_err();
    assert!(matches!(err, MonitorError::Database(_)));
}

#[tokio::test]
async fn test_list_monitors_filters_by_site() {
    let db = TestDatabase::new().await.unwrap();
    db.seed_monitor(&http_monitor("b", sites::SHOP)).await.unwrap();
    db.seed_monitor(&http_monitor("a", sites::SHOP)).await.unwrap();
    db.seed_monitor(&http_monitor("c", sites::BLOG)).await.unwrap();

    let database = db.database();
    let shop: Vec<String> = database
        .list_monitors(Some(sites::SHOP))
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(shop, vec!["a", "b"]);
    assert_eq!(database.list_monitors(None).await.unwrap().len(), 3);
    assert!(database.list_monitors(Some("none")).await.unwrap().is_empty());

    let sites: Vec<SiteRecord> = database.list_sites().await.unwrap();
    assert_eq!(sites.len(), 2);
}

#[tokio::test]
async fn test_monitoring_flags() {
    let db = TestDatabase::new().await.unwrap();
    let mut monitor = http_monitor("api", sites::SHOP);
    monitor.status = MonitorStatus::Paused;
    db.seed_monitor(&monitor).await.unwrap();
    let database = db.database();

    assert!(database.mark_monitoring_started("api").await.unwrap());
    let stored = db.monitor("api").await;
    assert!(stored.is_monitoring);
    assert_eq!(stored.status, MonitorStatus::Pending);
    assert_eq!(database.count_monitoring().await.unwrap(), 1);

    assert!(database.mark_monitoring_stopped("api").await.unwrap());
    let stored = db.monitor("api").await;
    assert!(!stored.is_monitoring);
    assert_eq!(stored.status, MonitorStatus::Paused);
    assert_eq!(database.count_monitoring().await.unwrap(), 0);

    assert!(!database.mark_monitoring_started("missing").await.unwrap());
    assert!(!database.mark_monitoring_stopped("missing").await.unwrap());
}

#[tokio::test]
async fn test_started_keeps_non_paused_status() {
    let db = TestDatabase::new().await.unwrap();
    let mut monitor = http_monitor("api", sites::SHOP);
    monitor.status = MonitorStatus::Down;
    db.seed_monitor(&monitor).await.unwrap();

    db.database().mark_monitoring_started("api").await.unwrap();
    assert_eq!(db.monitor("api").await.status, MonitorStatus::Down);
}

#[tokio::test]
async fn test_status_write_requires_monitoring() {
    let db = TestDatabase::new().await.unwrap();
    db.seed_monitor(&http_monitor("idle", sites::SHOP)).await.unwrap();
    db.seed_monitor(&monitored("live", sites::SHOP, MonitorStatus::Pending))
        .await
        .unwrap();
    let database = db.database();
    let last = LastResult::from_check(&CheckResult::down(0, "refused"), Utc::now());

    let mut tx = database.begin().await.unwrap();
    let idle = Database::write_status(&mut tx, "idle", MonitorStatus::Down, &last)
        .await
        .unwrap();
    let live = Database::write_status(&mut tx, "live", MonitorStatus::Down, &last)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert!(!idle);
    assert!(live);
    assert_eq!(db.monitor("idle").await.status, MonitorStatus::Pending);
    assert_eq!(db.monitor("live").await.status, MonitorStatus::Down);
}

#[tokio::test]
async fn test_rolled_back_transaction_leaves_no_trace() {
    let db = TestDatabase::new().await.unwrap();
    db.seed_monitor(&monitored("api", sites::SHOP, MonitorStatus::Up))
        .await
        .unwrap();
    let database = db.database();
    let result = CheckResult::down(3, "refused");
    let last = LastResult::from_check(&result, Utc::now());

    {
        let mut tx = database.begin().await.unwrap();
        Database::write_status(&mut tx, "api", MonitorStatus::Down, &last)
            .await
            .unwrap();
        Database::insert_history(&mut tx, "api", &result, Utc::now())
            .await
            .unwrap();
        // Dropped without commit
    }

    assert_eq!(db.monitor("api").await.status, MonitorStatus::Up);
    assert_eq!(db.history_count("api").await, 0);
}

#[tokio::test]
async fn test_active_operations_and_reconcile() {
    let db = TestDatabase::new().await.unwrap();
    db.seed_monitor(&monitored("api", sites::SHOP, MonitorStatus::Up))
        .await
        .unwrap();
    db.seed_monitor(&monitored("web", sites::SHOP, MonitorStatus::Up))
        .await
        .unwrap();
    let database = db.database();

    database.add_active_operation("api", "op-1").await.unwrap();
    database.add_active_operation("api", "op-2").await.unwrap();
    database.add_active_operation("api", "op-2").await.unwrap();
    database.add_active_operation("web", "op-3").await.unwrap();
    assert_eq!(db.monitor("api").await.active_operations, vec!["op-1", "op-2"]);

    let err = database
        .add_active_operation("missing", "op-9")
        .await
        .unwrap_err();
    assert!(matches!(err, MonitorError::MonitorNotFound { .. }));

    // Only op-2 survived a restart
    let registered: HashSet<String> = ["op-2".to_string()].into_iter().collect();
    let cleared = database
        .reconcile_active_operations(&registered)
        .await
        .unwrap();
    assert_eq!(cleared, 2);
    assert_eq!(db.monitor("api").await.active_operations, vec!["op-2"]);
    assert!(db.monitor("web").await.active_operations.is_empty());

    // Idempotent
    assert_eq!(
        database
            .reconcile_active_operations(&registered)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn test_history_order_and_prune() {
    let db = TestDatabase::new().await.unwrap();
    db.seed_monitor(&monitored("api", sites::SHOP, MonitorStatus::Up))
        .await
        .unwrap();
    let database = db.database();
    let base = Utc::now() - ChronoDuration::minutes(10);

    let mut tx = database.begin().await.unwrap();
    for i in 0..6i64 {
        let result = if i % 2 == 0 {
            CheckResult::up(i as u64, "ok")
        } else {
            CheckResult::down(i as u64, "refused")
        };
        Database::insert_history(&mut tx, "api", &result, base + ChronoDuration::seconds(i))
            .await
            .unwrap();
    }
    let pruned = Database::prune_history(&mut tx, "api", 4).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(pruned, 2);
    let history = database.get_history("api", 10).await.unwrap();
    let times: Vec<u64> = history.iter().map(|h| h.response_time_ms).collect();
    assert_eq!(times, vec![5, 4, 3, 2]);
    assert_eq!(history[0].status, CheckStatus::Down);
    assert_eq!(history[0].error.as_deref(), Some("refused"));
    assert_eq!(history[1].details.as_deref(), Some("ok"));

    let page = database.get_history("api", 2).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].response_time_ms, 5);
}

#[tokio::test]
async fn test_delete_site_cascades() {
    let db = TestDatabase::new().await.unwrap();
    db.seed_monitor(&monitored("api", sites::SHOP, MonitorStatus::Up))
        .await
        .unwrap();
    db.seed_monitor(&monitored("web", sites::SHOP, MonitorStatus::Up))
        .await
        .unwrap();
    db.seed_monitor(&monitored("blog", sites::BLOG, MonitorStatus::Up))
        .await
        .unwrap();
    let database = db.database();

    let mut tx = database.begin().await.unwrap();
    for id in ["api", "blog"] {
        Database::insert_history(&mut tx, id, &CheckResult::up(1, "ok"), Utc::now())
            .await
            .unwrap();
    }
    tx.commit().await.unwrap();

    assert_eq!(database.delete_site(sites::SHOP).await.unwrap(), 2);
    assert!(database.get_site(sites::SHOP).await.unwrap().is_none());
    assert!(database.get_monitor("api").await.unwrap().is_none());
    assert_eq!(db.history_count("api").await, 0);
    assert_eq!(db.history_count("blog").await, 1);

    let err = database.delete_site(sites::SHOP).await.unwrap_err();
    assert!(matches!(err, MonitorError::SiteNotFound { .. }));
}

#[tokio::test]
async fn test_sync_definition_keeps_runtime_state() {
    let db = TestDatabase::new().await.unwrap();
    db.seed_monitor(&monitored("api", sites::SHOP, MonitorStatus::Down))
        .await
        .unwrap();
    let database = db.database();
    database.add_active_operation("api", "op-1").await.unwrap();

    let mut updated = http_monitor("api", sites::SHOP);
    updated.check_interval_ms = 30_000;
    updated.monitor_type = MonitorType::Port {
        host: "shop.example.com".to_string(),
        port: 443,
    };
    database.sync_monitor_definition(&updated).await.unwrap();

    let stored = db.monitor("api").await;
    assert_eq!(stored.check_interval_ms, 30_000);
    assert_eq!(stored.monitor_type.type_name(), "port");
    assert!(stored.is_monitoring);
    assert_eq!(stored.status, MonitorStatus::Down);
    assert_eq!(stored.active_operations, vec!["op-1"]);

    // New rows take the runtime columns as given
    database
        .sync_monitor_definition(&http_monitor("fresh", sites::SHOP))
        .await
        .unwrap();
    let fresh = db.monitor("fresh").await;
    assert!(!fresh.is_monitoring);
    assert_eq!(fresh.status, MonitorStatus::Pending);
}

#[tokio::test]
async fn test_file_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("monitor.db");
    let path = path.to_str().unwrap();

    {
        let database = Database::new(path).await.unwrap();
        database
            .upsert_site(&SiteRecord {
                id: sites::SHOP.to_string(),
                name: "Shop".to_string(),
            })
            .await
            .unwrap();
        database
            .insert_monitor(&monitored("api", sites::SHOP, MonitorStatus::Up))
            .await
            .unwrap();
        database.pool().close().await;
    }

    let reopened = Database::new(path).await.unwrap();
    let stored = reopened.get_monitor("api").await.unwrap().unwrap();
    assert!(stored.is_monitoring);
    assert_eq!(stored.status, MonitorStatus::Up);
    assert_eq!(
        reopened.get_site(sites::SHOP).await.unwrap().unwrap().name,
        "Shop"
    );
}
