use std::sync::Arc;

use d_beacon::ConfigCenter;
use d_beacon::Error;
use d_beacon::MemStore;
use d_beacon::StoreClient;
use d_beacon::StoreError;
use serde::Deserialize;

use crate::common::enable_logger;
use crate::common::expect_nothing;
use crate::common::fast_retry_config;
use crate::common::next;
use crate::common::SnapshotRecorder;

#[derive(Debug, Deserialize, PartialEq)]
struct ServerConfig {
    addr: String,
}

#[tokio::test]
async fn typed_read_then_watch_follows_updates() {
    enable_logger();
    let store = Arc::new(MemStore::with_entries([(
        "/system/test/game/server",
        r#"{"addr":":8080"}"#,
    )]));
    let center = ConfigCenter::from_config(store.clone(), &fast_retry_config());

    let server: ServerConfig = center.typed("test", "game", "", "server").await.unwrap();
    assert_eq!(server.addr, ":8080");

    let (listener, mut rx) = SnapshotRecorder::new();
    let handle = center.watch("test", "game", "", &["server"], listener).await.unwrap();
    assert_eq!(next(&mut rx).await["/system/test/game/server"], r#"{"addr":":8080"}"#);

    store
        .modify("/system/test/game/server", br#"{"addr":":9090"}"#)
        .await
        .unwrap();
    let snapshot = next(&mut rx).await;
    let updated: ServerConfig = serde_json::from_str(&snapshot["/system/test/game/server"]).unwrap();
    assert_eq!(updated.addr, ":9090");

    handle.stop().await;
}

#[tokio::test]
async fn watch_recovers_after_backend_outage() {
    let store = Arc::new(MemStore::with_entries([("/system/app/db/url", "postgres://a")]));
    let center = ConfigCenter::from_config(store.clone(), &fast_retry_config());
    let (listener, mut rx) = SnapshotRecorder::new();

    let mut handle = center.watch("app", "db", "", &["url"], listener).await.unwrap();
    next(&mut rx).await;

    store.set_available(false);
    let error = tokio::time::timeout(crate::common::WAIT, handle.errors().recv())
        .await
        .expect("outage should be reported")
        .expect("error channel open");
    assert!(matches!(error, Error::Store(StoreError::Unavailable(_))));
    assert!(error.is_retryable());
    expect_nothing(&mut rx).await;

    store.set_available(true);
    store.modify("/system/app/db/url", b"postgres://b").await.unwrap();
    assert_eq!(next(&mut rx).await["/system/app/db/url"], "postgres://b");
    assert!(!handle.is_finished());

    handle.stop().await;
}

#[tokio::test]
async fn watched_entry_deleted_then_recreated() {
    let store = Arc::new(MemStore::with_entries([("/system/app/cache/ttl", "30")]));
    let center = ConfigCenter::new(store.clone());
    let (listener, mut rx) = SnapshotRecorder::new();
    let handle = center.watch("app", "cache", "", &["ttl"], listener).await.unwrap();
    next(&mut rx).await;

    store.delete("/system/app/cache/ttl").await.unwrap();
    assert_eq!(next(&mut rx).await["/system/app/cache/ttl"], "");

    center.add("/system/app/cache/ttl", b"60").await.unwrap();
    assert_eq!(next(&mut rx).await["/system/app/cache/ttl"], "60");

    handle.stop().await;
}
