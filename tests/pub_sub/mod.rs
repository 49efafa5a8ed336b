//! Two engines sharing one store stand in for two processes of the ecosystem.

use std::sync::Arc;

use d_beacon::Event;
use d_beacon::EventEngine;
use d_beacon::EventListener;
use d_beacon::MemStore;
use d_beacon::StoreClient;
use serde_json::json;
use tokio::sync::mpsc;

use crate::common::enable_logger;
use crate::common::expect_nothing;
use crate::common::next;
use crate::common::EventRecorder;

#[tokio::test]
async fn event_published_by_one_process_reaches_listeners_of_another() {
    enable_logger();
    let store = Arc::new(MemStore::new());
    let publisher = EventEngine::new(store.clone());
    let subscriber = EventEngine::new(store);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let listeners: Vec<Arc<dyn EventListener>> = vec![
        EventRecorder::new("l1", &["alpha"], tx.clone()),
        EventRecorder::new("l2", &["alpha"], tx.clone()),
        EventRecorder::new("l3", &["beta"], tx),
    ];
    let handle = subscriber.start_listening(listeners).await.unwrap();

    let mut event = Event::with_timeout("alpha", 10_000_000_000).unwrap();
    event.add_data("name", "zhou").unwrap().add_data("uid", 7).unwrap();
    publisher.publish(&mut event).await.unwrap();

    let (name, received) = next(&mut rx).await;
    assert_eq!(name, "l1");
    assert_eq!(received.get_data("name"), Some(&json!("zhou")));
    assert_eq!(received.get_data("uid"), Some(&json!(7)));
    assert_eq!(received.pub_time(), event.pub_time());
    assert_eq!(next(&mut rx).await.0, "l2");
    expect_nothing(&mut rx).await;

    handle.stop().await;
}

#[tokio::test]
async fn every_event_is_delivered_once_across_later_publishes() {
    let store = Arc::new(MemStore::new());
    let engine = EventEngine::new(store);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let listeners = vec![EventRecorder::new("all", &["alpha", "beta", "gamma"], tx)];
    let handle = engine.start_listening(listeners).await.unwrap();

    for key in ["alpha", "beta", "gamma"] {
        engine.publish(&mut Event::new(key).unwrap()).await.unwrap();
        assert_eq!(next(&mut rx).await.1.key(), key);
    }
    expect_nothing(&mut rx).await;

    // A new instance under an existing key overwrites the node and is delivered again
    engine.publish(&mut Event::new("alpha").unwrap()).await.unwrap();
    assert_eq!(next(&mut rx).await.1.key(), "alpha");
    expect_nothing(&mut rx).await;

    handle.stop().await;
}

#[tokio::test]
async fn malformed_node_written_by_another_system_is_ignored() {
    let store = Arc::new(MemStore::new());
    let engine = EventEngine::new(store.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = engine
        .start_listening(vec![EventRecorder::new("l1", &["alpha"], tx)])
        .await
        .unwrap();

    store.add("/system_events/legacy", b"<xml/>").await.unwrap();
    expect_nothing(&mut rx).await;

    engine.publish(&mut Event::new("alpha").unwrap()).await.unwrap();
    assert_eq!(next(&mut rx).await.1.key(), "alpha");

    handle.stop().await;
}

#[tokio::test]
async fn stale_events_stored_before_listening_are_not_delivered() {
    let store = Arc::new(MemStore::new());
    store
        .add(
            "/system_events/alpha",
            br#"{"key":"alpha","pub_time":1,"timeout":10,"body":{},"published":true}"#,
        )
        .await
        .unwrap();
    let engine = EventEngine::new(store);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = engine
        .start_listening(vec![EventRecorder::new("l1", &["alpha"], tx)])
        .await
        .unwrap();

    expect_nothing(&mut rx).await;
    handle.stop().await;
}

#[tokio::test]
async fn stopped_listener_receives_nothing_more() {
    let store = Arc::new(MemStore::new());
    let engine = EventEngine::new(store);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = engine
        .start_listening(vec![EventRecorder::new("l1", &["alpha"], tx)])
        .await
        .unwrap();

    handle.stop().await;
    engine.publish(&mut Event::new("alpha").unwrap()).await.unwrap();

    expect_nothing(&mut rx).await;
}
