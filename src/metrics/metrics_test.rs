use super::*;

fn create_test_registry() -> Registry {
    let registry = Registry::new_custom(Some("beacon_test".to_string()), None).unwrap();
    register_custom_metrics(&registry);
    registry
}

#[test]
fn test_custom_registry() {
    let registry = create_test_registry();

    WATCH_ERRORS.with_label_values(&["watch"]).inc();
    WATCH_NOTIFICATIONS.inc();

    let metrics = &registry.gather();
    let metric_names: Vec<_> = metrics.iter().map(|m| m.get_name()).collect();
    assert!(
        metric_names.contains(&"beacon_test_watch_errors"),
        "Missing beacon_test_watch_errors"
    );
    assert!(
        metric_names.contains(&"beacon_test_watch_notifications"),
        "Missing beacon_test_watch_notifications"
    );
}

#[test]
fn test_counter_increment() {
    let before = EVENTS_DROPPED.with_label_values(&["metrics_test"]).get();

    EVENTS_DROPPED.with_label_values(&["metrics_test"]).inc();
    EVENTS_DROPPED.with_label_values(&["metrics_test"]).inc();

    let value = EVENTS_DROPPED.with_label_values(&["metrics_test"]).get();
    assert_eq!(value - before, 2, "Counter should increment correctly");
}

#[test]
fn gather_metrics_should_render_text_format() {
    EVENTS_PUBLISHED.inc();

    let body = gather_metrics();
    assert!(body.contains("beacon_events_published"));
}

#[test]
fn events_dispatched_should_carry_no_labels() {
    let registry = create_test_registry();

    EVENTS_DISPATCHED.inc();

    let family = registry
        .gather()
        .into_iter()
        .find(|m| m.get_name() == "beacon_test_events_dispatched")
        .expect("events_dispatched is registered");
    assert_eq!(family.get_metric().len(), 1);
    assert!(family.get_metric()[0].get_label().is_empty());
}
