//! Prometheus counters for the watch loop and the event engine.
//!
//! Watch-loop failures never reach the caller synchronously; these counters
//! (together with tracing and the per-handle error channel) are how they are
//! observed.

use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;

#[cfg(test)]
mod metrics_test;

lazy_static! {
    pub static ref WATCH_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_errors", "Failed watch or snapshot calls, retried with backoff"),
        &["stage"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_NOTIFICATIONS: IntCounter = IntCounter::new(
        "watch_notifications",
        "Snapshots handed to changed listeners"
    )
    .expect("metric can not be created");

    pub static ref EVENTS_PUBLISHED: IntCounter =
        IntCounter::new("events_published", "Events written to the store")
            .expect("metric can not be created");

    // Event keys are caller-chosen, so they are not used as labels
    pub static ref EVENTS_DISPATCHED: IntCounter =
        IntCounter::new("events_dispatched", "Listener invocations").expect("metric can not be created");

    pub static ref EVENTS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("events_dropped", "Events skipped during dispatch"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new_custom(Some("beacon".to_string()), None)
            .expect("registry can be created");
        register_custom_metrics(&registry);
        registry
    };
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(WATCH_ERRORS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WATCH_NOTIFICATIONS.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(EVENTS_PUBLISHED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(EVENTS_DISPATCHED.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(EVENTS_DROPPED.clone()))
        .expect("collector can be registered");
}

/// Render all beacon metrics in the prometheus text exposition format
pub fn gather_metrics() -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode beacon metrics: {}", e);
        return String::default();
    }
    String::from_utf8(buffer).unwrap_or_else(|e| {
        error!("beacon metrics could not be from_utf8'd: {}", e);
        String::default()
    })
}
