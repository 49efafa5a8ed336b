use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use d_beacon::BeaconConfig;
use d_beacon::ChangedListener;
use d_beacon::Event;
use d_beacon::EventListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(2);

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
}

/// Settings with a short retry backoff so outage tests stay fast
pub fn fast_retry_config() -> BeaconConfig {
    let mut config = BeaconConfig::default();
    config.watch.retry_backoff_ms = 20;
    config
}

pub struct SnapshotRecorder {
    tx: mpsc::UnboundedSender<HashMap<String, String>>,
}

impl SnapshotRecorder {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<HashMap<String, String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl ChangedListener for SnapshotRecorder {
    fn changed(
        &self,
        data: HashMap<String, String>,
    ) {
        let _ = self.tx.send(data);
    }
}

pub struct EventRecorder {
    name: &'static str,
    keys: Vec<String>,
    tx: mpsc::UnboundedSender<(&'static str, Event)>,
}

impl EventRecorder {
    pub fn new(
        name: &'static str,
        keys: &[&str],
        tx: mpsc::UnboundedSender<(&'static str, Event)>,
    ) -> Arc<dyn EventListener> {
        Arc::new(Self {
            name,
            keys: keys.iter().map(|k| k.to_string()).collect(),
            tx,
        })
    }
}

impl EventListener for EventRecorder {
    fn event_keys(&self) -> Vec<String> {
        self.keys.clone()
    }

    fn on_event(
        &self,
        event: &Event,
    ) {
        let _ = self.tx.send((self.name, event.clone()));
    }
}

pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("channel closed")
}

pub async fn expect_nothing<T: std::fmt::Debug>(rx: &mut mpsc::UnboundedReceiver<T>) {
    if let Ok(Some(msg)) = timeout(Duration::from_millis(100), rx.recv()).await {
        panic!("unexpected notification: {:?}", msg);
    }
}
