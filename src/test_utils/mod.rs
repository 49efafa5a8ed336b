//! Shared helpers for unit tests
//!
//! Unit tests capture logs with `#[traced_test]`, which owns the global
//! subscriber; nothing here installs one.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::ChangedListener;
use crate::Event;
use crate::EventListener;

/// Forwards every snapshot into a channel the test can await
pub(crate) struct ChannelListener {
    tx: mpsc::UnboundedSender<HashMap<String, String>>,
}

impl ChannelListener {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<HashMap<String, String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl ChangedListener for ChannelListener {
    fn changed(
        &self,
        data: HashMap<String, String>,
    ) {
        let _ = self.tx.send(data);
    }
}

/// Event listener that reports `(listener name, event)` pairs into a channel
pub(crate) struct NamedEventListener {
    name: &'static str,
    keys: Vec<String>,
    tx: mpsc::UnboundedSender<(&'static str, Event)>,
}

impl NamedEventListener {
    pub(crate) fn new(
        name: &'static str,
        keys: &[&str],
        tx: mpsc::UnboundedSender<(&'static str, Event)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            keys: keys.iter().map(|k| k.to_string()).collect(),
            tx,
        })
    }
}

impl EventListener for NamedEventListener {
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

/// Receives the next message or panics after `wait`
pub(crate) async fn recv_within<T>(
    rx: &mut mpsc::UnboundedReceiver<T>,
    wait: Duration,
) -> T {
    timeout(wait, rx.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("channel closed")
}

/// Asserts nothing arrives during `wait`
pub(crate) async fn assert_silent<T: std::fmt::Debug>(
    rx: &mut mpsc::UnboundedReceiver<T>,
    wait: Duration,
) {
    if let Ok(Some(msg)) = timeout(wait, rx.recv()).await {
        panic!("unexpected notification: {:?}", msg);
    }
}
