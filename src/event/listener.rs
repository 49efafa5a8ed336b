use std::collections::HashMap;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use super::Event;

/// Receives events published by any process sharing the store.
#[cfg_attr(test, automock)]
pub trait EventListener: Send + Sync + 'static {
    /// Event keys this listener subscribes to.
    ///
    /// Read once when the listener table is built. A listener returning no
    /// keys is never registered.
    fn event_keys(&self) -> Vec<String>;

    /// Runs on the watch task; keep it short
    fn on_event(
        &self,
        event: &Event,
    );
}

/// Event key -> listeners, in registration order.
///
/// Built once before watching starts and never mutated afterwards.
#[derive(Default)]
pub struct ListenerTable {
    buckets: HashMap<String, Vec<Arc<dyn EventListener>>>,
}

impl ListenerTable {
    pub fn build<I>(listeners: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn EventListener>>,
    {
        let mut buckets: HashMap<String, Vec<Arc<dyn EventListener>>> = HashMap::new();
        for listener in listeners {
            let keys = listener.event_keys();
            if keys.is_empty() {
                debug!("Skipping event listener without keys");
                continue;
            }
            for key in keys {
                if key.is_empty() {
                    continue;
                }
                buckets.entry(key).or_default().push(listener.clone());
            }
        }
        Self { buckets }
    }

    /// Listeners registered for `key`, empty when none
    pub fn listeners(
        &self,
        key: &str,
    ) -> &[Arc<dyn EventListener>] {
        self.buckets.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn event_keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl std::fmt::Debug for ListenerTable {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (key, listeners) in &self.buckets {
            map.entry(key, &listeners.len());
        }
        map.finish()
    }
}
