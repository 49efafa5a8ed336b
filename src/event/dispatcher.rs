use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;

use super::Event;
use super::ListenerTable;
use crate::metrics::EVENTS_DISPATCHED;
use crate::metrics::EVENTS_DROPPED;
use crate::utils::time::now_nanos;
use crate::ChangedListener;
use crate::EventConfig;
use crate::StaleEventPolicy;

/// Turns watch snapshots of the event root into listener callbacks.
///
/// Each stored value is decoded on its own: a malformed entry written by some
/// other system is dropped without affecting the rest of the batch. Events
/// are routed by their own key, not by the store path they were read from.
pub struct EventDispatcher {
    table: Arc<ListenerTable>,
    config: EventConfig,

    // store path -> pub_time of the event last dispatched from it
    dispatched: Mutex<HashMap<String, i64>>,
}

impl EventDispatcher {
    pub fn new(
        table: Arc<ListenerTable>,
        config: EventConfig,
    ) -> Self {
        Self {
            table,
            config,
            dispatched: Mutex::new(HashMap::new()),
        }
    }

    pub fn table(&self) -> &ListenerTable {
        &self.table
    }

    fn dispatch(
        &self,
        path: &str,
        raw: &str,
    ) {
        if raw.is_empty() {
            trace!(path, "Skipping empty event node");
            return;
        }

        let event = match Event::decode_at(path, raw.as_bytes()) {
            Ok(event) => event,
            Err(e) => {
                debug!("Dropping undecodable event: {}", e);
                EVENTS_DROPPED.with_label_values(&["malformed"]).inc();
                return;
            }
        };

        if self.config.suppress_redelivery {
            let mut dispatched = self.dispatched.lock();
            if dispatched.get(path) == Some(&event.pub_time()) {
                trace!(path, key = event.key(), "Event unchanged since last dispatch");
                return;
            }
            dispatched.insert(path.to_string(), event.pub_time());
        }

        if event.is_timed_out_at(now_nanos()) && self.config.stale_policy == StaleEventPolicy::Drop {
            debug!(
                key = event.key(),
                pub_time = event.pub_time(),
                timeout = event.timeout(),
                "Dropping timed out event"
            );
            EVENTS_DROPPED.with_label_values(&["stale"]).inc();
            return;
        }

        let listeners = self.table.listeners(event.key());
        if listeners.is_empty() {
            trace!(key = event.key(), "No listener for event");
            return;
        }

        debug!(key = event.key(), listeners = listeners.len(), "Dispatching event");
        for listener in listeners {
            listener.on_event(&event);
            EVENTS_DISPATCHED.inc();
        }
    }
}

impl ChangedListener for EventDispatcher {
    fn changed(
        &self,
        data: HashMap<String, String>,
    ) {
        if self.config.suppress_redelivery {
            // Forget event nodes that no longer exist
            self.dispatched.lock().retain(|path, _| data.contains_key(path));
        }

        let mut paths: Vec<&String> = data.keys().collect();
        paths.sort();
        for path in paths {
            self.dispatch(path, &data[path]);
        }
    }
}
