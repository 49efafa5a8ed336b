use std::sync::Arc;

use tracing::debug;
use tracing::info;

use super::Event;
use super::EventDispatcher;
use super::EventListener;
use super::ListenerTable;
use crate::constants::DEFAULT_EVENT_ROOT;
use crate::constants::MAX_EVENT_PAYLOAD_BYTES;
use crate::metrics::EVENTS_PUBLISHED;
use crate::utils::path::join_path;
use crate::BeaconConfig;
use crate::Error;
use crate::EventConfig;
use crate::EventError;
use crate::ReadMode;
use crate::Result;
use crate::StoreClient;
use crate::StoreError;
use crate::WatchConfig;
use crate::WatchHandle;
use crate::WatchProcessor;

/// Publish/subscribe over the store, keyed by event identity.
///
/// Publishing writes the encoded event to `{event_root}/{key}`. Listening
/// watches the whole event root and hands every event to the listeners
/// registered for its key.
pub struct EventEngine {
    store: Arc<dyn StoreClient>,
    event_root: String,
    event_config: EventConfig,
    watch_config: WatchConfig,
}

impl EventEngine {
    /// Engine with the default layout and policies
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            store,
            event_root: DEFAULT_EVENT_ROOT.to_string(),
            event_config: EventConfig::default(),
            watch_config: WatchConfig::default(),
        }
    }

    pub fn from_config(
        store: Arc<dyn StoreClient>,
        config: &BeaconConfig,
    ) -> Self {
        Self {
            store,
            event_root: config.namespace.event_root.clone(),
            event_config: config.event.clone(),
            watch_config: config.watch.clone(),
        }
    }

    pub fn event_root(&self) -> &str {
        &self.event_root
    }

    /// Store path an event with `key` is published to
    pub fn event_path(
        &self,
        key: &str,
    ) -> String {
        join_path([self.event_root.as_str(), key])
    }

    /// Publishes `event` once.
    ///
    /// Validation happens before anything is written:
    /// - [`EventError::NilEvent`] when no event is given
    /// - [`EventError::AlreadyPublished`] when this instance went out before
    /// - [`EventError::PayloadTooLarge`] when the stamped encoding exceeds
    ///   1024 bytes; `event` is left untouched
    ///
    /// The event is then stamped and written. A key that was
    /// published before by another instance is overwritten. Other store
    /// failures are returned unchanged.
    pub async fn publish<'a>(
        &self,
        event: impl Into<Option<&'a mut Event>>,
    ) -> Result<()> {
        let event = event.into().ok_or(EventError::NilEvent)?;

        if event.is_published() {
            return Err(EventError::AlreadyPublished(event.key().to_string()).into());
        }
        // Stamping grows the encoding, so the limit applies to the stamped copy
        let mut stamped = event.clone();
        stamped.mark_published();
        let payload = stamped.to_json()?;
        if payload.len() > MAX_EVENT_PAYLOAD_BYTES {
            return Err(EventError::PayloadTooLarge {
                key: event.key().to_string(),
                size: payload.len(),
                limit: MAX_EVENT_PAYLOAD_BYTES,
            }
            .into());
        }
        *event = stamped;
        let path = self.event_path(event.key());

        match self.store.add(&path, &payload).await {
            Ok(_) => {}
            Err(Error::Store(StoreError::NodeExists(_))) => {
                debug!(path = %path, "Event node exists, overwriting");
                self.store.modify(&path, &payload).await?;
            }
            Err(e) => return Err(e),
        }

        EVENTS_PUBLISHED.inc();
        debug!(key = event.key(), pub_time = event.pub_time(), path = %path, "Event published");
        Ok(())
    }

    /// Registers `listeners` and starts watching the event root.
    ///
    /// Listeners without event keys are skipped. Events already stored and
    /// still within their validity window are delivered before this returns.
    pub async fn start_listening(
        &self,
        listeners: Vec<Arc<dyn EventListener>>,
    ) -> Result<WatchHandle> {
        self.start_listening_with(Arc::new(ListenerTable::build(listeners))).await
    }

    pub async fn start_listening_with(
        &self,
        table: Arc<ListenerTable>,
    ) -> Result<WatchHandle> {
        info!(event_root = %self.event_root, event_keys = table.len(), "Starting event listener");
        let dispatcher = Arc::new(EventDispatcher::new(table, self.event_config.clone()));

        WatchProcessor::new([self.event_root.clone()], self.store.clone())
            .read_mode(ReadMode::Subtree)
            .with_config(&self.watch_config)
            .start(dispatcher)
            .await
    }
}
