use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::ChangedListener;
use crate::constants::DEFAULT_ERROR_CHANNEL_CAPACITY;
use crate::constants::DEFAULT_WATCH_RETRY_BACKOFF;
use crate::metrics::WATCH_ERRORS;
use crate::metrics::WATCH_NOTIFICATIONS;
use crate::Error;
use crate::Result;
use crate::StoreClient;
use crate::WatchConfig;

/// How a snapshot of the watched keys is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Batch point read of exactly the watched keys
    #[default]
    Point,
    /// Every entry strictly below each watched key
    Subtree,
}

/// Builds and starts one watch registration.
///
/// ```ignore
/// let handle = WatchProcessor::new(["/system/base/rpc/client/1000"], store)
///     .retry_backoff(Duration::from_secs(2))
///     .start(listener)
///     .await?;
/// ```
pub struct WatchProcessor {
    keys: Vec<String>,
    store: Arc<dyn StoreClient>,
    read_mode: ReadMode,
    seed: bool,
    retry_backoff: Duration,
    error_channel_capacity: usize,
}

impl WatchProcessor {
    pub fn new<K>(
        keys: impl IntoIterator<Item = K>,
        store: Arc<dyn StoreClient>,
    ) -> Self
    where
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            store,
            read_mode: ReadMode::default(),
            seed: true,
            retry_backoff: DEFAULT_WATCH_RETRY_BACKOFF,
            error_channel_capacity: DEFAULT_ERROR_CHANNEL_CAPACITY,
        }
    }

    pub fn read_mode(
        mut self,
        read_mode: ReadMode,
    ) -> Self {
        self.read_mode = read_mode;
        self
    }

    /// Whether `start` hands the current values to the listener before
    /// watching (default: true)
    pub fn seed(
        mut self,
        seed: bool,
    ) -> Self {
        self.seed = seed;
        self
    }

    pub fn retry_backoff(
        mut self,
        retry_backoff: Duration,
    ) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn error_channel_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.error_channel_capacity = capacity.max(1);
        self
    }

    pub fn with_config(
        self,
        config: &WatchConfig,
    ) -> Self {
        self.retry_backoff(config.retry_backoff())
            .error_channel_capacity(config.error_channel_capacity)
    }

    /// Starts the registration.
    ///
    /// When seeding, the baseline cursor is taken first and the current
    /// values are handed to `listener` before this returns, so a caller
    /// always reads before it watches. Exactly one background task is
    /// spawned; it runs until the returned handle is cancelled or dropped.
    ///
    /// # Errors
    /// - [`Error::EmptyWatchKeys`] when no key was given
    ///
    /// Backend failures are never returned here: they are reported on the
    /// handle's error channel and retried by the loop.
    pub async fn start(
        self,
        listener: Arc<dyn ChangedListener>,
    ) -> Result<WatchHandle> {
        if self.keys.is_empty() {
            return Err(Error::EmptyWatchKeys);
        }

        let token = CancellationToken::new();
        let (error_tx, error_rx) = mpsc::channel(self.error_channel_capacity);

        let mut worker = WatchWorker {
            keys: self.keys.clone(),
            store: self.store,
            read_mode: self.read_mode,
            retry_backoff: self.retry_backoff,
            token: token.clone(),
            error_tx,
            listener,
            cursor: 0,
            resync: false,
        };

        if self.seed {
            worker.seed().await;
        }

        info!(keys = ?self.keys, "Watch registration started");
        let join = tokio::spawn(worker.run());

        Ok(WatchHandle {
            keys: self.keys,
            token,
            join: Some(join),
            errors: error_rx,
            cancel_on_drop: true,
        })
    }
}

/// State owned by the background task of one registration
struct WatchWorker {
    keys: Vec<String>,
    store: Arc<dyn StoreClient>,
    read_mode: ReadMode,
    retry_backoff: Duration,
    token: CancellationToken,
    error_tx: mpsc::Sender<Error>,
    listener: Arc<dyn ChangedListener>,

    // 0 = not initialized yet
    cursor: u64,
    // A snapshot is owed to the listener regardless of the cursor
    resync: bool,
}

impl WatchWorker {
    /// Baseline cursor, then one synchronous snapshot-and-notify pass
    async fn seed(&mut self) {
        match self.store.watch_prefix(&self.keys, 0, &self.token).await {
            Ok(cursor) => self.cursor = cursor,
            Err(e) => self.report("watch", e),
        }

        match self.snapshot().await {
            Ok(values) => self.notify(values),
            Err(e) => {
                // Restart from scratch so the first successful watch call re-reads
                self.report("snapshot", e);
                self.cursor = 0;
                self.resync = true;
            }
        }
    }

    async fn run(mut self) {
        loop {
            let result = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                result = self.store.watch_prefix(&self.keys, self.cursor, &self.token) => result,
            };

            let next = match result {
                Ok(next) => next,
                Err(e) => {
                    self.report("watch", e);
                    if !self.backoff().await {
                        break;
                    }
                    continue;
                }
            };

            if self.token.is_cancelled() {
                break;
            }

            trace!(keys = ?self.keys, cursor = self.cursor, next, "Watch returned");

            // Backend lost track of the keys; re-read once it hands out a cursor again
            if next == 0 {
                self.resync = true;
            }

            if next > 0 && (self.cursor > 0 || self.resync) {
                match self.snapshot().await {
                    Ok(values) => {
                        self.resync = false;
                        self.notify(values);
                    }
                    Err(e) => {
                        // Keep the old cursor: the next watch call returns at once and we read again
                        self.report("snapshot", e);
                        if !self.backoff().await {
                            break;
                        }
                        continue;
                    }
                }
            }
            self.cursor = next;
        }

        info!(keys = ?self.keys, "Watch registration stopped");
    }

    async fn snapshot(&self) -> Result<HashMap<String, String>> {
        match self.read_mode {
            ReadMode::Point => self.store.get_values(&self.keys).await,
            ReadMode::Subtree => {
                let mut values = HashMap::new();
                for key in &self.keys {
                    values.extend(self.store.get_subtree(key).await?);
                }
                Ok(values)
            }
        }
    }

    fn notify(
        &self,
        values: HashMap<String, String>,
    ) {
        debug!(keys = ?self.keys, entries = values.len(), "Notifying changed listener");
        WATCH_NOTIFICATIONS.inc();
        self.listener.changed(values);
    }

    /// Sleeps the retry backoff. Returns false when cancelled meanwhile.
    async fn backoff(&self) -> bool {
        tokio::select! {
            _ = self.token.cancelled() => false,
            _ = sleep(self.retry_backoff) => true,
        }
    }

    fn report(
        &self,
        stage: &'static str,
        error: Error,
    ) {
        warn!(keys = ?self.keys, stage, "Watch backend call failed, retrying: {}", error);
        WATCH_ERRORS.with_label_values(&[stage]).inc();
        if let Err(mpsc::error::TrySendError::Full(dropped)) = self.error_tx.try_send(error) {
            debug!("Watch error channel full, dropping: {}", dropped);
        }
    }
}

/// Handle of a running watch registration.
///
/// Dropping the handle cancels the registration; use [`WatchHandle::detach`]
/// to keep it running for the lifetime of the process.
pub struct WatchHandle {
    keys: Vec<String>,
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
    errors: mpsc::Receiver<Error>,
    cancel_on_drop: bool,
}

impl WatchHandle {
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Signals the loop to stop; it exits within one watch call or backoff
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the background task has exited
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map(|j| j.is_finished()).unwrap_or(true)
    }

    /// Backend errors observed by the loop, oldest first
    pub fn errors(&mut self) -> &mut mpsc::Receiver<Error> {
        &mut self.errors
    }

    /// Cancels the loop and waits for the task to exit
    pub async fn stop(mut self) {
        self.token.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                warn!(keys = ?self.keys, "Watch task ended abnormally: {:?}", e);
            }
        }
    }

    /// Lets the loop outlive this handle; the returned token still stops it
    pub fn detach(mut self) -> CancellationToken {
        self.cancel_on_drop = false;
        self.token.clone()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if self.cancel_on_drop {
            self.token.cancel();
        }
    }
}
