use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::trace;

use super::StoreClient;
use crate::utils::path::is_at_or_below;
use crate::utils::path::is_below;
use crate::Result;
use crate::StoreError;

/// Revision of an empty store
const INITIAL_REVISION: u64 = 1;

/// Deleted paths whose stamps are retained before the oldest is compacted
pub const DEFAULT_TOMBSTONE_LIMIT: usize = 1024;

/// In-memory, revisioned implementation of [`StoreClient`].
///
/// Every mutation bumps a store-wide revision and stamps the touched path with
/// it; watchers compare those stamps against their cursor. Stamps of deleted
/// paths are kept as tombstones so deletions wake watchers too. Only the most
/// recent [`DEFAULT_TOMBSTONE_LIMIT`] tombstones are retained; a watcher whose
/// cursor predates a compacted one is woken at the current revision and
/// re-reads its keys.
#[derive(Debug)]
pub struct MemStore {
    inner: RwLock<MemStoreInner>,
    tombstone_limit: usize,

    // Broadcasts the latest revision to blocked watchers
    revision_tx: watch::Sender<u64>,

    // Outage simulation
    available: AtomicBool,
}

#[derive(Debug, Default)]
struct MemStoreInner {
    nodes: BTreeMap<String, Vec<u8>>,
    // path -> revision of its last add/modify/delete
    stamps: HashMap<String, u64>,
    // (revision, path) of deletions, oldest first
    tombstones: VecDeque<(u64, String)>,
    // Highest revision whose tombstone was dropped
    compacted: u64,
    revision: u64,
}

impl MemStoreInner {
    fn compact(
        &mut self,
        limit: usize,
    ) {
        while self.tombstones.len() > limit {
            let Some((revision, path)) = self.tombstones.pop_front() else {
                break;
            };
            // A re-created path carries a newer stamp and stays tracked
            if self.stamps.get(&path) == Some(&revision) {
                self.stamps.remove(&path);
            }
            self.compacted = self.compacted.max(revision);
            trace!(path = %path, revision, "MemStore tombstone compacted");
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        let (revision_tx, _) = watch::channel(INITIAL_REVISION);
        Self {
            inner: RwLock::new(MemStoreInner {
                revision: INITIAL_REVISION,
                ..Default::default()
            }),
            tombstone_limit: DEFAULT_TOMBSTONE_LIMIT,
            revision_tx,
            available: AtomicBool::new(true),
        }
    }

    /// Caps how many deleted paths keep their stamps
    pub fn tombstone_limit(
        mut self,
        limit: usize,
    ) -> Self {
        self.tombstone_limit = limit;
        self
    }

    /// Builds a store pre-populated with `entries`, all at the initial revision
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            for (k, v) in entries {
                let path = k.into();
                inner.stamps.insert(path.clone(), INITIAL_REVISION);
                inner.nodes.insert(path, v.into().into_bytes());
            }
        }
        store
    }

    /// Latest revision of the store
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    pub fn len(&self) -> usize {
        self.inner.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of paths carrying a change stamp, live or deleted
    pub fn tracked_paths(&self) -> usize {
        self.inner.read().stamps.len()
    }

    /// Switches outage mode. While unavailable every call fails with
    /// [`StoreError::Unavailable`], including watches already blocked.
    pub fn set_available(
        &self,
        available: bool,
    ) {
        self.available.store(available, Ordering::SeqCst);
        debug!(available, "MemStore availability changed");
        // Wake blocked watchers so they observe the new state
        self.revision_tx.send_modify(|_| {});
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_string()).into())
        }
    }

    /// Applies one mutation under the write lock and publishes the new revision
    fn mutate<T>(
        &self,
        path: &str,
        op: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> Result<T>,
    ) -> Result<T> {
        self.check_available()?;
        let (out, revision) = {
            let mut inner = self.inner.write();
            let out = op(&mut inner.nodes)?;
            inner.revision += 1;
            let revision = inner.revision;
            inner.stamps.insert(path.to_string(), revision);
            if !inner.nodes.contains_key(path) {
                inner.tombstones.push_back((revision, path.to_string()));
                inner.compact(self.tombstone_limit);
            }
            trace!(path, revision, "MemStore mutation applied");
            (out, revision)
        };
        self.revision_tx.send_replace(revision);
        Ok(out)
    }

    /// Highest stamp `> cursor` at or below any of `keys`.
    ///
    /// A cursor older than the compaction point may have missed a deletion
    /// whose stamp is gone, so it is answered with the current revision.
    fn latest_change(
        &self,
        keys: &[String],
        cursor: u64,
    ) -> Option<u64> {
        let inner = self.inner.read();
        if cursor < inner.compacted {
            return Some(inner.revision);
        }
        inner
            .stamps
            .iter()
            .filter(|(path, stamp)| **stamp > cursor && keys.iter().any(|k| is_at_or_below(path, k)))
            .map(|(_, stamp)| *stamp)
            .max()
    }
}

#[async_trait]
impl StoreClient for MemStore {
    async fn get_values(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, String>> {
        self.check_available()?;
        let inner = self.inner.read();
        Ok(keys
            .iter()
            .map(|k| {
                let value = inner
                    .nodes
                    .get(k)
                    .map(|v| String::from_utf8_lossy(v).into_owned())
                    .unwrap_or_default();
                (k.clone(), value)
            })
            .collect())
    }

    async fn get_subtree(
        &self,
        prefix: &str,
    ) -> Result<HashMap<String, String>> {
        self.check_available()?;
        let inner = self.inner.read();
        Ok(inner
            .nodes
            .iter()
            .filter(|(path, _)| is_below(path, prefix))
            .map(|(path, v)| (path.clone(), String::from_utf8_lossy(v).into_owned()))
            .collect())
    }

    async fn watch_prefix(
        &self,
        keys: &[String],
        cursor: u64,
        stop: &CancellationToken,
    ) -> Result<u64> {
        self.check_available()?;

        // Something > 0 makes the caller read the keys right away
        if cursor == 0 {
            return Ok(self.revision().max(INITIAL_REVISION));
        }

        // Subscribe before checking so a concurrent mutation can not slip between
        let mut revision_rx = self.revision_tx.subscribe();
        loop {
            if let Some(revision) = self.latest_change(keys, cursor) {
                return Ok(revision);
            }

            tokio::select! {
                _ = stop.cancelled() => {
                    trace!(?keys, cursor, "MemStore watch cancelled");
                    return Ok(cursor);
                }
                changed = revision_rx.changed() => {
                    if changed.is_err() {
                        return Err(StoreError::Backend("revision channel closed".to_string()).into());
                    }
                    self.check_available()?;
                }
            }
        }
    }

    async fn add(
        &self,
        path: &str,
        value: &[u8],
    ) -> Result<String> {
        self.mutate(path, |nodes| {
            if nodes.contains_key(path) {
                return Err(StoreError::NodeExists(path.to_string()).into());
            }
            nodes.insert(path.to_string(), value.to_vec());
            Ok(path.to_string())
        })
    }

    async fn modify(
        &self,
        path: &str,
        value: &[u8],
    ) -> Result<()> {
        self.mutate(path, |nodes| match nodes.get_mut(path) {
            Some(current) => {
                *current = value.to_vec();
                Ok(())
            }
            None => Err(StoreError::NoNode(path.to_string()).into()),
        })
    }

    async fn delete(
        &self,
        path: &str,
    ) -> Result<()> {
        self.mutate(path, |nodes| match nodes.remove(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::NoNode(path.to_string()).into()),
        })
    }
}
