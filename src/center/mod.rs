//! Namespaced configuration reads.
//!
//! Every process of the ecosystem keeps its mutable settings under
//! `{config_root}/{application}/{group}[/{tag}]/{leaf}`. [`ConfigCenter`]
//! resolves those paths, reads raw or typed values and registers watches
//! that re-deliver the values whenever they change.


use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;
use tracing::error;

use crate::constants::DEFAULT_CONFIG_ROOT;
use crate::utils::path::join_path;
use crate::BeaconConfig;
use crate::ChangedListener;
use crate::Error;
use crate::Result;
use crate::StoreClient;
use crate::WatchConfig;
use crate::WatchHandle;
use crate::WatchProcessor;

pub struct ConfigCenter {
    store: Arc<dyn StoreClient>,
    config_root: String,
    watch_config: WatchConfig,
}

impl ConfigCenter {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            store,
            config_root: DEFAULT_CONFIG_ROOT.to_string(),
            watch_config: WatchConfig::default(),
        }
    }

    pub fn from_config(
        store: Arc<dyn StoreClient>,
        config: &BeaconConfig,
    ) -> Self {
        Self {
            store,
            config_root: config.namespace.config_root.clone(),
            watch_config: config.watch.clone(),
        }
    }

    pub fn config_root(&self) -> &str {
        &self.config_root
    }

    /// `{root}/{app}/{group}/{leaf}`, or `{root}/{app}/{group}/{tag}/{leaf}`
    /// when `tag` is not empty
    pub fn path(
        &self,
        app: &str,
        group: &str,
        tag: &str,
        leaf: &str,
    ) -> String {
        join_path([self.config_root.as_str(), app, group, tag, leaf])
    }

    fn paths(
        &self,
        app: &str,
        group: &str,
        tag: &str,
        leaves: &[&str],
    ) -> Vec<String> {
        leaves.iter().map(|leaf| self.path(app, group, tag, leaf)).collect()
    }

    /// Raw values keyed by full path; missing entries read as empty strings
    pub async fn values(
        &self,
        app: &str,
        group: &str,
        tag: &str,
        leaves: &[&str],
    ) -> Result<HashMap<String, String>> {
        let paths = self.paths(app, group, tag, leaves);
        self.read(&paths).await
    }

    pub async fn string(
        &self,
        app: &str,
        group: &str,
        tag: &str,
        leaf: &str,
    ) -> Result<String> {
        let path = self.path(app, group, tag, leaf);
        let mut values = self.read(std::slice::from_ref(&path)).await?;
        Ok(values.remove(&path).unwrap_or_default())
    }

    /// Decodes the JSON value of one entry into `T`.
    ///
    /// # Errors
    /// [`Error::Decode`] when the entry is missing or does not fit `T`
    pub async fn typed<T: DeserializeOwned>(
        &self,
        app: &str,
        group: &str,
        tag: &str,
        leaf: &str,
    ) -> Result<T> {
        let path = self.path(app, group, tag, leaf);
        let raw = self.string(app, group, tag, leaf).await?;
        serde_json::from_str(&raw).map_err(|source| Error::Decode { path, source })
    }

    /// Hands the current values of `leaves` to `listener`, then calls it
    /// again with fresh values whenever any of them changes.
    ///
    /// The first call happens before this returns.
    pub async fn watch(
        &self,
        app: &str,
        group: &str,
        tag: &str,
        leaves: &[&str],
        listener: Arc<dyn ChangedListener>,
    ) -> Result<WatchHandle> {
        let paths = self.paths(app, group, tag, leaves);
        WatchProcessor::new(paths, self.store.clone())
            .with_config(&self.watch_config)
            .start(listener)
            .await
    }

    /// Creates an entry at an absolute store path
    pub async fn add(
        &self,
        path: &str,
        value: &[u8],
    ) -> Result<String> {
        self.store.add(path, value).await
    }

    async fn read(
        &self,
        paths: &[String],
    ) -> Result<HashMap<String, String>> {
        match self.store.get_values(paths).await {
            Ok(values) => {
                debug!(?paths, "Read configuration values");
                Ok(values)
            }
            Err(e) => {
                error!(?paths, "Failed to read configuration values: {}", e);
                Err(e)
            }
        }
    }
}
