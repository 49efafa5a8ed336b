//! Backend store contract
//!
//! The engine never talks to a concrete backend. Everything it needs from the
//! hierarchical key/value store is captured by [`StoreClient`]:
//! - batch point reads and subtree reads
//! - create / modify / delete of single entries
//! - a blocking watch primitive driven by a monotonically increasing cursor
//!
//! [`MemStore`] is a complete in-process implementation.

mod mem_store;
pub use mem_store::*;


use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio_util::sync::CancellationToken;

use crate::Result;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    /// Batch point read.
    ///
    /// Every requested key is present in the result; keys missing from the
    /// store map to an empty string.
    async fn get_values(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, String>>;

    /// Reads every entry strictly below `prefix`
    async fn get_subtree(
        &self,
        prefix: &str,
    ) -> Result<HashMap<String, String>>;

    /// Blocks until something at or below one of `keys` changes after
    /// `cursor`, `stop` is cancelled, or the backend fails.
    ///
    /// # Returns
    /// - a cursor `> 0` immediately when `cursor == 0`
    /// - the cursor of the observed change
    /// - `cursor` unchanged when `stop` fired
    async fn watch_prefix(
        &self,
        keys: &[String],
        cursor: u64,
        stop: &CancellationToken,
    ) -> Result<u64>;

    /// Creates a new entry, failing with `NodeExists` when the path is taken.
    ///
    /// Returns the path actually created.
    async fn add(
        &self,
        path: &str,
        value: &[u8],
    ) -> Result<String>;

    /// Replaces the value of an existing entry (`NoNode` when absent)
    async fn modify(
        &self,
        path: &str,
        value: &[u8],
    ) -> Result<()>;

    /// Removes an existing entry (`NoNode` when absent)
    async fn delete(
        &self,
        path: &str,
    ) -> Result<()>;
}
