//! Error hierarchy for the configuration and event notification engine.
//!
//! Errors are grouped by the layer that produces them:
//! - [`EventError`]: event construction, publication and decoding
//! - [`StoreError`]: failures reported by the backend store
//! - configuration loading failures from the `config` crate

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Event validation and encoding failures
    #[error(transparent)]
    Event(#[from] EventError),

    /// Backend store failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Settings loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A configuration value could not be decoded into the requested type
    #[error("Failed to decode value at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A watch registration needs at least one key
    #[error("Watch registration requires at least one key")]
    EmptyWatchKeys,
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Key is empty or does not match `[a-z][a-z0-9-]*`
    #[error("Invalid event key: {0:?}")]
    InvalidKey(String),

    #[error("Event to publish must not be empty")]
    NilEvent,

    /// The same event instance was already published once
    #[error("Event {0} was already published")]
    AlreadyPublished(String),

    #[error("Event {key} payload is {size} bytes, limit is {limit}")]
    PayloadTooLarge {
        key: String,
        size: usize,
        limit: usize,
    },

    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value is not a valid event document
    #[error("Malformed event at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transient backend failure; watch loops retry these forever
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Node already exists: {0}")]
    NodeExists(String),

    #[error("Node does not exist: {0}")]
    NoNode(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Returns true for failures a caller may retry later
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Store(StoreError::Unavailable(_)))
    }
}
