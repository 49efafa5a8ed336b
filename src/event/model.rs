use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::constants::DEFAULT_EVENT_TIMEOUT_NS;
use crate::constants::MAX_EVENT_PAYLOAD_BYTES;
use crate::utils::time::now_nanos;
use crate::EventError;
use crate::Result;

lazy_static! {
    static ref EVENT_KEY: Regex = Regex::new(r"^[a-z][a-z0-9-]*$").expect("valid event key pattern");
}

/// A cross-process notification.
///
/// The key identifies the event across the whole ecosystem, not just inside
/// one process. Each event carries a small JSON body (at most
/// [`MAX_EVENT_PAYLOAD_BYTES`] once encoded) and a validity window: receivers
/// compare their own clock against `pub_time + timeout`.
///
/// Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    key: String,
    /// Epoch nanoseconds, set when published
    #[serde(default)]
    pub_time: i64,
    /// Nanoseconds
    #[serde(default = "default_timeout")]
    timeout: i64,
    #[serde(default)]
    body: BTreeMap<String, Value>,
    #[serde(default)]
    published: bool,
}

fn default_timeout() -> i64 {
    DEFAULT_EVENT_TIMEOUT_NS
}

impl Event {
    /// Creates an event with the default 10s validity window
    pub fn new(key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(key, DEFAULT_EVENT_TIMEOUT_NS)
    }

    /// # Errors
    /// [`EventError::InvalidKey`] unless `key` matches `^[a-z][a-z0-9-]*$`
    pub fn with_timeout(
        key: impl Into<String>,
        timeout_ns: i64,
    ) -> Result<Self> {
        let key = key.into();
        if !is_valid_key(&key) {
            return Err(EventError::InvalidKey(key).into());
        }
        Ok(Self {
            key,
            pub_time: 0,
            timeout: timeout_ns,
            body: BTreeMap::new(),
            published: false,
        })
    }

    /// Inserts or overwrites one body entry.
    ///
    /// ```ignore
    /// event.add_data("name", "zhou")?.add_data("age", 18)?;
    /// ```
    pub fn add_data<V: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: V,
    ) -> Result<&mut Self> {
        let value = serde_json::to_value(value).map_err(EventError::Serialization)?;
        self.body.insert(key.into(), value);
        Ok(self)
    }

    pub fn get_data(
        &self,
        key: &str,
    ) -> Option<&Value> {
        self.body.get(key)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn pub_time(&self) -> i64 {
        self.pub_time
    }

    pub fn timeout(&self) -> i64 {
        self.timeout
    }

    pub fn body(&self) -> &BTreeMap<String, Value> {
        &self.body
    }

    /// Stamps the publish time with the local clock and flags the event as
    /// published. Callers check [`Event::is_published`] first.
    pub fn mark_published(&mut self) -> &mut Self {
        self.pub_time = now_nanos();
        self.published = true;
        self
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    /// Evaluated on the local clock; only meaningful once published
    pub fn is_timed_out(&self) -> bool {
        self.is_timed_out_at(now_nanos())
    }

    pub fn is_timed_out_at(
        &self,
        now_ns: i64,
    ) -> bool {
        now_ns.saturating_sub(self.pub_time) > self.timeout
    }

    /// Size of the JSON encoding in bytes
    pub fn encoded_len(&self) -> Result<usize> {
        Ok(self.to_json()?.len())
    }

    /// True when the JSON encoding exceeds [`MAX_EVENT_PAYLOAD_BYTES`].
    ///
    /// An event that cannot be encoded can never be published, so it counts
    /// as overloaded.
    pub fn is_overloaded(&self) -> bool {
        self.encoded_len()
            .map(|len| len > MAX_EVENT_PAYLOAD_BYTES)
            .unwrap_or(true)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| EventError::Serialization(e).into())
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::decode_at("", bytes)
    }

    /// Decodes the value stored at `path`
    pub(crate) fn decode_at(
        path: &str,
        bytes: &[u8],
    ) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| {
            EventError::Malformed {
                path: path.to_string(),
                source,
            }
            .into()
        })
    }
}

pub fn is_valid_key(key: &str) -> bool {
    EVENT_KEY.is_match(key)
}
