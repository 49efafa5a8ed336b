use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::constants::DEFAULT_ERROR_CHANNEL_CAPACITY;
use crate::constants::DEFAULT_WATCH_RETRY_BACKOFF;
use crate::Error;
use crate::Result;

/// Configuration for the watch loop that follows store changes
///
/// ```toml
/// [watch]
/// retry_backoff_ms = 2000
/// error_channel_capacity = 10
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatchConfig {
    /// Pause between retries after a failed watch or read call
    ///
    /// Failed calls are retried forever; this interval keeps a broken
    /// backend from being hammered.
    ///
    /// **Default**: 2000
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Capacity of the per-registration error side channel
    ///
    /// Errors beyond this capacity are dropped (they are still logged and
    /// counted).
    ///
    /// **Default**: 10
    #[serde(default = "default_error_channel_capacity")]
    pub error_channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            retry_backoff_ms: default_retry_backoff_ms(),
            error_channel_capacity: default_error_channel_capacity(),
        }
    }
}

impl WatchConfig {
    /// Validates watch configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.retry_backoff_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.retry_backoff_ms must be greater than 0".into(),
            )));
        }

        if self.retry_backoff_ms < 100 {
            warn!(
                "watch.retry_backoff_ms ({}) is very small and may overload a failing backend",
                self.retry_backoff_ms
            );
        }

        if self.error_channel_capacity == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watch.error_channel_capacity must be greater than 0".into(),
            )));
        }
        Ok(())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_WATCH_RETRY_BACKOFF.as_millis() as u64
}
fn default_error_channel_capacity() -> usize {
    DEFAULT_ERROR_CHANNEL_CAPACITY
}
