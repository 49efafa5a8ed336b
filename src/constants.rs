use std::time::Duration;

// -
// Store layout

/// Root path of namespaced configuration entries
pub const DEFAULT_CONFIG_ROOT: &str = "/system";

/// Root path under which events are published
pub const DEFAULT_EVENT_ROOT: &str = "/system_events";

pub(crate) const PATH_SEPARATOR: char = '/';

// -
// Events

/// 10s, in nanoseconds
pub const DEFAULT_EVENT_TIMEOUT_NS: i64 = 10_000_000_000;

/// Upper bound of a JSON-encoded event, in bytes
pub const MAX_EVENT_PAYLOAD_BYTES: usize = 1024;

// -
// Watch

/// Pause between retries when the backend fails a watch or read call
pub const DEFAULT_WATCH_RETRY_BACKOFF: Duration = Duration::from_secs(2);

pub const DEFAULT_ERROR_CHANNEL_CAPACITY: usize = 10;
