use serde::Deserialize;
use serde::Serialize;

/// What the dispatcher does with events whose validity window has passed
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StaleEventPolicy {
    /// Skip listeners for timed out events
    #[default]
    Drop,
    /// Hand timed out events to listeners anyway; listeners may check
    /// [`Event::is_timed_out`](crate::Event::is_timed_out) themselves
    Deliver,
}

/// Event dispatch configuration
///
/// ```toml
/// [event]
/// stale_policy = "drop"
/// suppress_redelivery = true
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EventConfig {
    /// **Default**: drop
    #[serde(default)]
    pub stale_policy: StaleEventPolicy,

    /// Skip events whose publish time did not change since they were last
    /// dispatched from the same store path.
    ///
    /// Every change under the event root re-reads all stored events, so
    /// without this each new event would replay the ones before it.
    ///
    /// **Default**: true
    #[serde(default = "default_suppress_redelivery")]
    pub suppress_redelivery: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            stale_policy: StaleEventPolicy::default(),
            suppress_redelivery: default_suppress_redelivery(),
        }
    }
}

fn default_suppress_redelivery() -> bool {
    true
}
