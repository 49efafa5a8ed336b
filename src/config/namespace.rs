use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_CONFIG_ROOT;
use crate::constants::DEFAULT_EVENT_ROOT;
use crate::utils::path::is_at_or_below;
use crate::Error;
use crate::Result;

/// Store layout shared by every process of the ecosystem
///
/// ```toml
/// [namespace]
/// config_root = "/system"
/// event_root = "/system_events"
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NamespaceConfig {
    /// Root of `{application}/{group}[/{tag}]/{leaf}` configuration entries
    #[serde(default = "default_config_root")]
    pub config_root: String,

    /// Root under which events are published, one node per event key
    #[serde(default = "default_event_root")]
    pub event_root: String,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            config_root: default_config_root(),
            event_root: default_event_root(),
        }
    }
}

impl NamespaceConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, root) in [("config_root", &self.config_root), ("event_root", &self.event_root)] {
            if !root.starts_with('/') || root.len() < 2 {
                return Err(Error::Config(ConfigError::Message(format!(
                    "namespace.{name} must be an absolute, non-root path, got {root:?}"
                ))));
            }
        }

        // Events under the config tree would be read back as configuration
        if is_at_or_below(&self.event_root, &self.config_root)
            || is_at_or_below(&self.config_root, &self.event_root)
        {
            return Err(Error::Config(ConfigError::Message(format!(
                "namespace.event_root ({}) and namespace.config_root ({}) must not overlap",
                self.event_root, self.config_root
            ))));
        }
        Ok(())
    }
}

fn default_config_root() -> String {
    DEFAULT_CONFIG_ROOT.to_string()
}
fn default_event_root() -> String {
    DEFAULT_EVENT_ROOT.to_string()
}
