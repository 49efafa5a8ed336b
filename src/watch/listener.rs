use std::collections::HashMap;

#[cfg(test)]
use mockall::automock;

/// Callback surface driven by the watch loop.
///
/// `changed` receives the full snapshot of the watched keys (fully-qualified
/// path -> current value) each time any of them changes, and once when the
/// watch starts. It runs on the watch task: a slow listener delays change
/// detection for its own registration only.
#[cfg_attr(test, automock)]
pub trait ChangedListener: Send + Sync + 'static {
    fn changed(
        &self,
        data: HashMap<String, String>,
    );
}
