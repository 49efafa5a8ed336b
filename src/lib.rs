//! Live configuration and cross-process events on top of a hierarchical,
//! versioned key/value store.
//!
//! - [`WatchProcessor`]: follows a set of keys and hands fresh snapshots to a
//!   [`ChangedListener`] whenever they change
//! - [`ConfigCenter`]: namespaced configuration reads and watches
//! - [`EventEngine`]: publishes [`Event`]s and dispatches them to
//!   [`EventListener`]s in every process watching the event root
//!
//! The backend is abstracted by [`StoreClient`]; [`MemStore`] implements it
//! in process.

mod center;
mod config;
mod errors;
mod event;
mod metrics;
mod store;
mod watch;

pub mod constants;
pub mod utils;

pub use center::*;
pub use config::*;
pub use errors::*;
pub use event::*;
pub use metrics::gather_metrics;
pub use store::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
