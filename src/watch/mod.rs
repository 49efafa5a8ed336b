//! Change detection
//!
//! A [`WatchProcessor`] owns one registration: a fixed set of store keys, a
//! change cursor and a cancellation token. It spawns exactly one background
//! task that blocks on [`StoreClient::watch_prefix`](crate::StoreClient::watch_prefix),
//! resolves a full snapshot of the keys whenever they change and hands it to a
//! [`ChangedListener`].
//!
//! ```text
//! start() ── seed snapshot ──> listener.changed()
//!    └─> spawn loop:
//!          watch_prefix(keys, cursor) ─ok─> snapshot ──> listener.changed()
//!                                     └err─> report, sleep(backoff), retry
//! ```
//!
//! Backend failures never end the loop; they are logged, counted and pushed
//! to the handle's error channel.

mod listener;
mod processor;

pub use listener::*;
pub use processor::*;
