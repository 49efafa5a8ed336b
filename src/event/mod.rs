//! Cross-process events
//!
//! An [`Event`] is published by writing its JSON encoding under the event
//! root of the store. Every process that called
//! [`EventEngine::start_listening`] sees the write through its watch on that
//! root; the [`EventDispatcher`] decodes the stored events and calls the
//! [`EventListener`]s registered for each event's key.

mod dispatcher;
mod engine;
mod listener;
mod model;

pub use dispatcher::*;
pub use engine::*;
pub use listener::*;
pub use model::*;
