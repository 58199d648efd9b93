//! Synchronous publish/subscribe channel for choreographed sagas.
//!
//! Participants subscribe to topics ([`EventKind`]) and publish immutable
//! [`Event`]s. Delivery is synchronous and in subscription order; a handler
//! that publishes while handling an event triggers a depth-first nested
//! delivery. There is no buffering and no redelivery.

pub mod channel;
pub mod event;
pub mod recorder;

pub use channel::{EventChannel, EventHandler, EventSink};
pub use event::{Event, EventKind};
pub use recorder::EventRecorder;
