//! Event recorder for inspecting what went over a channel.

use std::sync::{Arc, Mutex};

use common::OrderId;

use crate::channel::{EventHandler, EventSink};
use crate::event::{Event, EventKind};

/// Subscribes to a set of topics and keeps every event it receives, in
/// delivery order.
///
/// Attach it before the participants so it sees each event before they
/// react to it; attach it after them to see events in completion order.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Mutex<Vec<Event>>,
}

impl EventRecorder {
    /// Creates a recorder subscribed to `kinds` on `sink`.
    pub fn attach(sink: &dyn EventSink, kinds: &[EventKind]) -> Arc<Self> {
        let recorder = Arc::new(Self::default());
        let handler: Arc<dyn EventHandler> = recorder.clone();
        for kind in kinds {
            sink.subscribe(*kind, Arc::downgrade(&handler));
        }
        recorder
    }

    /// Creates a recorder subscribed to every topic.
    pub fn attach_all(sink: &dyn EventSink) -> Arc<Self> {
        Self::attach(sink, &EventKind::ALL)
    }

    /// Returns a copy of every recorded event.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Returns the recorded events for one order.
    pub fn events_for(&self, order_id: OrderId) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.subject_id() == order_id)
            .collect()
    }

    /// Returns how many events of `kind` were recorded for `order_id`.
    pub fn count(&self, kind: EventKind, order_id: OrderId) -> usize {
        self.events_for(order_id)
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }
}

impl EventHandler for EventRecorder {
    fn on_event(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(*event);
    }
}
