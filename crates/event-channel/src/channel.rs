//! Topic-based publish/subscribe with synchronous, in-order delivery.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use crate::event::{Event, EventKind};

/// Reacts to events delivered by a channel.
pub trait EventHandler: Send + Sync {
    /// Handles one event. Runs on the publisher's thread before `publish` returns.
    fn on_event(&self, event: &Event);
}

/// Anything participants can subscribe to and publish on.
///
/// Implementations must deliver synchronously: every handler subscribed to
/// `event.kind()` at publish time runs exactly once, in subscription order,
/// before `publish` returns.
pub trait EventSink: Send + Sync {
    /// Registers `handler` for `kind`. The sink does not keep the handler alive.
    fn subscribe(&self, kind: EventKind, handler: Weak<dyn EventHandler>);

    /// Delivers `event` to the current subscribers of its kind.
    fn publish(&self, event: Event);
}

/// In-process event channel.
///
/// The subscriber registry is written at subscription time and only read on
/// publish. Publishing snapshots the subscriber list and releases the lock
/// before any handler runs, so handlers may publish again: the nested
/// delivery runs to completion before the outer one moves to its next
/// handler.
#[derive(Default)]
pub struct EventChannel {
    subscribers: RwLock<HashMap<EventKind, Vec<Weak<dyn EventHandler>>>>,
}

impl EventChannel {
    /// Creates a channel with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a channel ready to be shared between participants.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns the number of live subscribers for `kind`.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .map_or(0, |list| list.iter().filter(|h| h.strong_count() > 0).count())
    }

    fn snapshot(&self, kind: EventKind) -> Vec<Arc<dyn EventHandler>> {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&kind)
            .map(|list| list.iter().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }
}

impl EventSink for EventChannel {
    fn subscribe(&self, kind: EventKind, handler: Weak<dyn EventHandler>) {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        let list = subscribers.entry(kind).or_default();
        list.retain(|h| h.strong_count() > 0);
        list.push(handler);
        tracing::debug!(%kind, subscribers = list.len(), "subscribed");
    }

    #[tracing::instrument(
        skip(self, event),
        fields(kind = %event.kind(), subject_id = %event.subject_id())
    )]
    fn publish(&self, event: Event) {
        let handlers = self.snapshot(event.kind());
        if handlers.is_empty() {
            return;
        }

        metrics::counter!("events_published_total", "kind" => event.kind().as_str()).increment(1);
        tracing::debug!(
            success = event.success(),
            handlers = handlers.len(),
            "publishing event"
        );

        for handler in handlers {
            handler.on_event(&event);
        }
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
        let mut topics: HashMap<EventKind, usize> = HashMap::new();
        for (kind, list) in subscribers.iter() {
            topics.insert(*kind, list.len());
        }
        f.debug_struct("EventChannel")
            .field("subscribers", &topics)
            .finish()
    }
}
