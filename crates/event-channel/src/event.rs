//! Choreography events.

use common::OrderId;
use serde::{Deserialize, Serialize};

/// The business fact an event announces. Also the channel topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// An order was created and the saga started.
    OrderCreated,
    /// A payment attempt finished.
    PaymentProcessed,
    /// An inventory reservation attempt finished.
    InventoryReserved,
    /// A shipment scheduling attempt finished.
    ShippingScheduled,
    /// The order was cancelled; every participant compensates.
    OrderCancelled,
}

impl EventKind {
    /// Every event kind, in saga order.
    pub const ALL: [EventKind; 5] = [
        EventKind::OrderCreated,
        EventKind::PaymentProcessed,
        EventKind::InventoryReserved,
        EventKind::ShippingScheduled,
        EventKind::OrderCancelled,
    ];

    /// Returns the topic name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::OrderCreated => "ORDER_CREATED",
            EventKind::PaymentProcessed => "PAYMENT_PROCESSED",
            EventKind::InventoryReserved => "INVENTORY_RESERVED",
            EventKind::ShippingScheduled => "SHIPPING_SCHEDULED",
            EventKind::OrderCancelled => "ORDER_CANCELLED",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable fact published on the channel.
///
/// `subject_id` correlates all events of one saga instance. `success` is
/// false only for failed attempts; cancellation is always a success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: EventKind,
    subject_id: OrderId,
    success: bool,
}

impl Event {
    /// Creates an event.
    pub fn new(kind: EventKind, subject_id: OrderId, success: bool) -> Self {
        Self {
            kind,
            subject_id,
            success,
        }
    }

    /// Creates a positive event.
    pub fn succeeded(kind: EventKind, subject_id: OrderId) -> Self {
        Self::new(kind, subject_id, true)
    }

    /// Creates a negative event.
    pub fn failed(kind: EventKind, subject_id: OrderId) -> Self {
        Self::new(kind, subject_id, false)
    }

    /// Creates the cancellation broadcast for an order.
    pub fn cancelled(subject_id: OrderId) -> Self {
        Self::new(EventKind::OrderCancelled, subject_id, true)
    }

    /// Returns the topic the event is published on.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the order the event is about.
    pub fn subject_id(&self) -> OrderId {
        self.subject_id
    }

    /// Returns whether the reported action succeeded.
    pub fn success(&self) -> bool {
        self.success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_always_successful() {
        let id = OrderId::new();
        let event = Event::cancelled(id);
        assert_eq!(event.kind(), EventKind::OrderCancelled);
        assert_eq!(event.subject_id(), id);
        assert!(event.success());
    }

    #[test]
    fn failed_constructor_sets_flag() {
        let event = Event::failed(EventKind::PaymentProcessed, OrderId::new());
        assert!(!event.success());
    }

    #[test]
    fn topic_names() {
        let names: Vec<&str> = EventKind::ALL.iter().map(EventKind::as_str).collect();
        assert_eq!(
            names,
            [
                "ORDER_CREATED",
                "PAYMENT_PROCESSED",
                "INVENTORY_RESERVED",
                "SHIPPING_SCHEDULED",
                "ORDER_CANCELLED"
            ]
        );
    }

    #[test]
    fn wire_format_uses_topic_names() {
        let id = OrderId::new();
        let event = Event::succeeded(EventKind::InventoryReserved, id);
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["type"], "INVENTORY_RESERVED");
        assert_eq!(json["subject_id"], id.to_string());
        assert_eq!(json["success"], true);
    }
}
