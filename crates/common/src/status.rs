//! Order status as seen by the saga participants.

use serde::{Deserialize, Serialize};

/// The last status transition attempted on an order.
///
/// This is an observational field only: coordinators never branch on it.
/// It holds the most recent transition, not the history: an order whose
/// shipment was undone and which was then cancelled reads `Cancelled`, and
/// the `ShippingCancelled` step in between is lost.
///
/// ```text
/// Created ──► Pending ──┬──► Shipped ──► Completed
///                       │       │
///                       │       └──► ShippingCancelled
///                       └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order exists but no saga has touched it.
    #[default]
    Created,

    /// The saga has started working on the order.
    Pending,

    /// The order was cancelled by compensation.
    Cancelled,

    /// The shipment step ran.
    Shipped,

    /// The shipment was cancelled by compensation.
    ShippingCancelled,

    /// Every participant finished its forward action (terminal state).
    Completed,
}

impl OrderStatus {
    /// Returns true if no saga will move the order any further.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Completed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Pending => "PENDING",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::ShippingCancelled => "SHIPPING_CANCELLED",
            OrderStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
