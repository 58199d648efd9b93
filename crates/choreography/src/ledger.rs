//! Per-participant record of local actions.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use common::OrderId;
use serde::Serialize;

/// A local effect a participant carried out for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LocalAction {
    /// Payment was taken.
    Charged,
    /// The payment provider declined the charge.
    ChargeDeclined,
    /// Payment was returned.
    Refunded,
    /// Stock was put aside.
    Reserved,
    /// Stock could not be reserved.
    ReservationFailed,
    /// Reserved stock was returned.
    Released,
    /// A shipment was booked.
    Scheduled,
    /// No shipment could be booked.
    SchedulingFailed,
    /// A booked shipment was called off.
    ShipmentCancelled,
}

impl LocalAction {
    /// Returns true for actions that undo an earlier forward action.
    pub fn is_compensation(&self) -> bool {
        matches!(
            self,
            LocalAction::Refunded | LocalAction::Released | LocalAction::ShipmentCancelled
        )
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    actions: HashMap<OrderId, Vec<LocalAction>>,
    compensated: HashSet<OrderId>,
}

/// Actions taken by one participant, grouped by order.
///
/// The ledger also guards compensation: each order is compensated at most
/// once, however many cancellations arrive for it, and once compensated
/// it refuses further forward actions.
///
/// Entries are kept for the life of the ledger. Call [`forget`](Self::forget)
/// once an order's history is no longer needed.
#[derive(Debug, Default)]
pub struct ActionLedger {
    state: Mutex<LedgerState>,
}

impl ActionLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action for `order_id`.
    pub fn record(&self, order_id: OrderId, action: LocalAction) {
        self.lock()
            .actions
            .entry(order_id)
            .or_default()
            .push(action);
    }

    /// Marks `order_id` as compensated. Returns false if it already was.
    pub fn begin_compensation(&self, order_id: OrderId) -> bool {
        self.lock().compensated.insert(order_id)
    }

    /// Returns true once `order_id` has been compensated.
    pub fn is_compensated(&self, order_id: OrderId) -> bool {
        self.lock().compensated.contains(&order_id)
    }

    /// Drops everything recorded for `order_id`.
    ///
    /// A forgotten order can be acted on and compensated again.
    pub fn forget(&self, order_id: OrderId) {
        let mut state = self.lock();
        state.actions.remove(&order_id);
        state.compensated.remove(&order_id);
    }

    /// Returns the actions recorded for `order_id`, oldest first.
    pub fn actions(&self, order_id: OrderId) -> Vec<LocalAction> {
        self.lock()
            .actions
            .get(&order_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns how many compensating actions were recorded for `order_id`.
    pub fn compensation_count(&self, order_id: OrderId) -> usize {
        self.actions(order_id)
            .iter()
            .filter(|a| a.is_compensation())
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
