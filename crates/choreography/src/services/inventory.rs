//! Inventory participant.

use std::sync::Arc;

use common::{OrderId, OutcomeSource, SagaObserver};
use event_channel::{Event, EventHandler, EventKind, EventSink};

use super::{Participant, ParticipantCore, subscribe};
use crate::ledger::{ActionLedger, LocalAction};

/// Reserves stock once payment went through and releases it on cancellation.
pub struct InventoryParticipant {
    core: ParticipantCore,
}

impl Participant for InventoryParticipant {
    const NAME: &'static str = "inventory";
    const SUBSCRIPTIONS: &'static [EventKind] =
        &[EventKind::PaymentProcessed, EventKind::OrderCancelled];
}

impl InventoryParticipant {
    /// Creates the participant and subscribes it to `channel`.
    pub fn new(
        channel: Arc<dyn EventSink>,
        outcome: Arc<dyn OutcomeSource>,
        observer: Arc<dyn SagaObserver>,
    ) -> Arc<Self> {
        let participant = Arc::new(Self {
            core: ParticipantCore::new(Self::NAME, channel, outcome, observer),
        });
        subscribe(participant.core.channel(), &participant);
        participant
    }

    /// Returns the reservations and releases made so far.
    pub fn ledger(&self) -> &ActionLedger {
        self.core.ledger()
    }

    fn reserve_inventory(&self, order_id: OrderId) {
        tracing::info!(%order_id, "reserving inventory");
        self.core.attempt(
            order_id,
            LocalAction::Reserved,
            LocalAction::ReservationFailed,
            EventKind::InventoryReserved,
        );
    }

    fn release_inventory(&self, order_id: OrderId) {
        tracing::info!(%order_id, "releasing inventory");
        self.core.compensate(order_id, LocalAction::Released);
    }
}

impl EventHandler for InventoryParticipant {
    fn on_event(&self, event: &Event) {
        match event.kind() {
            EventKind::PaymentProcessed if event.success() => {
                self.reserve_inventory(event.subject_id())
            }
            EventKind::OrderCancelled => self.release_inventory(event.subject_id()),
            _ => {}
        }
    }
}
