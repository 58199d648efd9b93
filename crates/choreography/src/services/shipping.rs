//! Shipping participant.

use std::sync::Arc;

use common::{OrderId, OutcomeSource, SagaObserver};
use event_channel::{Event, EventHandler, EventKind, EventSink};

use super::{Participant, ParticipantCore, subscribe};
use crate::ledger::{ActionLedger, LocalAction};

/// Schedules a shipment once stock is reserved and cancels it on cancellation.
pub struct ShippingParticipant {
    core: ParticipantCore,
}

impl Participant for ShippingParticipant {
    const NAME: &'static str = "shipping";
    const SUBSCRIPTIONS: &'static [EventKind] =
        &[EventKind::InventoryReserved, EventKind::OrderCancelled];
}

impl ShippingParticipant {
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

    /// Returns the shipments scheduled and cancelled so far.
    pub fn ledger(&self) -> &ActionLedger {
        self.core.ledger()
    }

    fn schedule_shipping(&self, order_id: OrderId) {
        tracing::info!(%order_id, "scheduling shipping");
        self.core.attempt(
            order_id,
            LocalAction::Scheduled,
            LocalAction::SchedulingFailed,
            EventKind::ShippingScheduled,
        );
    }

    fn cancel_shipping(&self, order_id: OrderId) {
        tracing::info!(%order_id, "cancelling shipping");
        self.core.compensate(order_id, LocalAction::ShipmentCancelled);
    }
}

impl EventHandler for ShippingParticipant {
    fn on_event(&self, event: &Event) {
        match event.kind() {
            EventKind::InventoryReserved if event.success() => {
                self.schedule_shipping(event.subject_id())
            }
            EventKind::OrderCancelled => self.cancel_shipping(event.subject_id()),
            _ => {}
        }
    }
}
