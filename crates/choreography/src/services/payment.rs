//! Payment participant.

use std::sync::Arc;

use common::{OrderId, OutcomeSource, SagaObserver};
use event_channel::{Event, EventHandler, EventKind, EventSink};

use super::{Participant, ParticipantCore, subscribe};
use crate::ledger::{ActionLedger, LocalAction};

/// Charges the customer when an order is created and refunds on cancellation.
pub struct PaymentParticipant {
    core: ParticipantCore,
}

impl Participant for PaymentParticipant {
    const NAME: &'static str = "payment";
    const SUBSCRIPTIONS: &'static [EventKind] =
        &[EventKind::OrderCreated, EventKind::OrderCancelled];
}

impl PaymentParticipant {
    /// Creates the participant and subscribes it to `channel`.
    ///
    /// `outcome` decides whether each charge goes through.
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

    /// Returns the charges and refunds made so far.
    pub fn ledger(&self) -> &ActionLedger {
        self.core.ledger()
    }

    fn process_payment(&self, order_id: OrderId) {
        tracing::info!(%order_id, "processing payment");
        self.core.attempt(
            order_id,
            LocalAction::Charged,
            LocalAction::ChargeDeclined,
            EventKind::PaymentProcessed,
        );
    }

    fn refund_payment(&self, order_id: OrderId) {
        tracing::info!(%order_id, "refunding payment");
        self.core.compensate(order_id, LocalAction::Refunded);
    }
}

impl EventHandler for PaymentParticipant {
    fn on_event(&self, event: &Event) {
        match event.kind() {
            EventKind::OrderCreated => self.process_payment(event.subject_id()),
            EventKind::OrderCancelled => self.refund_payment(event.subject_id()),
            _ => {}
        }
    }
}
