//! The four saga participants.
//!
//! Each participant subscribes itself to a fixed topic set when it is
//! built and reacts to events on the publisher's thread. Order starts and
//! ends the saga; payment, inventory and shipping each perform one forward
//! action and one compensating action.

pub mod inventory;
pub mod order;
pub mod payment;
pub mod shipping;

use std::sync::Arc;

use common::{ObservationKind, OrderId, OutcomeSource, SagaObservation, SagaObserver};
use event_channel::{Event, EventHandler, EventKind, EventSink};

use crate::ledger::{ActionLedger, LocalAction};

pub use inventory::InventoryParticipant;
pub use order::{Order, OrderParticipant};
pub use payment::PaymentParticipant;
pub use shipping::ShippingParticipant;

/// A choreography participant.
pub trait Participant: EventHandler + 'static {
    /// Stage name used in logs and observations.
    const NAME: &'static str;

    /// Topics the participant subscribes to on construction.
    const SUBSCRIPTIONS: &'static [EventKind];
}

/// Subscribes `participant` to all of its topics on `sink`.
pub(crate) fn subscribe<P: Participant>(sink: &dyn EventSink, participant: &Arc<P>) {
    let handler: Arc<dyn EventHandler> = participant.clone();
    for kind in P::SUBSCRIPTIONS {
        sink.subscribe(*kind, Arc::downgrade(&handler));
    }
}

/// State shared by the payment, inventory and shipping participants.
pub(crate) struct ParticipantCore {
    name: &'static str,
    channel: Arc<dyn EventSink>,
    outcome: Arc<dyn OutcomeSource>,
    observer: Arc<dyn SagaObserver>,
    ledger: ActionLedger,
}

impl ParticipantCore {
    pub(crate) fn new(
        name: &'static str,
        channel: Arc<dyn EventSink>,
        outcome: Arc<dyn OutcomeSource>,
        observer: Arc<dyn SagaObserver>,
    ) -> Self {
        Self {
            name,
            channel,
            outcome,
            observer,
            ledger: ActionLedger::new(),
        }
    }

    pub(crate) fn channel(&self) -> &dyn EventSink {
        self.channel.as_ref()
    }

    pub(crate) fn ledger(&self) -> &ActionLedger {
        &self.ledger
    }

    /// Runs the forward action and publishes its result as `publishes`.
    ///
    /// Orders this participant has already compensated are skipped without
    /// publishing: a forward event that arrives after the cancellation
    /// would otherwise leave an effect nothing undoes.
    pub(crate) fn attempt(
        &self,
        order_id: OrderId,
        done: LocalAction,
        failed: LocalAction,
        publishes: EventKind,
    ) {
        if self.ledger.is_compensated(order_id) {
            tracing::warn!(
                participant = self.name,
                %order_id,
                %publishes,
                "order already cancelled, skipping late forward action"
            );
            return;
        }

        self.observe(order_id, ObservationKind::StepAttempted);

        let success = self.outcome.decide();
        if success {
            self.ledger.record(order_id, done);
            self.observe(order_id, ObservationKind::StepSucceeded);
        } else {
            self.ledger.record(order_id, failed);
            self.observe(order_id, ObservationKind::StepFailed);
            tracing::warn!(participant = self.name, %order_id, "local step failed");
        }

        self.channel.publish(Event::new(publishes, order_id, success));
    }

    /// Runs the compensating action once per order. Never publishes.
    pub(crate) fn compensate(&self, order_id: OrderId, action: LocalAction) {
        if !self.ledger.begin_compensation(order_id) {
            tracing::debug!(participant = self.name, %order_id, "duplicate cancellation ignored");
            return;
        }

        self.ledger.record(order_id, action);
        metrics::counter!("saga_compensations_total", "stage" => self.name).increment(1);
        self.observe(order_id, ObservationKind::CompensationInvoked);
    }

    fn observe(&self, order_id: OrderId, kind: ObservationKind) {
        self.observer
            .observe(&SagaObservation::new(order_id, self.name, kind));
    }
}
