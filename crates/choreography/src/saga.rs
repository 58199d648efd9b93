//! Wiring for a complete choreographed order saga.

use std::sync::Arc;
use std::time::Duration;

use common::{FixedOutcome, OrderStatus, OutcomeSource, SagaObserver};
use event_channel::EventSink;

use crate::completion::{SagaHandle, SagaOutcome};
use crate::error::{ChoreographyError, Result};
use crate::services::{
    InventoryParticipant, Order, OrderParticipant, PaymentParticipant, ShippingParticipant,
};

/// Outcome sources for the participants that stand in for external systems.
#[derive(Clone)]
pub struct ParticipantOutcomes {
    pub payment: Arc<dyn OutcomeSource>,
    pub inventory: Arc<dyn OutcomeSource>,
    pub shipping: Arc<dyn OutcomeSource>,
}

impl ParticipantOutcomes {
    /// Wraps one outcome source per external participant.
    pub fn new(
        payment: impl OutcomeSource + 'static,
        inventory: impl OutcomeSource + 'static,
        shipping: impl OutcomeSource + 'static,
    ) -> Self {
        Self {
            payment: Arc::new(payment),
            inventory: Arc::new(inventory),
            shipping: Arc::new(shipping),
        }
    }

    /// Every external call succeeds.
    pub fn always_succeed() -> Self {
        Self::new(
            FixedOutcome::success(),
            FixedOutcome::success(),
            FixedOutcome::success(),
        )
    }
}

/// The four participants subscribed to one shared channel.
///
/// Participants are created in saga order (order, payment, inventory,
/// shipping), which fixes their delivery order on shared topics. Anything
/// else that must observe events before the participants react, such as an
/// [`EventRecorder`](event_channel::EventRecorder), has to subscribe to the
/// channel before this is built.
pub struct Choreography {
    channel: Arc<dyn EventSink>,
    order: Arc<OrderParticipant>,
    payment: Arc<PaymentParticipant>,
    inventory: Arc<InventoryParticipant>,
    shipping: Arc<ShippingParticipant>,
}

impl Choreography {
    /// Builds and subscribes all participants on `channel`.
    pub fn new(
        channel: Arc<dyn EventSink>,
        outcomes: ParticipantOutcomes,
        observer: Arc<dyn SagaObserver>,
    ) -> Self {
        let order = OrderParticipant::new(Arc::clone(&channel), Arc::clone(&observer));
        let payment =
            PaymentParticipant::new(Arc::clone(&channel), outcomes.payment, Arc::clone(&observer));
        let inventory = InventoryParticipant::new(
            Arc::clone(&channel),
            outcomes.inventory,
            Arc::clone(&observer),
        );
        let shipping = ShippingParticipant::new(Arc::clone(&channel), outcomes.shipping, observer);

        Self {
            channel,
            order,
            payment,
            inventory,
            shipping,
        }
    }

    /// Starts the saga for `order`. The saga entry point.
    pub fn create_order(&self, order: &mut Order) -> Result<SagaHandle> {
        self.order.create_order(order)
    }

    /// Starts the saga for `order` and waits for it to finish.
    ///
    /// If `deadline` passes first the order is cancelled, every participant
    /// compensates, and the outcome is [`SagaOutcome::TimedOut`].
    pub async fn run_order(&self, order: &mut Order, deadline: Duration) -> Result<SagaOutcome> {
        let mut handle = self.create_order(order)?;
        match handle.wait(deadline).await {
            Err(ChoreographyError::Timeout { order_id, .. }) => {
                self.order.abandon(order_id);
                Ok(SagaOutcome::TimedOut)
            }
            result => result,
        }
    }

    /// Returns the last known status of an order.
    pub fn order_status(&self, order: &Order) -> Option<OrderStatus> {
        self.order.order_status(order.id())
    }

    /// Releases everything the participants hold for a finished order.
    ///
    /// Returns false, leaving all state in place, while the saga is still
    /// in flight.
    pub fn forget(&self, order: &Order) -> bool {
        if !self.order.forget(order.id()) {
            return false;
        }
        self.payment.ledger().forget(order.id());
        self.inventory.ledger().forget(order.id());
        self.shipping.ledger().forget(order.id());
        true
    }

    pub fn channel(&self) -> &Arc<dyn EventSink> {
        &self.channel
    }

    pub fn order(&self) -> &OrderParticipant {
        &self.order
    }

    pub fn payment(&self) -> &PaymentParticipant {
        &self.payment
    }

    pub fn inventory(&self) -> &InventoryParticipant {
        &self.inventory
    }

    pub fn shipping(&self) -> &ShippingParticipant {
        &self.shipping
    }
}
