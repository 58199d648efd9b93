//! Order participant: starts the saga and turns failures into cancellation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use common::{ObservationKind, OrderId, OrderStatus, SagaObservation, SagaObserver};
use event_channel::{Event, EventHandler, EventKind, EventSink};

use super::{Participant, subscribe};
use crate::completion::{CompletionSender, SagaHandle, SagaOutcome};
use crate::error::{ChoreographyError, Result};

/// An order handed to the choreography.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    status: OrderStatus,
}

impl Order {
    /// Creates a new order in `Created` status.
    pub fn new() -> Self {
        Self::with_id(OrderId::new())
    }

    /// Creates an order with a known id.
    pub fn with_id(id: OrderId) -> Self {
        Self {
            id,
            status: OrderStatus::Created,
        }
    }

    /// Returns the order's id.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the status the caller's copy was last given.
    pub fn status(&self) -> OrderStatus {
        self.status
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::new()
    }
}

/// Statuses are kept until [`OrderParticipant::forget`] is called, so a
/// long-running process should forget orders it has finished with.
#[derive(Debug, Default)]
struct OrderBook {
    statuses: HashMap<OrderId, OrderStatus>,
    waiters: HashMap<OrderId, CompletionSender>,
}

/// Starts sagas, watches the participants' results, and broadcasts
/// ORDER_CANCELLED on the first failure.
///
/// It never subscribes to ORDER_CANCELLED itself, and publishes at most one
/// cancellation per order, so cancellation cannot loop.
pub struct OrderParticipant {
    channel: Arc<dyn EventSink>,
    observer: Arc<dyn SagaObserver>,
    book: Mutex<OrderBook>,
}

impl Participant for OrderParticipant {
    const NAME: &'static str = "order";
    const SUBSCRIPTIONS: &'static [EventKind] = &[
        EventKind::PaymentProcessed,
        EventKind::InventoryReserved,
        EventKind::ShippingScheduled,
    ];
}

impl OrderParticipant {
    /// Creates the participant and subscribes it to `channel`.
    pub fn new(channel: Arc<dyn EventSink>, observer: Arc<dyn SagaObserver>) -> Arc<Self> {
        let participant = Arc::new(Self {
            channel,
            observer,
            book: Mutex::new(OrderBook::default()),
        });
        subscribe(participant.channel.as_ref(), &participant);
        participant
    }

    /// Starts the saga for `order`: marks it pending and publishes ORDER_CREATED.
    ///
    /// Each order can be started once. Because delivery is synchronous the
    /// saga has usually finished by the time this returns, but callers
    /// should rely on the returned handle rather than on that.
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    pub fn create_order(&self, order: &mut Order) -> Result<SagaHandle> {
        let order_id = order.id();
        let handle = {
            let mut book = self.lock();
            if book.statuses.contains_key(&order_id) {
                return Err(ChoreographyError::AlreadyStarted(order_id));
            }
            order.status = OrderStatus::Pending;
            book.statuses.insert(order_id, OrderStatus::Pending);
            let (sender, handle) = SagaHandle::new(order_id);
            book.waiters.insert(order_id, sender);
            handle
        };

        metrics::counter!("saga_executions_total", "topology" => "choreography").increment(1);
        tracing::info!("creating order");
        self.observe(order_id, ObservationKind::StepAttempted);
        self.channel
            .publish(Event::succeeded(EventKind::OrderCreated, order_id));

        Ok(handle)
    }

    /// Returns the last known status of an order.
    pub fn order_status(&self, order_id: OrderId) -> Option<OrderStatus> {
        self.lock().statuses.get(&order_id).copied()
    }

    /// Cancels an order whose saga missed its deadline.
    ///
    /// Returns false if the saga had already finished.
    pub fn abandon(&self, order_id: OrderId) -> bool {
        let waiter = {
            let mut book = self.lock();
            match book.statuses.get(&order_id) {
                Some(status) if !status.is_terminal() => {
                    book.statuses.insert(order_id, OrderStatus::Cancelled);
                    book.waiters.remove(&order_id)
                }
                _ => return false,
            }
        };

        tracing::warn!(%order_id, "saga deadline expired, cancelling order");
        self.observe(order_id, ObservationKind::SagaFailed);
        metrics::counter!("saga_failed", "topology" => "choreography").increment(1);
        self.channel.publish(Event::cancelled(order_id));

        if let Some(waiter) = waiter {
            let _ = waiter.send(SagaOutcome::TimedOut);
        }
        true
    }

    /// Drops a finished order's status.
    ///
    /// Returns false if the order is unknown or still in flight.
    pub fn forget(&self, order_id: OrderId) -> bool {
        let mut book = self.lock();
        if !book.statuses.get(&order_id).is_some_and(OrderStatus::is_terminal) {
            return false;
        }
        book.statuses.remove(&order_id);
        true
    }

    fn cancel(&self, order_id: OrderId, failed: EventKind) {
        let waiter = {
            let mut book = self.lock();
            if book.statuses.get(&order_id) == Some(&OrderStatus::Cancelled) {
                return;
            }
            book.statuses.insert(order_id, OrderStatus::Cancelled);
            book.waiters.remove(&order_id)
        };

        tracing::warn!(%order_id, %failed, "cancelling order due to failed step");
        self.observe(order_id, ObservationKind::SagaFailed);
        metrics::counter!("saga_failed", "topology" => "choreography").increment(1);
        self.channel.publish(Event::cancelled(order_id));

        // Delivered after the broadcast so compensations have already run.
        if let Some(waiter) = waiter {
            let _ = waiter.send(SagaOutcome::Cancelled { failed });
        }
    }

    fn complete(&self, order_id: OrderId) {
        let waiter = {
            let mut book = self.lock();
            if book.statuses.get(&order_id).is_some_and(OrderStatus::is_terminal) {
                return;
            }
            book.statuses.insert(order_id, OrderStatus::Completed);
            book.waiters.remove(&order_id)
        };

        tracing::info!(%order_id, "order completed");
        self.observe(order_id, ObservationKind::SagaSucceeded);
        metrics::counter!("saga_completed", "topology" => "choreography").increment(1);

        if let Some(waiter) = waiter {
            let _ = waiter.send(SagaOutcome::Completed);
        }
    }

    fn observe(&self, order_id: OrderId, kind: ObservationKind) {
        self.observer
            .observe(&SagaObservation::new(order_id, Self::NAME, kind));
    }

    fn lock(&self) -> MutexGuard<'_, OrderBook> {
        self.book.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventHandler for OrderParticipant {
    fn on_event(&self, event: &Event) {
        if !event.success() {
            self.cancel(event.subject_id(), event.kind());
        } else if event.kind() == EventKind::ShippingScheduled {
            self.complete(event.subject_id());
        }
    }
}
