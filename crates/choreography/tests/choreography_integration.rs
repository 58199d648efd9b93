//! Integration tests for the choreographed order saga.

use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::Duration;

use choreography::{
    ActionLedger, ChoreographyError, Choreography, InventoryParticipant, LocalAction, Order,
    OrderParticipant, ParticipantOutcomes, PaymentParticipant, SagaHandle, SagaOutcome,
    ShippingParticipant,
};
use common::{FixedOutcome, OrderStatus, RecordingObserver, ScriptedOutcome};
use event_channel::{Event, EventChannel, EventHandler, EventKind, EventRecorder, EventSink};

/// Sink that holds back every event of one kind until released, standing in
/// for a slow or partitioned transport.
struct HoldingSink {
    inner: Arc<EventChannel>,
    held_kind: EventKind,
    held: Mutex<Vec<Event>>,
}

impl HoldingSink {
    fn new(inner: Arc<EventChannel>, held_kind: EventKind) -> Arc<Self> {
        Arc::new(Self {
            inner,
            held_kind,
            held: Mutex::new(Vec::new()),
        })
    }

    fn held(&self) -> usize {
        self.held.lock().unwrap().len()
    }

    fn release(&self) {
        let held = std::mem::take(&mut *self.held.lock().unwrap());
        for event in held {
            self.inner.publish(event);
        }
    }
}

impl EventSink for HoldingSink {
    fn subscribe(&self, kind: EventKind, handler: Weak<dyn EventHandler>) {
        self.inner.subscribe(kind, handler);
    }

    fn publish(&self, event: Event) {
        if event.kind() == self.held_kind {
            self.held.lock().unwrap().push(event);
        } else {
            self.inner.publish(event);
        }
    }
}

struct TestHarness {
    channel: Arc<EventChannel>,
    recorder: Arc<EventRecorder>,
    observer: Arc<RecordingObserver>,
    saga: Choreography,
}

impl TestHarness {
    fn new(outcomes: ParticipantOutcomes) -> Self {
        let channel = EventChannel::shared();
        // Subscribed first so it sees every event before any participant reacts.
        let recorder = EventRecorder::attach_all(channel.as_ref());
        let observer = Arc::new(RecordingObserver::new());
        let saga = Choreography::new(channel.clone(), outcomes, observer.clone());
        Self {
            channel,
            recorder,
            observer,
            saga,
        }
    }

    fn with_failures(payment: bool, inventory: bool, shipping: bool) -> Self {
        Self::new(ParticipantOutcomes::new(
            FixedOutcome::from(payment),
            FixedOutcome::from(inventory),
            FixedOutcome::from(shipping),
        ))
    }

    /// Wires the saga over a sink that holds back `held_kind`.
    fn holding(held_kind: EventKind) -> (Self, Arc<HoldingSink>) {
        let channel = EventChannel::shared();
        let recorder = EventRecorder::attach_all(channel.as_ref());
        let observer = Arc::new(RecordingObserver::new());
        let sink = HoldingSink::new(channel.clone(), held_kind);
        let saga = Choreography::new(
            sink.clone(),
            ParticipantOutcomes::always_succeed(),
            observer.clone(),
        );
        let harness = Self {
            channel,
            recorder,
            observer,
            saga,
        };
        (harness, sink)
    }

    fn compensations(&self, order: &Order) -> [usize; 3] {
        [
            self.saga.payment().ledger().compensation_count(order.id()),
            self.saga.inventory().ledger().compensation_count(order.id()),
            self.saga.shipping().ledger().compensation_count(order.id()),
        ]
    }
}

#[test]
fn test_happy_path_publishes_exact_event_sequence() {
    let h = TestHarness::new(ParticipantOutcomes::always_succeed());
    let mut order = Order::new();

    let mut handle = h.saga.create_order(&mut order).unwrap();

    let id = order.id();
    assert_eq!(
        h.recorder.events(),
        vec![
            Event::succeeded(EventKind::OrderCreated, id),
            Event::succeeded(EventKind::PaymentProcessed, id),
            Event::succeeded(EventKind::InventoryReserved, id),
            Event::succeeded(EventKind::ShippingScheduled, id),
        ]
    );
    assert_eq!(h.recorder.count(EventKind::OrderCancelled, id), 0);

    assert_eq!(handle.try_outcome(), Some(SagaOutcome::Completed));
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_eq!(h.saga.order_status(&order), Some(OrderStatus::Completed));
    assert_eq!(h.compensations(&order), [0, 0, 0]);

    assert_eq!(h.saga.payment().ledger().actions(id), vec![LocalAction::Charged]);
    assert_eq!(h.saga.inventory().ledger().actions(id), vec![LocalAction::Reserved]);
    assert_eq!(h.saga.shipping().ledger().actions(id), vec![LocalAction::Scheduled]);
    assert!(h.observer.trail(id).contains(&("order", "SagaSucceeded")));
}

#[test]
fn test_payment_failure_cancels_once_and_compensates_each_participant_once() {
    let h = TestHarness::with_failures(false, true, true);
    let mut order = Order::new();

    let mut handle = h.saga.create_order(&mut order).unwrap();

    let id = order.id();
    assert_eq!(h.recorder.count(EventKind::PaymentProcessed, id), 1);
    assert_eq!(h.recorder.count(EventKind::OrderCancelled, id), 1);
    assert_eq!(h.recorder.count(EventKind::InventoryReserved, id), 0);
    assert_eq!(h.compensations(&order), [1, 1, 1]);

    assert_eq!(
        h.saga.payment().ledger().actions(id),
        vec![LocalAction::ChargeDeclined, LocalAction::Refunded]
    );
    assert_eq!(h.saga.inventory().ledger().actions(id), vec![LocalAction::Released]);
    assert_eq!(
        handle.try_outcome(),
        Some(SagaOutcome::Cancelled {
            failed: EventKind::PaymentProcessed
        })
    );
    assert_eq!(h.saga.order_status(&order), Some(OrderStatus::Cancelled));
}

#[test]
fn test_inventory_failure_refunds_payment() {
    let h = TestHarness::with_failures(true, false, true);
    let mut order = Order::new();

    let mut handle = h.saga.create_order(&mut order).unwrap();

    let id = order.id();
    assert_eq!(
        h.saga.payment().ledger().actions(id),
        vec![LocalAction::Charged, LocalAction::Refunded]
    );
    assert_eq!(
        h.saga.inventory().ledger().actions(id),
        vec![LocalAction::ReservationFailed, LocalAction::Released]
    );
    assert_eq!(
        h.saga.shipping().ledger().actions(id),
        vec![LocalAction::ShipmentCancelled]
    );
    assert_eq!(h.recorder.count(EventKind::ShippingScheduled, id), 0);
    assert_eq!(
        handle.try_outcome(),
        Some(SagaOutcome::Cancelled {
            failed: EventKind::InventoryReserved
        })
    );
}

#[test]
fn test_shipping_failure_unwinds_everything() {
    let h = TestHarness::with_failures(true, true, false);
    let mut order = Order::new();

    let mut handle = h.saga.create_order(&mut order).unwrap();

    let id = order.id();
    assert_eq!(
        h.recorder.events(),
        vec![
            Event::succeeded(EventKind::OrderCreated, id),
            Event::succeeded(EventKind::PaymentProcessed, id),
            Event::succeeded(EventKind::InventoryReserved, id),
            Event::failed(EventKind::ShippingScheduled, id),
            Event::cancelled(id),
        ]
    );
    assert_eq!(h.compensations(&order), [1, 1, 1]);
    assert_eq!(
        handle.try_outcome(),
        Some(SagaOutcome::Cancelled {
            failed: EventKind::ShippingScheduled
        })
    );
}

#[test]
fn test_cancellation_is_never_rebroadcast() {
    for (payment, inventory, shipping) in [
        (false, true, true),
        (true, false, true),
        (true, true, false),
        (false, false, false),
        (true, true, true),
    ] {
        let h = TestHarness::with_failures(payment, inventory, shipping);
        let mut order = Order::new();
        h.saga.create_order(&mut order).unwrap();

        let cancelled = h.recorder.count(EventKind::OrderCancelled, order.id());
        assert!(cancelled <= 1, "{cancelled} cancellations published");
        let failed = !(payment && inventory && shipping);
        assert_eq!(cancelled, usize::from(failed));
    }
}

#[test]
fn test_duplicate_cancellation_compensates_once() {
    let h = TestHarness::with_failures(true, false, true);
    let mut order = Order::new();
    h.saga.create_order(&mut order).unwrap();
    assert_eq!(h.compensations(&order), [1, 1, 1]);

    h.channel.publish(Event::cancelled(order.id()));
    h.channel.publish(Event::cancelled(order.id()));

    assert_eq!(h.compensations(&order), [1, 1, 1]);
    // Only the two manual publishes were added; nobody re-broadcast them.
    assert_eq!(h.recorder.count(EventKind::OrderCancelled, order.id()), 3);
}

#[test]
fn test_order_can_only_be_started_once() {
    let h = TestHarness::new(ParticipantOutcomes::always_succeed());
    let mut order = Order::new();
    h.saga.create_order(&mut order).unwrap();

    let err = h.saga.create_order(&mut order).unwrap_err();
    assert_eq!(err, ChoreographyError::AlreadyStarted(order.id()));
    assert_eq!(h.recorder.count(EventKind::OrderCreated, order.id()), 1);
}

#[test]
fn test_sequential_orders_do_not_interfere() {
    let h = TestHarness::new(ParticipantOutcomes::new(
        ScriptedOutcome::new([false, true], true),
        FixedOutcome::success(),
        FixedOutcome::success(),
    ));
    let mut declined = Order::new();
    let mut accepted = Order::new();

    let mut first = h.saga.create_order(&mut declined).unwrap();
    let mut second = h.saga.create_order(&mut accepted).unwrap();

    assert!(matches!(first.try_outcome(), Some(SagaOutcome::Cancelled { .. })));
    assert_eq!(second.try_outcome(), Some(SagaOutcome::Completed));
    assert_eq!(h.compensations(&declined), [1, 1, 1]);
    assert_eq!(h.compensations(&accepted), [0, 0, 0]);
    assert_eq!(h.recorder.count(EventKind::OrderCancelled, accepted.id()), 0);
}

#[test]
fn test_orders_started_from_many_threads_stay_isolated() {
    const ORDERS: usize = 16;
    const DECLINED: usize = 4;

    let h = TestHarness::new(ParticipantOutcomes::new(
        ScriptedOutcome::new([false; DECLINED], true),
        FixedOutcome::success(),
        FixedOutcome::success(),
    ));

    let results: Vec<(Order, Option<SagaOutcome>)> = thread::scope(|scope| {
        let workers: Vec<_> = (0..ORDERS)
            .map(|_| {
                scope.spawn(|| {
                    let mut order = Order::new();
                    let mut handle = h.saga.create_order(&mut order).unwrap();
                    (order, handle.try_outcome())
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    let mut cancelled = 0;
    for (order, outcome) in &results {
        let id = order.id();
        match outcome {
            Some(SagaOutcome::Completed) => {
                assert_eq!(h.compensations(order), [0, 0, 0]);
                assert_eq!(h.recorder.count(EventKind::OrderCancelled, id), 0);
                assert_eq!(h.saga.order_status(order), Some(OrderStatus::Completed));
            }
            Some(SagaOutcome::Cancelled { failed }) => {
                cancelled += 1;
                assert_eq!(*failed, EventKind::PaymentProcessed);
                assert_eq!(h.compensations(order), [1, 1, 1]);
                assert_eq!(h.recorder.count(EventKind::OrderCancelled, id), 1);
                assert_eq!(h.saga.order_status(order), Some(OrderStatus::Cancelled));
            }
            other => panic!("unexpected outcome {other:?} for {id}"),
        }
        assert_eq!(h.recorder.count(EventKind::OrderCreated, id), 1);
    }
    assert_eq!(cancelled, DECLINED);
}

#[test]
fn test_shared_types_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    fn assert_send<T: Send>() {}

    assert_send_sync::<Choreography>();
    assert_send_sync::<OrderParticipant>();
    assert_send_sync::<PaymentParticipant>();
    assert_send_sync::<InventoryParticipant>();
    assert_send_sync::<ShippingParticipant>();
    assert_send_sync::<ParticipantOutcomes>();
    assert_send_sync::<ActionLedger>();
    assert_send_sync::<EventChannel>();
    assert_send_sync::<EventRecorder>();
    assert_send_sync::<ChoreographyError>();
    assert_send::<SagaHandle>();
}

#[test]
fn test_observations_carry_correlation_id() {
    let h = TestHarness::with_failures(false, true, true);
    let mut order = Order::new();
    h.saga.create_order(&mut order).unwrap();

    assert_eq!(
        h.observer.trail(order.id()),
        vec![
            ("order", "StepAttempted"),
            ("payment", "StepAttempted"),
            ("payment", "StepFailed"),
            ("order", "SagaFailed"),
            ("payment", "CompensationInvoked"),
            ("inventory", "CompensationInvoked"),
            ("shipping", "CompensationInvoked"),
        ]
    );
    assert!(
        h.observer
            .observations()
            .iter()
            .all(|o| o.correlation_id == order.id())
    );
}

#[tokio::test]
async fn test_run_order_waits_for_completion() {
    let h = TestHarness::new(ParticipantOutcomes::always_succeed());
    let mut order = Order::new();

    let outcome = h
        .saga
        .run_order(&mut order, Duration::from_millis(100))
        .await
        .unwrap();

    assert_eq!(outcome, SagaOutcome::Completed);
}

#[tokio::test]
async fn test_stalled_saga_times_out_and_is_compensated() {
    // No shipping participant: the saga stalls after INVENTORY_RESERVED.
    let channel = EventChannel::shared();
    let sink: Arc<dyn EventSink> = channel.clone();
    let recorder = EventRecorder::attach_all(channel.as_ref());
    let observer = Arc::new(RecordingObserver::new());
    let order_participant = OrderParticipant::new(sink.clone(), observer.clone());
    let payment = PaymentParticipant::new(
        sink.clone(),
        Arc::new(FixedOutcome::success()),
        observer.clone(),
    );
    let inventory =
        InventoryParticipant::new(sink, Arc::new(FixedOutcome::success()), observer.clone());

    let mut order = Order::new();
    let mut handle = order_participant.create_order(&mut order).unwrap();

    let err = handle.wait(Duration::from_millis(20)).await.unwrap_err();
    assert!(matches!(err, ChoreographyError::Timeout { order_id, .. } if order_id == order.id()));

    assert!(order_participant.abandon(order.id()));
    assert!(!order_participant.abandon(order.id()));

    assert_eq!(recorder.count(EventKind::OrderCancelled, order.id()), 1);
    assert_eq!(payment.ledger().compensation_count(order.id()), 1);
    assert_eq!(inventory.ledger().compensation_count(order.id()), 1);
    assert_eq!(
        order_participant.order_status(order.id()),
        Some(OrderStatus::Cancelled)
    );
}

#[tokio::test]
async fn test_run_order_deadline_cancels_and_compensates() {
    // SHIPPING_SCHEDULED never reaches the order participant.
    let (h, sink) = TestHarness::holding(EventKind::ShippingScheduled);
    let mut order = Order::new();

    let outcome = h
        .saga
        .run_order(&mut order, Duration::from_millis(20))
        .await
        .unwrap();

    assert_eq!(outcome, SagaOutcome::TimedOut);
    assert_eq!(sink.held(), 1);
    assert_eq!(h.saga.order_status(&order), Some(OrderStatus::Cancelled));
    assert_eq!(h.compensations(&order), [1, 1, 1]);
    assert_eq!(h.recorder.count(EventKind::OrderCancelled, order.id()), 1);
    assert!(h.observer.trail(order.id()).contains(&("order", "SagaFailed")));
}

#[tokio::test]
async fn test_late_forward_event_after_deadline_is_not_acted_on() {
    let (h, sink) = TestHarness::holding(EventKind::InventoryReserved);
    let mut order = Order::new();
    let id = order.id();

    let outcome = h
        .saga
        .run_order(&mut order, Duration::from_millis(20))
        .await
        .unwrap();
    assert_eq!(outcome, SagaOutcome::TimedOut);
    assert_eq!(
        h.saga.shipping().ledger().actions(id),
        vec![LocalAction::ShipmentCancelled]
    );

    // The held INVENTORY_RESERVED finally arrives.
    sink.release();

    assert_eq!(h.recorder.count(EventKind::InventoryReserved, id), 1);
    assert_eq!(
        h.saga.shipping().ledger().actions(id),
        vec![LocalAction::ShipmentCancelled]
    );
    assert_eq!(h.recorder.count(EventKind::ShippingScheduled, id), 0);
    assert_eq!(h.recorder.count(EventKind::OrderCancelled, id), 1);
    assert_eq!(h.saga.order_status(&order), Some(OrderStatus::Cancelled));
    assert_eq!(h.compensations(&order), [1, 1, 1]);
}

#[test]
fn test_forget_releases_finished_orders_only() {
    let h = TestHarness::with_failures(true, false, true);
    let mut order = Order::new();
    h.saga.create_order(&mut order).unwrap();
    assert_eq!(h.compensations(&order), [1, 1, 1]);

    assert!(h.saga.forget(&order));

    assert_eq!(h.saga.order_status(&order), None);
    assert!(h.saga.inventory().ledger().actions(order.id()).is_empty());
    assert_eq!(h.compensations(&order), [0, 0, 0]);
    assert!(!h.saga.forget(&order));
}

#[test]
fn test_forget_keeps_in_flight_orders() {
    let (h, _sink) = TestHarness::holding(EventKind::ShippingScheduled);
    let mut order = Order::new();
    let mut handle = h.saga.create_order(&mut order).unwrap();
    assert_eq!(handle.try_outcome(), None);

    assert!(!h.saga.forget(&order));

    assert_eq!(h.saga.order_status(&order), Some(OrderStatus::Pending));
    assert_eq!(
        h.saga.shipping().ledger().actions(order.id()),
        vec![LocalAction::Scheduled]
    );
}
