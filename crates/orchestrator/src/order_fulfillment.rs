//! Order fulfillment saga steps.

use std::sync::Arc;

use common::{FixedOutcome, OrderStatus, OutcomeSource};

use crate::context::SagaContext;
use crate::error::CompensationError;
use crate::step::{SagaStep, StepOutcome};

/// Step name: Move the order into processing.
pub const STEP_CREATE_ORDER: &str = "create_order";

/// Step name: Reserve inventory for the order.
pub const STEP_RESERVE_INVENTORY: &str = "reserve_inventory";

/// Step name: Process payment for the order.
pub const STEP_PROCESS_PAYMENT: &str = "process_payment";

/// Step name: Ship the order.
pub const STEP_SCHEDULE_SHIPPING: &str = "schedule_shipping";

/// The participant a fulfillment step acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    CreateOrder,
    ReserveInventory,
    ProcessPayment,
    ScheduleShipping,
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            StepKind::CreateOrder => STEP_CREATE_ORDER,
            StepKind::ReserveInventory => STEP_RESERVE_INVENTORY,
            StepKind::ProcessPayment => STEP_PROCESS_PAYMENT,
            StepKind::ScheduleShipping => STEP_SCHEDULE_SHIPPING,
        }
    }
}

/// A fulfillment step: one [`StepKind`] plus the outcome sources standing
/// in for the external system behind it.
///
/// Status effects:
/// - `CreateOrder`: execute → `Pending`, compensate → `Cancelled`
/// - `ScheduleShipping`: execute → `Shipped`, compensate → `ShippingCancelled`
/// - inventory and payment leave the status alone
#[derive(Clone)]
pub struct FulfillmentStep {
    kind: StepKind,
    outcome: Arc<dyn OutcomeSource>,
    undo: Arc<dyn OutcomeSource>,
}

impl FulfillmentStep {
    /// Creates a step whose forward action succeeds when `outcome` says so.
    /// Its compensation always succeeds.
    pub fn new(kind: StepKind, outcome: Arc<dyn OutcomeSource>) -> Self {
        Self {
            kind,
            outcome,
            undo: Arc::new(FixedOutcome::success()),
        }
    }

    /// Creates a step whose forward action always succeeds.
    pub fn reliable(kind: StepKind) -> Self {
        Self::new(kind, Arc::new(FixedOutcome::success()))
    }

    /// Makes the compensation fail whenever `undo` says so.
    pub fn with_compensation_outcome(mut self, undo: Arc<dyn OutcomeSource>) -> Self {
        self.undo = undo;
        self
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }
}

impl std::fmt::Debug for FulfillmentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FulfillmentStep")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<P> SagaStep<P> for FulfillmentStep {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn execute(&self, context: &mut SagaContext<P>) -> StepOutcome {
        let order_id = context.id();
        match self.kind {
            StepKind::CreateOrder => {
                tracing::info!(%order_id, status = %context.status(), "creating order");
                context.set_status(OrderStatus::Pending);
            }
            StepKind::ReserveInventory => {
                tracing::info!(%order_id, "reserving inventory");
            }
            StepKind::ProcessPayment => {
                tracing::info!(%order_id, "processing payment");
            }
            StepKind::ScheduleShipping => {
                tracing::info!(%order_id, "shipping order");
            }
        }

        let outcome = StepOutcome::from(self.outcome.decide());
        if outcome.is_success() && self.kind == StepKind::ScheduleShipping {
            context.set_status(OrderStatus::Shipped);
        }
        outcome
    }

    fn compensate(&self, context: &mut SagaContext<P>) -> Result<(), CompensationError> {
        let order_id = context.id();
        match self.kind {
            StepKind::CreateOrder => tracing::info!(%order_id, "cancelling order"),
            StepKind::ReserveInventory => tracing::info!(%order_id, "releasing inventory"),
            StepKind::ProcessPayment => tracing::info!(%order_id, "refunding payment"),
            StepKind::ScheduleShipping => tracing::info!(%order_id, "cancelling shipment"),
        }

        if !self.undo.decide() {
            return Err(CompensationError::new(
                self.kind.name(),
                "external system rejected the undo",
            ));
        }

        match self.kind {
            StepKind::CreateOrder => context.set_status(OrderStatus::Cancelled),
            StepKind::ScheduleShipping => context.set_status(OrderStatus::ShippingCancelled),
            StepKind::ReserveInventory | StepKind::ProcessPayment => {}
        }
        Ok(())
    }
}

/// Outcome sources for the four fulfillment steps.
#[derive(Clone)]
pub struct FulfillmentOutcomes {
    pub order: Arc<dyn OutcomeSource>,
    pub inventory: Arc<dyn OutcomeSource>,
    pub payment: Arc<dyn OutcomeSource>,
    pub shipping: Arc<dyn OutcomeSource>,
}

impl FulfillmentOutcomes {
    pub fn new(
        order: impl OutcomeSource + 'static,
        inventory: impl OutcomeSource + 'static,
        payment: impl OutcomeSource + 'static,
        shipping: impl OutcomeSource + 'static,
    ) -> Self {
        Self {
            order: Arc::new(order),
            inventory: Arc::new(inventory),
            payment: Arc::new(payment),
            shipping: Arc::new(shipping),
        }
    }

    /// Order creation and shipping always succeed; inventory and payment
    /// come from the given sources.
    pub fn with_external(
        inventory: impl OutcomeSource + 'static,
        payment: impl OutcomeSource + 'static,
    ) -> Self {
        Self::new(
            FixedOutcome::success(),
            inventory,
            payment,
            FixedOutcome::success(),
        )
    }

    /// Every step succeeds.
    pub fn always_succeed() -> Self {
        Self::with_external(FixedOutcome::success(), FixedOutcome::success())
    }
}

/// Builds the fulfillment plan: order → inventory → payment → shipping.
pub fn fulfillment_plan(outcomes: FulfillmentOutcomes) -> Vec<FulfillmentStep> {
    vec![
        FulfillmentStep::new(StepKind::CreateOrder, outcomes.order),
        FulfillmentStep::new(StepKind::ReserveInventory, outcomes.inventory),
        FulfillmentStep::new(StepKind::ProcessPayment, outcomes.payment),
        FulfillmentStep::new(StepKind::ScheduleShipping, outcomes.shipping),
    ]
}
