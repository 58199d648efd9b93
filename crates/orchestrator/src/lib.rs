//! Orchestration-based order saga.
//!
//! An [`Orchestrator`] holds a fixed, ordered plan of [`SagaStep`]s and
//! drives a [`SagaContext`] through it:
//! 1. Create order
//! 2. Reserve inventory
//! 3. Process payment
//! 4. Schedule shipping
//!
//! If any step fails, previously completed steps are compensated in reverse
//! order and the run reports failure.

pub mod context;
pub mod error;
pub mod order_fulfillment;
pub mod orchestrator;
pub mod step;

pub use context::SagaContext;
pub use error::CompensationError;
pub use order_fulfillment::{FulfillmentOutcomes, FulfillmentStep, StepKind, fulfillment_plan};
pub use orchestrator::{DeadLetter, Orchestrator, RunState, SagaRun};
pub use step::{SagaStep, StepOutcome};

/// The order fulfillment saga.
pub type OrderSaga = Orchestrator<FulfillmentStep>;

impl OrderSaga {
    /// Builds the fulfillment orchestrator with the given outcome sources.
    pub fn order_fulfillment(outcomes: FulfillmentOutcomes) -> Self {
        Orchestrator::new(fulfillment_plan(outcomes))
    }
}
