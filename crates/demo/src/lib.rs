//! Demo wiring for both saga topologies.

pub mod config;

use std::sync::Arc;

use choreography::{Choreography, ChoreographyError, Order, ParticipantOutcomes, SagaOutcome};
use common::{OrderId, OrderStatus, OutcomeError, SeededOutcome, TracingObserver};
use event_channel::{Event, EventChannel, EventRecorder};
use orchestrator::{FulfillmentOutcomes, OrderSaga, SagaContext, SagaRun};
use serde::Serialize;
use thiserror::Error;

pub use config::{Config, ConfigError, LogFormat};

/// Errors that can stop the demo.
#[derive(Debug, Error)]
pub enum DemoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Outcome source error: {0}")]
    Outcome(#[from] OutcomeError),

    #[error("Choreography error: {0}")]
    Choreography(#[from] ChoreographyError),
}

/// Convenience type alias for demo results.
pub type Result<T> = std::result::Result<T, DemoError>;

/// What one choreographed order went through.
#[derive(Debug, Clone, Serialize)]
pub struct ChoreographyReport {
    pub order_id: OrderId,
    pub outcome: SagaOutcome,
    pub status: Option<OrderStatus>,
    pub events: Vec<Event>,
}

/// What one orchestrated order went through.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationReport {
    pub order_id: OrderId,
    pub items: Vec<String>,
    pub status: OrderStatus,
    pub run: SagaRun,
}

/// Runs one order through the choreographed saga.
#[tracing::instrument(skip(config))]
pub async fn run_choreography(config: &Config, seed: u64) -> Result<ChoreographyReport> {
    let channel = EventChannel::shared();
    let recorder = EventRecorder::attach_all(channel.as_ref());
    let outcomes = ParticipantOutcomes::new(
        SeededOutcome::new(seed, config.payment_success_rate)?,
        SeededOutcome::new(seed.wrapping_add(1), config.inventory_success_rate)?,
        SeededOutcome::new(seed.wrapping_add(2), config.shipping_success_rate)?,
    );
    let saga = Choreography::new(channel, outcomes, Arc::new(TracingObserver));

    let mut order = config.order_id.map_or_else(Order::new, Order::with_id);
    let outcome = saga.run_order(&mut order, config.saga_timeout).await?;

    Ok(ChoreographyReport {
        order_id: order.id(),
        outcome,
        status: saga.order_status(&order),
        events: recorder.events_for(order.id()),
    })
}

/// Runs one order through the orchestrated saga.
#[tracing::instrument(skip(config))]
pub fn run_orchestration(config: &Config, seed: u64) -> Result<OrchestrationReport> {
    let saga = OrderSaga::order_fulfillment(FulfillmentOutcomes::with_external(
        SeededOutcome::new(seed, config.orchestrated_inventory_success_rate)?,
        SeededOutcome::new(seed.wrapping_add(1), config.orchestrated_payment_success_rate)?,
    ));

    let items = vec!["Item1".to_string(), "Item2".to_string()];
    let mut context = SagaContext::new(config.order_id.unwrap_or_default(), items);
    let run = saga.run(&mut context);

    Ok(OrchestrationReport {
        order_id: context.id(),
        status: context.status(),
        items: context.into_payload(),
        run,
    })
}
