//! Observation hook for saga state transitions.
//!
//! Every transition a coordinator or participant goes through is reported
//! to a [`SagaObserver`] tagged with the order's correlation id, which is
//! enough to rebuild one saga's history from a mixed stream.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::OrderId;

/// What happened at a stage of the saga.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ObservationKind {
    /// A forward action is about to run.
    StepAttempted,
    /// A forward action succeeded.
    StepSucceeded,
    /// A forward action failed.
    StepFailed,
    /// A compensating action ran.
    CompensationInvoked,
    /// A compensating action reported that it could not undo its step.
    CompensationFailed { reason: String },
    /// Every forward action succeeded.
    SagaSucceeded,
    /// The saga failed and compensation has run.
    SagaFailed,
}

impl ObservationKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationKind::StepAttempted => "StepAttempted",
            ObservationKind::StepSucceeded => "StepSucceeded",
            ObservationKind::StepFailed => "StepFailed",
            ObservationKind::CompensationInvoked => "CompensationInvoked",
            ObservationKind::CompensationFailed { .. } => "CompensationFailed",
            ObservationKind::SagaSucceeded => "SagaSucceeded",
            ObservationKind::SagaFailed => "SagaFailed",
        }
    }
}

/// A single observed transition.
#[derive(Debug, Clone, Serialize)]
pub struct SagaObservation {
    /// The order the saga is working on.
    pub correlation_id: OrderId,
    /// The step or participant that produced the observation.
    pub stage: &'static str,
    /// What happened.
    pub kind: ObservationKind,
    /// When it was observed.
    pub at: DateTime<Utc>,
}

impl SagaObservation {
    /// Creates an observation stamped with the current time.
    pub fn new(correlation_id: OrderId, stage: &'static str, kind: ObservationKind) -> Self {
        Self {
            correlation_id,
            stage,
            kind,
            at: Utc::now(),
        }
    }
}

/// Receives saga observations.
pub trait SagaObserver: Send + Sync {
    /// Called once per transition, synchronously, on the thread making it.
    fn observe(&self, observation: &SagaObservation);
}

/// Discards every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SagaObserver for NoopObserver {
    fn observe(&self, _observation: &SagaObservation) {}
}

/// Emits each observation as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl SagaObserver for TracingObserver {
    fn observe(&self, observation: &SagaObservation) {
        let correlation_id = observation.correlation_id;
        let stage = observation.stage;
        match &observation.kind {
            ObservationKind::CompensationFailed { reason } => {
                tracing::error!(%correlation_id, stage, %reason, "compensation failed");
            }
            ObservationKind::StepFailed | ObservationKind::SagaFailed => {
                tracing::warn!(
                    %correlation_id,
                    stage,
                    kind = observation.kind.as_str(),
                    "saga transition"
                );
            }
            kind => {
                tracing::info!(%correlation_id, stage, kind = kind.as_str(), "saga transition");
            }
        }
    }
}

/// Keeps every observation in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    observations: Mutex<Vec<SagaObservation>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn observations(&self) -> Vec<SagaObservation> {
        self.observations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Returns the observations for one correlation id.
    pub fn for_order(&self, order_id: OrderId) -> Vec<SagaObservation> {
        self.observations()
            .into_iter()
            .filter(|o| o.correlation_id == order_id)
            .collect()
    }

    /// Returns `(stage, kind)` pairs for one correlation id, for compact assertions.
    pub fn trail(&self, order_id: OrderId) -> Vec<(&'static str, &'static str)> {
        self.for_order(order_id)
            .iter()
            .map(|o| (o.stage, o.kind.as_str()))
            .collect()
    }
}

impl SagaObserver for RecordingObserver {
    fn observe(&self, observation: &SagaObservation) {
        self.observations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(observation.clone());
    }
}
