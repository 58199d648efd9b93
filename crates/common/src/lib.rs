//! Shared data model for the saga coordination crates.
//!
//! Both the choreography and the orchestration topologies identify orders
//! by [`OrderId`], track an advisory [`OrderStatus`], decide simulated
//! outcomes through an injected [`OutcomeSource`] and report transitions to
//! a [`SagaObserver`].

pub mod error;
pub mod observe;
pub mod outcome;
pub mod status;
pub mod types;

pub use error::{OrderIdError, OutcomeError};
pub use observe::{
    NoopObserver, ObservationKind, RecordingObserver, SagaObservation, SagaObserver,
    TracingObserver,
};
pub use outcome::{FixedOutcome, OutcomeSource, ScriptedOutcome, SeededOutcome};
pub use status::OrderStatus;
pub use types::OrderId;
