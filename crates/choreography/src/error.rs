//! Choreography error types.

use std::time::Duration;

use common::OrderId;
use thiserror::Error;

/// Errors that can occur when starting or awaiting a choreographed saga.
#[derive(Debug, Error, PartialEq)]
pub enum ChoreographyError {
    /// The order already has a saga in flight or finished.
    #[error("Saga already started for order {0}")]
    AlreadyStarted(OrderId),

    /// The saga did not reach a terminal event before the deadline.
    #[error("Saga for order {order_id} did not finish within {waited:?}")]
    Timeout { order_id: OrderId, waited: Duration },

    /// The order participant went away without reporting an outcome.
    #[error("Saga for order {0} was abandoned before completing")]
    CompletionDropped(OrderId),
}

/// Convenience type alias for choreography results.
pub type Result<T> = std::result::Result<T, ChoreographyError>;
