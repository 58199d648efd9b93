use thiserror::Error;

/// Errors raised while building shared saga components.
#[derive(Debug, Error, PartialEq)]
pub enum OutcomeError {
    /// A success rate outside `0.0..=1.0`.
    #[error("Invalid success rate {0}: must be between 0.0 and 1.0")]
    InvalidRate(f64),
}

/// Errors raised while parsing a caller-supplied [`OrderId`](crate::OrderId).
#[derive(Debug, Error)]
pub enum OrderIdError {
    /// The text is not a UUID.
    #[error("Invalid order id {input:?}: {source}")]
    Malformed {
        input: String,
        #[source]
        source: uuid::Error,
    },

    /// The nil UUID never identifies an order.
    #[error("Invalid order id: the nil UUID is reserved")]
    Nil,
}
