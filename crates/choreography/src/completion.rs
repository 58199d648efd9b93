//! Per-saga completion signal.
//!
//! Participants only talk through events, so nothing returns a value when a
//! choreographed saga ends. The order participant resolves one of these
//! handles when it sees the saga's terminal event, and the caller waits on
//! it with a deadline.

use std::time::Duration;

use common::OrderId;
use event_channel::EventKind;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::{ChoreographyError, Result};

/// How a choreographed saga ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SagaOutcome {
    /// Shipping was scheduled; every participant finished its forward action.
    Completed,
    /// A participant reported `failed`; ORDER_CANCELLED was broadcast and
    /// compensations ran before this outcome was delivered.
    Cancelled { failed: EventKind },
    /// The saga missed its deadline and was cancelled by the caller.
    TimedOut,
}

impl SagaOutcome {
    /// Returns true if the saga completed.
    pub fn is_completed(&self) -> bool {
        matches!(self, SagaOutcome::Completed)
    }
}

pub(crate) type CompletionSender = oneshot::Sender<SagaOutcome>;

/// Waits for one saga instance to finish.
#[derive(Debug)]
pub struct SagaHandle {
    order_id: OrderId,
    receiver: oneshot::Receiver<SagaOutcome>,
}

impl SagaHandle {
    pub(crate) fn new(order_id: OrderId) -> (CompletionSender, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { order_id, receiver })
    }

    /// Returns the order this handle tracks.
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Returns the outcome if the saga has already finished.
    pub fn try_outcome(&mut self) -> Option<SagaOutcome> {
        self.receiver.try_recv().ok()
    }

    /// Waits up to `timeout` for the saga to finish.
    pub async fn wait(&mut self, timeout: Duration) -> Result<SagaOutcome> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(ChoreographyError::CompletionDropped(self.order_id)),
            Err(_) => Err(ChoreographyError::Timeout {
                order_id: self.order_id,
                waited: timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_returns_sent_outcome() {
        let (sender, mut handle) = SagaHandle::new(OrderId::new());
        sender.send(SagaOutcome::Completed).unwrap();
        let outcome = handle.wait(Duration::from_millis(10)).await.unwrap();
        assert!(outcome.is_completed());
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let order_id = OrderId::new();
        let (_sender, mut handle) = SagaHandle::new(order_id);
        let err = handle.wait(Duration::from_millis(5)).await.unwrap_err();
        assert_eq!(
            err,
            ChoreographyError::Timeout {
                order_id,
                waited: Duration::from_millis(5)
            }
        );
    }

    #[tokio::test]
    async fn test_dropped_sender_is_reported() {
        let order_id = OrderId::new();
        let (sender, mut handle) = SagaHandle::new(order_id);
        drop(sender);
        let err = handle.wait(Duration::from_millis(10)).await.unwrap_err();
        assert_eq!(err, ChoreographyError::CompletionDropped(order_id));
    }

    #[test]
    fn test_try_outcome_before_and_after() {
        let (sender, mut handle) = SagaHandle::new(OrderId::new());
        assert_eq!(handle.try_outcome(), None);
        sender
            .send(SagaOutcome::Cancelled {
                failed: EventKind::PaymentProcessed,
            })
            .unwrap();
        assert_eq!(
            handle.try_outcome(),
            Some(SagaOutcome::Cancelled {
                failed: EventKind::PaymentProcessed
            })
        );
    }
}
