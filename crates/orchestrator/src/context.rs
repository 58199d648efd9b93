//! Saga context shared by the steps of one run.

use common::{OrderId, OrderStatus};

/// The unit of work a saga run operates on.
///
/// `id` is fixed at construction. `status` records only the last transition
/// a step made; it is for observers and never drives the orchestrator,
/// whose decisions come from step outcomes alone.
///
/// A context must be driven by one run at a time. Runs take it by `&mut`,
/// so overlapping runs on the same context do not compile.
#[derive(Debug, Clone, PartialEq)]
pub struct SagaContext<P> {
    id: OrderId,
    payload: P,
    status: OrderStatus,
}

impl<P> SagaContext<P> {
    /// Creates a context in `Created` status.
    pub fn new(id: OrderId, payload: P) -> Self {
        Self {
            id,
            payload,
            status: OrderStatus::Created,
        }
    }

    /// Creates a context with a fresh id.
    pub fn for_payload(payload: P) -> Self {
        Self::new(OrderId::new(), payload)
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Records a status transition.
    pub fn set_status(&mut self, status: OrderStatus) {
        tracing::debug!(
            order_id = %self.id,
            from = %self.status,
            to = %status,
            "status transition"
        );
        self.status = status;
    }

    /// Consumes the context, returning the payload.
    pub fn into_payload(self) -> P {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_starts_created() {
        let id = OrderId::new();
        let ctx = SagaContext::new(id, vec!["Item1", "Item2"]);
        assert_eq!(ctx.id(), id);
        assert_eq!(ctx.status(), OrderStatus::Created);
        assert_eq!(ctx.payload().len(), 2);
    }

    #[test]
    fn test_status_keeps_only_last_transition() {
        let mut ctx = SagaContext::for_payload(());
        ctx.set_status(OrderStatus::Pending);
        ctx.set_status(OrderStatus::Shipped);
        ctx.set_status(OrderStatus::ShippingCancelled);
        assert_eq!(ctx.status(), OrderStatus::ShippingCancelled);
    }

    #[test]
    fn test_payload_is_mutable() {
        let mut ctx = SagaContext::for_payload(vec![1]);
        ctx.payload_mut().push(2);
        assert_eq!(ctx.into_payload(), vec![1, 2]);
    }
}
