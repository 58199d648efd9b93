//! Choreography-based order saga.
//!
//! There is no coordinator. Each participant subscribes to the events it
//! cares about and reacts on its own:
//!
//! ```text
//! ORDER_CREATED ──► payment ──► PAYMENT_PROCESSED ──► inventory ──► INVENTORY_RESERVED
//!                                                                         │
//!                      order ◄── SHIPPING_SCHEDULED ◄── shipping ◄────────┘
//! ```
//!
//! Any result published with `success = false` makes the order participant
//! broadcast ORDER_CANCELLED once; payment, inventory and shipping each
//! compensate once in response and publish nothing further.

pub mod completion;
pub mod error;
pub mod ledger;
pub mod saga;
pub mod services;

pub use completion::{SagaHandle, SagaOutcome};
pub use error::{ChoreographyError, Result};
pub use ledger::{ActionLedger, LocalAction};
pub use saga::{Choreography, ParticipantOutcomes};
pub use services::{
    InventoryParticipant, Order, OrderParticipant, Participant, PaymentParticipant,
    ShippingParticipant,
};
