//! Payment simulation for the order-fulfillment system.
//!
//! [`PaymentGateway`] models an unreliable external processor without
//! requiring one: outcomes are deterministic when forced and otherwise
//! drawn with a fixed success probability. [`PaymentService`] is the
//! standalone payment-initiation path; completed and failed attempts are
//! announced through the fire-and-forget [`EventPublisher`].

pub mod error;
pub mod events;
pub mod service;
pub mod simulator;

pub use error::PaymentError;
pub use events::{EventPublisher, PaymentEvent};
pub use service::{InitiatePayment, PaymentRecord, PaymentService};
pub use simulator::{
    ChargeOutcome, ChargeRequest, FixedGateway, ForcedOutcome, PaymentGateway, SimulatedGateway,
};
