//! Shared types for the order-fulfillment system.
//!
//! Typed identifiers, money arithmetic, roles, and the per-request
//! identity context threaded through every workflow call.

pub mod types;

pub use types::{
    AddressId, Identity, Money, OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId, Role,
    StatusParseError, UserId,
};
