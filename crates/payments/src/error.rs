//! Payment error types.

use common::OrderId;
use thiserror::Error;

/// Errors that can occur when initiating a payment.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// The referenced order does not exist.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The requester is neither the order's owner nor an admin.
    #[error("not allowed to pay for this order")]
    Forbidden,

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for payment operations.
pub type Result<T> = std::result::Result<T, PaymentError>;
