//! Inventory error types.

use common::ProductId;
use thiserror::Error;

use crate::ledger::ItemFailure;

/// Errors that can occur during inventory operations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// No inventory row exists for the product.
    #[error("inventory not found for product {0}")]
    ProductNotFound(ProductId),

    /// The product has fewer units available than requested.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// An all-or-nothing reservation batch was rejected; no balances changed.
    #[error("failed to reserve stock for {} item(s)", .0.len())]
    ReservationRejected(Vec<ItemFailure>),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;
