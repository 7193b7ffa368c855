//! Order error types.

use common::{OrderId, ProductId};
use inventory::{InventoryError, ItemFailure};
use thiserror::Error;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// A referenced product has no inventory row.
    #[error("inventory not found for product {0}")]
    ProductNotFound(ProductId),

    /// A referenced product has fewer units available than requested.
    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: i64,
    },

    /// The order does not exist.
    #[error("order not found: {0}")]
    NotFound(OrderId),

    /// The requester is neither the order's owner nor an admin.
    #[error("not allowed to view this order")]
    Forbidden,

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<InventoryError> for OrderError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Validation(msg) => OrderError::Validation(msg),
            InventoryError::ProductNotFound(product_id) => OrderError::ProductNotFound(product_id),
            InventoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            // The workflow uses the single-item debit path, which reports
            // its first failure directly rather than batching.
            InventoryError::ReservationRejected(failures) => match failures.into_iter().next() {
                Some(ItemFailure::NotFound { product_id }) => {
                    OrderError::ProductNotFound(product_id)
                }
                Some(ItemFailure::InsufficientStock {
                    product_id,
                    requested_quantity,
                    available_quantity,
                }) => OrderError::InsufficientStock {
                    product_id,
                    requested: requested_quantity,
                    available: available_quantity,
                },
                None => OrderError::Validation("empty reservation batch".to_string()),
            },
            InventoryError::Database(err) => OrderError::Database(err),
        }
    }
}

/// Result type for order operations.
pub type Result<T> = std::result::Result<T, OrderError>;
