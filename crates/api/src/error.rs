//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use inventory::{InventoryError, ItemFailure};
use orders::OrderError;
use payments::PaymentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or invalid credentials.
    Unauthorized(String),
    /// Valid credentials, insufficient rights.
    Forbidden(String),
    /// Resource not found.
    NotFound(String),
    /// An all-or-nothing reservation batch was rejected.
    ReservationFailed(Vec<ItemFailure>),
    /// Internal server error; detail is logged, not returned.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ReservationFailed(failures) => {
                let body = serde_json::json!({
                    "error": "Failed to reserve stock for one or more items",
                    "failed_items": failures,
                });
                (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
            }
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                let body = serde_json::json!({ "error": "Internal server error" });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
            }
            other => {
                let (status, message) = match other {
                    ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
                    ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
                    ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
                    ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
                    ApiError::ReservationFailed(_) | ApiError::Internal(_) => unreachable!(),
                };
                let body = serde_json::json!({ "error": message });
                (status, axum::Json(body)).into_response()
            }
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Validation(_) => ApiError::BadRequest(err.to_string()),
            InventoryError::ProductNotFound(_) | InventoryError::InsufficientStock { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            InventoryError::ReservationRejected(failures) => ApiError::ReservationFailed(failures),
            InventoryError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(_)
            | OrderError::ProductNotFound(_)
            | OrderError::InsufficientStock { .. } => ApiError::BadRequest(err.to_string()),
            OrderError::NotFound(_) => ApiError::NotFound(err.to_string()),
            OrderError::Forbidden => ApiError::Forbidden(err.to_string()),
            OrderError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(_) => ApiError::BadRequest(err.to_string()),
            PaymentError::OrderNotFound(_) => ApiError::NotFound(err.to_string()),
            PaymentError::Forbidden => ApiError::Forbidden(err.to_string()),
            PaymentError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}
