//! Standalone payment initiation endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::{Money, OrderId};
use payments::{ForcedOutcome, InitiatePayment, PaymentRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct InitiatePaymentRequest {
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub payment_method: Option<String>,
    /// Forces the simulated outcome; omitted means the 0.8 draw.
    pub simulate_status: Option<ForcedOutcome>,
}

#[derive(Serialize)]
pub struct PaymentOutcomeResponse {
    pub message: &'static str,
    pub payment: PaymentDetail,
}

#[derive(Serialize)]
pub struct PaymentDetail {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount_cents: i64,
    pub status: String,
    pub payment_method: String,
    pub provider_reference: Option<String>,
    pub error_message: Option<String>,
}

fn record_to_detail(record: PaymentRecord) -> PaymentDetail {
    PaymentDetail {
        id: record.id.as_uuid(),
        order_id: record.order_id.as_uuid(),
        amount_cents: record.amount.cents(),
        status: record.status.to_string(),
        payment_method: record.payment_method,
        provider_reference: record.provider_reference,
        error_message: record.error_message,
    }
}

/// POST /payments — record a payment attempt for an existing order.
#[tracing::instrument(skip(state, user, req))]
pub async fn initiate(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<InitiatePaymentRequest>,
) -> Result<Json<PaymentOutcomeResponse>, ApiError> {
    let record = state
        .payments
        .initiate(
            &user,
            InitiatePayment {
                order_id: OrderId::from_uuid(req.order_id),
                amount: Money::from_cents(req.amount_cents),
                payment_method: req.payment_method,
                simulate: req.simulate_status,
            },
        )
        .await?;

    let message = match record.status {
        common::PaymentStatus::Completed => "Payment completed successfully",
        _ => "Payment failed",
    };

    Ok(Json(PaymentOutcomeResponse {
        message,
        payment: record_to_detail(record),
    }))
}
