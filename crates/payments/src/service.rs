//! Standalone payment initiation against a persisted order.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Identity, Money, OrderId, PaymentId, PaymentStatus, UserId};
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::error::{PaymentError, Result};
use crate::events::{EventPublisher, PaymentEvent};
use crate::simulator::{ChargeOutcome, ChargeRequest, ForcedOutcome, PaymentGateway};

const DEFAULT_METHOD: &str = "CARD";

/// Request to initiate a payment for an existing order.
#[derive(Debug, Clone)]
pub struct InitiatePayment {
    pub order_id: OrderId,
    pub amount: Money,
    pub payment_method: Option<String>,
    pub simulate: Option<ForcedOutcome>,
}

/// A persisted payment attempt.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub provider_reference: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Service recording payment attempts against orders.
#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    events: EventPublisher,
}

impl PaymentService {
    /// Creates a new payment service.
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>, events: EventPublisher) -> Self {
        Self {
            pool,
            gateway,
            events,
        }
    }

    /// Initiates a payment: records a pending attempt, charges the
    /// gateway, and finalizes the row — all in one transaction. The
    /// outcome event is published after commit.
    ///
    /// Only the order's owner or an admin may pay for it. The amount is
    /// not required to match the order total.
    #[tracing::instrument(skip(self, identity, request), fields(order_id = %request.order_id))]
    pub async fn initiate(
        &self,
        identity: &Identity,
        request: InitiatePayment,
    ) -> Result<PaymentRecord> {
        if request.amount.cents() <= 0 {
            return Err(PaymentError::Validation(
                "amount must be a positive number".to_string(),
            ));
        }
        let method = request
            .payment_method
            .unwrap_or_else(|| DEFAULT_METHOD.to_string());

        let mut tx = self.pool.begin().await?;

        let order_row = sqlx::query("SELECT user_id FROM orders WHERE id = $1")
            .bind(request.order_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(order_row) = order_row else {
            return Err(PaymentError::OrderNotFound(request.order_id));
        };
        let owner = UserId::from_uuid(order_row.try_get("user_id")?);
        if !identity.can_access(owner) {
            return Err(PaymentError::Forbidden);
        }

        let payment_id = PaymentId::new();
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO payments (id, order_id, amount_cents, status, payment_method)
            VALUES ($1, $2, $3, 'PENDING', $4)
            RETURNING created_at
            "#,
        )
        .bind(payment_id.as_uuid())
        .bind(request.order_id.as_uuid())
        .bind(request.amount.cents())
        .bind(&method)
        .fetch_one(&mut *tx)
        .await?;

        let outcome = self
            .gateway
            .charge(&ChargeRequest {
                payment_id,
                order_id: request.order_id,
                amount: request.amount,
                method: method.clone(),
                forced: request.simulate,
            })
            .await;

        let status = outcome.status();
        let (provider_reference, error_message) = match &outcome {
            ChargeOutcome::Completed { provider_reference } => {
                (Some(provider_reference.clone()), None)
            }
            ChargeOutcome::Failed { error_message } => (None, Some(error_message.clone())),
        };

        sqlx::query(
            r#"
            UPDATE payments
            SET status = $1, provider_reference = $2, error_message = $3
            WHERE id = $4
            "#,
        )
        .bind(status.as_str())
        .bind(&provider_reference)
        .bind(&error_message)
        .bind(payment_id.as_uuid())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        match status {
            PaymentStatus::Completed => {
                metrics::counter!("payments_completed_total").increment(1)
            }
            _ => metrics::counter!("payments_failed_total").increment(1),
        }

        self.events.publish(PaymentEvent::from_outcome(
            payment_id,
            request.order_id,
            request.amount,
            method.clone(),
            status,
            provider_reference.clone(),
            error_message.clone(),
        ));

        Ok(PaymentRecord {
            id: payment_id,
            order_id: request.order_id,
            amount: request.amount,
            status,
            payment_method: method,
            provider_reference,
            error_message,
            created_at,
        })
    }
}
