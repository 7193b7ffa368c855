//! The distributed checkout workflow.
//!
//! `place_order` runs validation, stock debit, order/item/payment
//! persistence, and status finalization inside a single database
//! transaction, so a failure at any step leaves no partial state. The
//! payment gateway invoked here is in-process, so no external latency is
//! spent while inventory row locks are held. Enrichment and the
//! confirmation notification happen strictly after commit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{
    AddressId, Identity, Money, OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId, UserId,
};
use inventory::ledger;
use payments::{ChargeOutcome, ChargeRequest, PaymentGateway, PaymentRecord};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{OrderError, Result};
use crate::notify::{ConfirmationLine, Notifier, OrderConfirmation};

const WORKFLOW_PAYMENT_METHOD: &str = "SIMULATED";

/// One requested line item. The unit price is captured at order time as a
/// historical snapshot, independent of later catalog changes.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

/// A checkout request.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub shipping_address_id: Option<AddressId>,
    pub items: Vec<NewOrderItem>,
}

/// A persisted line item, enriched with the product name where known.
#[derive(Debug, Clone)]
pub struct PlacedOrderItem {
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

/// The durably recorded result of a checkout.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub shipping_address_id: Option<AddressId>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<PlacedOrderItem>,
    pub payment: PaymentRecord,
}

/// Orchestrates the checkout transaction.
#[derive(Clone)]
pub struct OrderWorkflow {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Notifier,
}

impl OrderWorkflow {
    /// Creates a new workflow over the given pool, gateway, and notifier.
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>, notifier: Notifier) -> Self {
        Self {
            pool,
            gateway,
            notifier,
        }
    }

    /// Places an order for the authenticated user.
    ///
    /// On insufficient stock or an unknown product the transaction is
    /// rolled back and nothing persists. A declined payment commits the
    /// order as `FAILED` with the debited stock restored and the failed
    /// payment attempt recorded (see DESIGN.md for the policy decision).
    #[tracing::instrument(skip(self, identity, order), fields(user_id = %identity.user_id))]
    pub async fn place_order(&self, identity: &Identity, order: NewOrder) -> Result<PlacedOrder> {
        let items = validate_items(&order.items)?;
        let (line_totals, total_amount) = total_amounts(&items)?;

        let order_id = OrderId::new();
        let mut tx = self.pool.begin().await?;

        // Debit stock first, rows locked in ascending product-id order.
        // The first failing item aborts the whole transaction.
        for item in &items {
            ledger::debit_available(&mut tx, item.product_id, item.quantity).await?;
        }

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (id, user_id, status, total_amount_cents, shipping_address_id)
            VALUES ($1, $2, 'PENDING', $3, $4)
            RETURNING created_at
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(identity.user_id.as_uuid())
        .bind(total_amount.cents())
        .bind(order.shipping_address_id.map(|id| id.as_uuid()))
        .fetch_one(&mut *tx)
        .await?;

        for (item, line_total) in items.iter().zip(&line_totals) {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents, line_total_cents)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order_id.as_uuid())
            .bind(item.product_id.as_uuid())
            .bind(i64::from(item.quantity))
            .bind(item.unit_price.cents())
            .bind(line_total.cents())
            .execute(&mut *tx)
            .await?;
        }

        let payment_id = PaymentId::new();
        let outcome = self
            .gateway
            .charge(&ChargeRequest {
                payment_id,
                order_id,
                amount: total_amount,
                method: WORKFLOW_PAYMENT_METHOD.to_string(),
                forced: None,
            })
            .await;

        let payment_status = outcome.status();
        let (provider_reference, error_message) = match &outcome {
            ChargeOutcome::Completed { provider_reference } => {
                (Some(provider_reference.clone()), None)
            }
            ChargeOutcome::Failed { error_message } => (None, Some(error_message.clone())),
        };

        let payment_created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO payments (id, order_id, amount_cents, status, payment_method,
                                  provider_reference, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING created_at
            "#,
        )
        .bind(payment_id.as_uuid())
        .bind(order_id.as_uuid())
        .bind(total_amount.cents())
        .bind(payment_status.as_str())
        .bind(WORKFLOW_PAYMENT_METHOD)
        .bind(&provider_reference)
        .bind(&error_message)
        .fetch_one(&mut *tx)
        .await?;

        let order_status = match payment_status {
            PaymentStatus::Completed => OrderStatus::Confirmed,
            // Declined: restore the debited stock within the same
            // transaction and keep the order as a FAILED record.
            _ => {
                for item in &items {
                    ledger::credit_available(&mut tx, item.product_id, item.quantity).await?;
                }
                OrderStatus::Failed
            }
        };

        sqlx::query("UPDATE orders SET status = $1, updated_at = now() WHERE id = $2")
            .bind(order_status.as_str())
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        match order_status {
            OrderStatus::Confirmed => {
                metrics::counter!("orders_confirmed_total").increment(1);
                tracing::info!(%order_id, total = %total_amount, "order confirmed");
            }
            _ => {
                metrics::counter!("orders_failed_total").increment(1);
                tracing::warn!(%order_id, "order failed: payment declined");
            }
        }

        // Post-commit, best-effort from here on.
        let (customer_name, recipient_email) = self.customer_display(identity).await;
        let product_names = self.product_names(&items).await;

        let placed_items: Vec<PlacedOrderItem> = items
            .iter()
            .zip(&line_totals)
            .map(|(item, line_total)| PlacedOrderItem {
                product_id: item.product_id,
                product_name: product_names.get(&item.product_id).cloned(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: *line_total,
            })
            .collect();

        if order_status == OrderStatus::Confirmed {
            self.notifier.notify(OrderConfirmation {
                recipient_email,
                customer_name: customer_name.clone(),
                order_id,
                lines: placed_items
                    .iter()
                    .map(|item| ConfirmationLine {
                        product_name: item
                            .product_name
                            .clone()
                            .unwrap_or_else(|| format!("Product {}", item.product_id)),
                        quantity: item.quantity,
                        unit_price: item.unit_price,
                        line_total: item.line_total,
                    })
                    .collect(),
                total_amount,
            });
        }

        Ok(PlacedOrder {
            id: order_id,
            user_id: identity.user_id,
            customer_name,
            status: order_status,
            total_amount,
            shipping_address_id: order.shipping_address_id,
            created_at,
            items: placed_items,
            payment: PaymentRecord {
                id: payment_id,
                order_id,
                amount: total_amount,
                status: payment_status,
                payment_method: WORKFLOW_PAYMENT_METHOD.to_string(),
                provider_reference,
                error_message,
                created_at: payment_created_at,
            },
        })
    }

    /// Looks up the customer's display name and email, falling back to
    /// the identity claim when the user row is missing.
    async fn customer_display(&self, identity: &Identity) -> (String, String) {
        let row = sqlx::query("SELECT full_name, email FROM users WHERE id = $1")
            .bind(identity.user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await;

        match row {
            Ok(Some(row)) => {
                let name: String = row.try_get("full_name").unwrap_or_default();
                let email: String = row
                    .try_get("email")
                    .unwrap_or_else(|_| identity.email.clone());
                (name, email)
            }
            Ok(None) => (identity.email.clone(), identity.email.clone()),
            Err(err) => {
                tracing::warn!(error = %err, "customer enrichment lookup failed");
                (identity.email.clone(), identity.email.clone())
            }
        }
    }

    /// Resolves product names for enrichment; failures leave names unset.
    async fn product_names(&self, items: &[NewOrderItem]) -> HashMap<ProductId, String> {
        let ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = items.iter().map(|i| i.product_id.as_uuid()).collect();
            ids.sort();
            ids.dedup();
            ids
        };

        let rows = sqlx::query("SELECT id, name FROM products WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&self.pool)
            .await;

        match rows {
            Ok(rows) => rows
                .into_iter()
                .filter_map(|row| {
                    let id: Uuid = row.try_get("id").ok()?;
                    let name: String = row.try_get("name").ok()?;
                    Some((ProductId::from_uuid(id), name))
                })
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "product enrichment lookup failed");
                HashMap::new()
            }
        }
    }
}

/// Validates the checkout items and returns them in ascending product-id
/// order, the global lock order.
fn validate_items(items: &[NewOrderItem]) -> Result<Vec<NewOrderItem>> {
    if items.is_empty() {
        return Err(OrderError::Validation(
            "items array is required and cannot be empty".to_string(),
        ));
    }
    for item in items {
        if item.quantity == 0 {
            return Err(OrderError::Validation(format!(
                "item quantity must be greater than 0 for product {}",
                item.product_id
            )));
        }
        if item.unit_price.is_negative() {
            return Err(OrderError::Validation(format!(
                "item unit price must be non-negative for product {}",
                item.product_id
            )));
        }
    }

    let mut sorted = items.to_vec();
    sorted.sort_by_key(|item| item.product_id);
    Ok(sorted)
}

/// Computes per-line totals and the order total. Unit prices are
/// client-supplied, so the arithmetic is overflow-checked and a total
/// that does not fit in i64 cents is rejected as invalid input.
fn total_amounts(items: &[NewOrderItem]) -> Result<(Vec<Money>, Money)> {
    let mut line_totals = Vec::with_capacity(items.len());
    let mut total = Money::zero();

    for item in items {
        let line_total = item
            .unit_price
            .checked_times(item.quantity)
            .ok_or_else(|| {
                OrderError::Validation(format!(
                    "line total out of range for product {}",
                    item.product_id
                ))
            })?;
        total = total
            .checked_add(line_total)
            .ok_or_else(|| OrderError::Validation("order total out of range".to_string()))?;
        line_totals.push(line_total);
    }

    Ok((line_totals, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_item_list_is_rejected() {
        assert!(matches!(
            validate_items(&[]),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let items = [NewOrderItem {
            product_id: ProductId::new(),
            quantity: 0,
            unit_price: Money::from_cents(100),
        }];
        assert!(matches!(
            validate_items(&items),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn negative_unit_price_is_rejected() {
        let items = [NewOrderItem {
            product_id: ProductId::new(),
            quantity: 1,
            unit_price: Money::from_cents(-1),
        }];
        assert!(matches!(
            validate_items(&items),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn overflowing_line_total_is_rejected() {
        let items = [NewOrderItem {
            product_id: ProductId::new(),
            quantity: 2,
            unit_price: Money::from_cents(i64::MAX),
        }];
        assert!(matches!(
            total_amounts(&items),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn overflowing_order_total_is_rejected() {
        let items = [
            NewOrderItem {
                product_id: ProductId::new(),
                quantity: 1,
                unit_price: Money::from_cents(i64::MAX),
            },
            NewOrderItem {
                product_id: ProductId::new(),
                quantity: 1,
                unit_price: Money::from_cents(1),
            },
        ];
        assert!(matches!(
            total_amounts(&items),
            Err(OrderError::Validation(_))
        ));
    }

    #[test]
    fn totals_sum_line_totals_exactly() {
        let items = [
            NewOrderItem {
                product_id: ProductId::new(),
                quantity: 3,
                unit_price: Money::from_cents(4999),
            },
            NewOrderItem {
                product_id: ProductId::new(),
                quantity: 2,
                unit_price: Money::from_cents(250),
            },
        ];
        let (line_totals, total) = total_amounts(&items).unwrap();
        assert_eq!(line_totals[0].cents(), 14997);
        assert_eq!(line_totals[1].cents(), 500);
        assert_eq!(total.cents(), 15497);
    }

    #[test]
    fn items_come_back_in_lock_order() {
        let a = ProductId::new();
        let b = ProductId::new();
        let items = [
            NewOrderItem {
                product_id: b,
                quantity: 1,
                unit_price: Money::from_cents(100),
            },
            NewOrderItem {
                product_id: a,
                quantity: 1,
                unit_price: Money::from_cents(100),
            },
        ];
        let sorted = validate_items(&items).unwrap();
        assert!(sorted[0].product_id <= sorted[1].product_id);
    }
}
