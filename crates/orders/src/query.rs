//! Authorized, enriched order reads.
//!
//! Purely a projection over orders, order_items (+ product names), and
//! the latest payment. No locks are taken; reads outside the workflow
//! transaction accept read-after-write timing.

use chrono::{DateTime, Utc};
use common::{
    AddressId, Identity, Money, OrderId, OrderStatus, PaymentId, PaymentStatus, ProductId, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{OrderError, Result};

/// Order header enriched with the customer's display name.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub id: OrderId,
    pub user_id: UserId,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub shipping_address_id: Option<AddressId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Line item enriched with the product name.
#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: Uuid,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

/// Latest payment attempt for the order.
#[derive(Debug, Clone)]
pub struct PaymentView {
    pub id: PaymentId,
    pub amount: Money,
    pub status: PaymentStatus,
    pub payment_method: String,
    pub provider_reference: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Full authorized view of one order.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub order: OrderSummary,
    pub items: Vec<OrderItemView>,
    pub payment: Option<PaymentView>,
}

fn parse_status<T: std::str::FromStr>(raw: String) -> std::result::Result<T, sqlx::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn row_to_summary(row: PgRow) -> Result<OrderSummary> {
    Ok(OrderSummary {
        id: OrderId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        customer_name: row.try_get("customer_name")?,
        status: parse_status(row.try_get::<String, _>("status")?)?,
        total_amount: Money::from_cents(row.try_get("total_amount_cents")?),
        shipping_address_id: row
            .try_get::<Option<Uuid>, _>("shipping_address_id")?
            .map(AddressId::from_uuid),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Fetches the enriched view of one order.
///
/// Fails with [`OrderError::NotFound`] for an unknown id and
/// [`OrderError::Forbidden`] unless the requester is the owner or an
/// admin.
#[tracing::instrument(skip(pool, identity))]
pub async fn get_order(pool: &PgPool, identity: &Identity, order_id: OrderId) -> Result<OrderView> {
    let row = sqlx::query(
        r#"
        SELECT o.id, o.user_id, o.status, o.total_amount_cents, o.shipping_address_id,
               o.created_at, o.updated_at, u.full_name AS customer_name
        FROM orders o
        JOIN users u ON o.user_id = u.id
        WHERE o.id = $1
        "#,
    )
    .bind(order_id.as_uuid())
    .fetch_optional(pool)
    .await?
    .ok_or(OrderError::NotFound(order_id))?;

    let order = row_to_summary(row)?;
    if !identity.can_access(order.user_id) {
        return Err(OrderError::Forbidden);
    }

    let item_rows = sqlx::query(
        r#"
        SELECT oi.id, oi.order_id, oi.product_id, oi.quantity,
               oi.unit_price_cents, oi.line_total_cents, p.name AS product_name
        FROM order_items oi
        LEFT JOIN products p ON oi.product_id = p.id
        WHERE oi.order_id = $1
        ORDER BY oi.product_id ASC
        "#,
    )
    .bind(order_id.as_uuid())
    .fetch_all(pool)
    .await?;

    let items = item_rows
        .into_iter()
        .map(|row| {
            Ok(OrderItemView {
                id: row.try_get("id")?,
                order_id: OrderId::from_uuid(row.try_get("order_id")?),
                product_id: ProductId::from_uuid(row.try_get("product_id")?),
                product_name: row.try_get("product_name")?,
                quantity: row.try_get("quantity")?,
                unit_price: Money::from_cents(row.try_get("unit_price_cents")?),
                line_total: Money::from_cents(row.try_get("line_total_cents")?),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let payment_row = sqlx::query(
        r#"
        SELECT id, amount_cents, status, payment_method, provider_reference,
               error_message, created_at
        FROM payments
        WHERE order_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(order_id.as_uuid())
    .fetch_optional(pool)
    .await?;

    let payment = payment_row
        .map(|row| {
            Ok::<_, OrderError>(PaymentView {
                id: PaymentId::from_uuid(row.try_get("id")?),
                amount: Money::from_cents(row.try_get("amount_cents")?),
                status: parse_status(row.try_get::<String, _>("status")?)?,
                payment_method: row.try_get("payment_method")?,
                provider_reference: row.try_get("provider_reference")?,
                error_message: row.try_get("error_message")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()?;

    Ok(OrderView {
        order,
        items,
        payment,
    })
}
