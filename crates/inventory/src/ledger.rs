//! Transaction-composable ledger primitives.
//!
//! Every function here operates on a caller-owned connection, normally a
//! transaction opened by [`crate::InventoryService`] or by the order
//! workflow. Rows are locked `FOR UPDATE` in ascending product-id order
//! so two batches sharing products in different orders cannot deadlock.

use chrono::{DateTime, Utc};
use common::ProductId;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::error::{InventoryError, Result};

/// A requested stock movement for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl StockRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Current balances for one product, as read without locking.
#[derive(Debug, Clone, Serialize)]
pub struct StockLevel {
    pub product_id: ProductId,
    pub quantity_available: i64,
    pub quantity_reserved: i64,
    pub updated_at: DateTime<Utc>,
}

/// Post-update balances for one successfully reserved item.
#[derive(Debug, Clone, Serialize)]
pub struct ReservedLine {
    pub product_id: ProductId,
    pub quantity_reserved: u32,
    pub quantity_available: i64,
    pub quantity_reserved_total: i64,
}

/// Post-update balances for one released item.
///
/// `quantity_released` may be less than requested: releases clamp at the
/// reserved amount to tolerate duplicate or partial release calls.
#[derive(Debug, Clone, Serialize)]
pub struct ReleasedLine {
    pub product_id: ProductId,
    pub quantity_released: i64,
    pub quantity_available: i64,
    pub quantity_reserved_total: i64,
}

/// Why a single item in a reserve batch could not be satisfied.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemFailure {
    NotFound {
        product_id: ProductId,
    },
    InsufficientStock {
        product_id: ProductId,
        requested_quantity: u32,
        available_quantity: i64,
    },
}

/// Outcome of an all-or-nothing reserve batch.
#[derive(Debug)]
pub enum BatchOutcome {
    /// Every item was reservable; all balances were updated.
    Applied(Vec<ReservedLine>),
    /// At least one item failed; no balances were touched.
    Rejected(Vec<ItemFailure>),
}

/// Outcome of a release batch. Unknown products are reported in
/// `missing` but do not abort the rest of the batch.
#[derive(Debug, Default)]
pub struct ReleaseReport {
    pub released: Vec<ReleasedLine>,
    pub missing: Vec<ProductId>,
}

struct LockedRow {
    id: Uuid,
    product_id: ProductId,
    quantity_available: i64,
    quantity_reserved: i64,
}

/// Locks one inventory row, returning `None` when the product is unknown.
async fn lock_row(conn: &mut PgConnection, product_id: ProductId) -> Result<Option<LockedRow>> {
    let row: Option<PgRow> = sqlx::query(
        r#"
        SELECT id, product_id, quantity_available, quantity_reserved
        FROM inventory
        WHERE product_id = $1
        FOR UPDATE
        "#,
    )
    .bind(product_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|row| {
        Ok(LockedRow {
            id: row.try_get("id")?,
            product_id: ProductId::from_uuid(row.try_get("product_id")?),
            quantity_available: row.try_get("quantity_available")?,
            quantity_reserved: row.try_get("quantity_reserved")?,
        })
    })
    .transpose()
}

async fn write_balances(
    conn: &mut PgConnection,
    row_id: Uuid,
    available: i64,
    reserved: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE inventory
        SET quantity_available = $1, quantity_reserved = $2, updated_at = now()
        WHERE id = $3
        "#,
    )
    .bind(available)
    .bind(reserved)
    .bind(row_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Returns the batch sorted by ascending product id, the global lock order.
fn in_lock_order(items: &[StockRequest]) -> Vec<StockRequest> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|item| item.product_id);
    sorted
}

/// Returns the batch in lock order with duplicate product ids merged into
/// one request each. `reserve` locks every row first and writes from those
/// snapshots afterwards, so a product appearing twice must be a single
/// movement or the second write would clobber the first. Quantities
/// saturate at `u32::MAX`, which no inventory row can satisfy anyway.
fn coalesced_in_lock_order(items: &[StockRequest]) -> Vec<StockRequest> {
    let mut merged: Vec<StockRequest> = Vec::with_capacity(items.len());
    for item in in_lock_order(items) {
        match merged.last_mut() {
            Some(last) if last.product_id == item.product_id => {
                last.quantity = last.quantity.saturating_add(item.quantity);
            }
            _ => merged.push(item),
        }
    }
    merged
}

/// Reserves stock for the entire batch, moving each quantity from
/// `available` to `reserved`.
///
/// All-or-nothing: every row is locked and checked first, and updates are
/// applied only when the whole batch is satisfiable. A rejected batch
/// leaves every balance untouched regardless of what the caller does with
/// the transaction. Duplicate product ids in the batch are combined into a
/// single movement, reported as one [`ReservedLine`].
pub async fn reserve(conn: &mut PgConnection, items: &[StockRequest]) -> Result<BatchOutcome> {
    let items = coalesced_in_lock_order(items);

    let mut locked = Vec::with_capacity(items.len());
    let mut failures = Vec::new();

    for item in &items {
        match lock_row(conn, item.product_id).await? {
            None => failures.push(ItemFailure::NotFound {
                product_id: item.product_id,
            }),
            Some(row) if row.quantity_available < i64::from(item.quantity) => {
                failures.push(ItemFailure::InsufficientStock {
                    product_id: item.product_id,
                    requested_quantity: item.quantity,
                    available_quantity: row.quantity_available,
                });
            }
            Some(row) => locked.push((row, item.quantity)),
        }
    }

    if !failures.is_empty() {
        return Ok(BatchOutcome::Rejected(failures));
    }

    let mut reserved = Vec::with_capacity(locked.len());
    for (row, quantity) in locked {
        let new_available = row.quantity_available - i64::from(quantity);
        let new_reserved = row.quantity_reserved + i64::from(quantity);
        write_balances(conn, row.id, new_available, new_reserved).await?;

        reserved.push(ReservedLine {
            product_id: row.product_id,
            quantity_reserved: quantity,
            quantity_available: new_available,
            quantity_reserved_total: new_reserved,
        });
    }

    Ok(BatchOutcome::Applied(reserved))
}

/// Releases reserved stock back to `available`, clamping each item at the
/// currently reserved amount. Partial-success: unknown products are
/// reported, the rest of the batch still applies.
pub async fn release(conn: &mut PgConnection, items: &[StockRequest]) -> Result<ReleaseReport> {
    let items = in_lock_order(items);
    let mut report = ReleaseReport::default();

    for item in &items {
        let Some(row) = lock_row(conn, item.product_id).await? else {
            report.missing.push(item.product_id);
            continue;
        };

        let release_amount = i64::from(item.quantity).min(row.quantity_reserved);
        let new_available = row.quantity_available + release_amount;
        let new_reserved = row.quantity_reserved - release_amount;
        write_balances(conn, row.id, new_available, new_reserved).await?;

        report.released.push(ReleasedLine {
            product_id: row.product_id,
            quantity_released: release_amount,
            quantity_available: new_available,
            quantity_reserved_total: new_reserved,
        });
    }

    Ok(report)
}

/// Debits `available` directly, bypassing the reserve/release cycle.
///
/// This is the order workflow's fulfillment path: stock leaves
/// `available` permanently. Returns the new available balance.
pub async fn debit_available(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: u32,
) -> Result<i64> {
    let row = lock_row(conn, product_id)
        .await?
        .ok_or(InventoryError::ProductNotFound(product_id))?;

    if row.quantity_available < i64::from(quantity) {
        return Err(InventoryError::InsufficientStock {
            product_id,
            requested: quantity,
            available: row.quantity_available,
        });
    }

    let new_available = row.quantity_available - i64::from(quantity);
    write_balances(conn, row.id, new_available, row.quantity_reserved).await?;
    Ok(new_available)
}

/// Credits `available` directly. Used to restore stock when a checkout's
/// payment is declined after the debit, within the same transaction.
pub async fn credit_available(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: u32,
) -> Result<i64> {
    let row = lock_row(conn, product_id)
        .await?
        .ok_or(InventoryError::ProductNotFound(product_id))?;

    let new_available = row.quantity_available + i64::from(quantity);
    write_balances(conn, row.id, new_available, row.quantity_reserved).await?;
    Ok(new_available)
}

/// Reads current balances without locking, for one product or all.
pub async fn stock_levels(
    executor: impl sqlx::PgExecutor<'_>,
    product_id: Option<ProductId>,
) -> Result<Vec<StockLevel>> {
    let rows = match product_id {
        Some(product_id) => {
            sqlx::query(
                r#"
                SELECT product_id, quantity_available, quantity_reserved, updated_at
                FROM inventory
                WHERE product_id = $1
                ORDER BY product_id ASC
                "#,
            )
            .bind(product_id.as_uuid())
            .fetch_all(executor)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT product_id, quantity_available, quantity_reserved, updated_at
                FROM inventory
                ORDER BY product_id ASC
                "#,
            )
            .fetch_all(executor)
            .await?
        }
    };

    rows.into_iter()
        .map(|row| {
            Ok(StockLevel {
                product_id: ProductId::from_uuid(row.try_get("product_id")?),
                quantity_available: row.try_get("quantity_available")?,
                quantity_reserved: row.try_get("quantity_reserved")?,
                updated_at: row.try_get("updated_at")?,
            })
        })
        .collect()
}

/// Validates a stock request batch: non-empty, every quantity positive.
pub fn validate_batch(items: &[StockRequest]) -> Result<()> {
    if items.is_empty() {
        return Err(InventoryError::Validation(
            "items array is required and cannot be empty".to_string(),
        ));
    }
    for item in items {
        if item.quantity == 0 {
            return Err(InventoryError::Validation(format!(
                "item quantity must be greater than 0 for product {}",
                item.product_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batches_are_sorted_into_lock_order() {
        let a = ProductId::new();
        let b = ProductId::new();
        let c = ProductId::new();

        let sorted = in_lock_order(&[
            StockRequest::new(c, 1),
            StockRequest::new(a, 2),
            StockRequest::new(b, 3),
        ]);

        let mut ids: Vec<ProductId> = sorted.iter().map(|i| i.product_id).collect();
        let sorted_ids = ids.clone();
        ids.sort();
        assert_eq!(ids, sorted_ids);
    }

    #[test]
    fn duplicate_products_merge_into_one_request() {
        let a = ProductId::new();
        let b = ProductId::new();

        let merged = coalesced_in_lock_order(&[
            StockRequest::new(a, 7),
            StockRequest::new(b, 1),
            StockRequest::new(a, 7),
        ]);

        assert_eq!(merged.len(), 2);
        let for_a = merged.iter().find(|r| r.product_id == a).unwrap();
        assert_eq!(for_a.quantity, 14);
    }

    #[test]
    fn merged_quantities_saturate() {
        let a = ProductId::new();
        let merged = coalesced_in_lock_order(&[
            StockRequest::new(a, u32::MAX),
            StockRequest::new(a, 1),
        ]);
        assert_eq!(merged[0].quantity, u32::MAX);
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            validate_batch(&[]),
            Err(InventoryError::Validation(_))
        ));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let items = [StockRequest::new(ProductId::new(), 0)];
        assert!(matches!(
            validate_batch(&items),
            Err(InventoryError::Validation(_))
        ));
    }

    #[test]
    fn item_failure_serializes_with_reason_tag() {
        let failure = ItemFailure::InsufficientStock {
            product_id: ProductId::new(),
            requested_quantity: 5,
            available_quantity: 1,
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["reason"], "INSUFFICIENT_STOCK");
        assert_eq!(json["requested_quantity"], 5);
        assert_eq!(json["available_quantity"], 1);
    }
}
