//! Pool-owning inventory service for the standalone reserve/release/check
//! endpoints. Reservation rejections roll the whole batch back; releases
//! always commit whatever applied.

use common::ProductId;
use sqlx::PgPool;

use crate::error::{InventoryError, Result};
use crate::ledger::{self, BatchOutcome, ReleaseReport, ReservedLine, StockLevel, StockRequest};

/// Inventory operations scoped to their own transactions.
#[derive(Clone)]
pub struct InventoryService {
    pool: PgPool,
}

impl InventoryService {
    /// Creates a new inventory service on the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reserves stock for the entire batch, all-or-nothing.
    ///
    /// On rejection the transaction is rolled back and the per-item
    /// failures are returned in [`InventoryError::ReservationRejected`].
    #[tracing::instrument(skip(self, items), fields(batch_size = items.len()))]
    pub async fn reserve(&self, items: &[StockRequest]) -> Result<Vec<ReservedLine>> {
        ledger::validate_batch(items)?;

        let mut tx = self.pool.begin().await?;
        match ledger::reserve(&mut tx, items).await? {
            BatchOutcome::Applied(lines) => {
                tx.commit().await?;
                metrics::counter!("inventory_reservations_total").increment(1);
                tracing::info!(reserved = lines.len(), "stock reserved");
                Ok(lines)
            }
            BatchOutcome::Rejected(failures) => {
                tx.rollback().await?;
                metrics::counter!("inventory_reservations_rejected_total").increment(1);
                tracing::warn!(failed = failures.len(), "stock reservation rejected");
                Err(InventoryError::ReservationRejected(failures))
            }
        }
    }

    /// Releases reserved stock back to available, clamped per item.
    #[tracing::instrument(skip(self, items), fields(batch_size = items.len()))]
    pub async fn release(&self, items: &[StockRequest]) -> Result<ReleaseReport> {
        ledger::validate_batch(items)?;

        let mut tx = self.pool.begin().await?;
        let report = ledger::release(&mut tx, items).await?;
        tx.commit().await?;

        metrics::counter!("inventory_releases_total").increment(1);
        tracing::info!(
            released = report.released.len(),
            missing = report.missing.len(),
            "stock released"
        );
        Ok(report)
    }

    /// Reads current balances for one product, or all products.
    #[tracing::instrument(skip(self))]
    pub async fn check(&self, product_id: Option<ProductId>) -> Result<Vec<StockLevel>> {
        ledger::stock_levels(&self.pool, product_id).await
    }
}
