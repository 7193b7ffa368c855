//! Inventory ledger: per-product stock counters and the atomic
//! reserve/release/debit operations that guard them.
//!
//! Every mutating operation reads its target rows under `FOR UPDATE` so
//! concurrent requests for the same product serialize at the database
//! instead of racing on stale counts. The [`ledger`] module exposes the
//! primitives against a caller-owned transaction; [`InventoryService`]
//! wraps them with transaction management for the standalone endpoints.

pub mod error;
pub mod ledger;
pub mod service;

pub use error::InventoryError;
pub use ledger::{
    BatchOutcome, ItemFailure, ReleaseReport, ReleasedLine, ReservedLine, StockLevel, StockRequest,
};
pub use service::InventoryService;
