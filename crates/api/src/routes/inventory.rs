//! Inventory check/reserve/release endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use common::ProductId;
use inventory::{ReleasedLine, ReservedLine, StockLevel, StockRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct StockItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct StockBatchRequest {
    /// Correlates the batch with an order in logs; not otherwise used.
    pub order_id: Option<Uuid>,
    pub items: Vec<StockItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    pub product_id: Option<Uuid>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReserveResponse {
    pub message: &'static str,
    pub order_id: Option<Uuid>,
    pub items: Vec<ReservedLine>,
}

#[derive(Serialize)]
pub struct ReleaseResponse {
    pub message: &'static str,
    pub order_id: Option<Uuid>,
    pub items: Vec<ReleasedLine>,
    pub missing_items: Vec<ProductId>,
}

#[derive(Serialize)]
pub struct CheckResponse {
    pub inventory: Vec<StockLevel>,
}

fn to_requests(items: &[StockItemRequest]) -> Vec<StockRequest> {
    items
        .iter()
        .map(|item| StockRequest::new(ProductId::from_uuid(item.product_id), item.quantity))
        .collect()
}

// -- Handlers --

/// POST /inventory/reserve — admin-only all-or-nothing batch reserve.
#[tracing::instrument(skip(state, user, req))]
pub async fn reserve(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<StockBatchRequest>,
) -> Result<Json<ReserveResponse>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::Forbidden("admin role required".to_string()));
    }

    let items = state.inventory.reserve(&to_requests(&req.items)).await?;

    Ok(Json(ReserveResponse {
        message: "Stock reserved successfully",
        order_id: req.order_id,
        items,
    }))
}

/// POST /inventory/release — admin-only clamped batch release.
#[tracing::instrument(skip(state, user, req))]
pub async fn release(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<StockBatchRequest>,
) -> Result<Json<ReleaseResponse>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::Forbidden("admin role required".to_string()));
    }

    let report = state.inventory.release(&to_requests(&req.items)).await?;

    Ok(Json(ReleaseResponse {
        message: "Stock released successfully",
        order_id: req.order_id,
        items: report.released,
        missing_items: report.missing,
    }))
}

/// GET /inventory/check — unauthenticated balance read.
#[tracing::instrument(skip(state))]
pub async fn check(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CheckParams>,
) -> Result<Json<CheckResponse>, ApiError> {
    let inventory = state
        .inventory
        .check(params.product_id.map(ProductId::from_uuid))
        .await?;

    Ok(Json(CheckResponse { inventory }))
}
