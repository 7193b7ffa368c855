//! Order checkout and order view endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AddressId, Money, OrderId, ProductId};
use orders::{NewOrder, NewOrderItem, OrderView, PlacedOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub shipping_address_id: Option<Uuid>,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub product_name: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub amount_cents: i64,
    pub status: String,
    pub payment_method: String,
    pub provider_reference: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_name: String,
    pub status: String,
    pub total_amount_cents: i64,
    pub shipping_address_id: Option<Uuid>,
}

#[derive(Serialize)]
pub struct CreateOrderResponse {
    pub message: &'static str,
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
    pub payment: PaymentResponse,
}

#[derive(Serialize)]
pub struct OrderViewResponse {
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
    pub payment: Option<PaymentResponse>,
}

fn placed_to_response(placed: PlacedOrder) -> CreateOrderResponse {
    let items = placed
        .items
        .iter()
        .map(|item| OrderItemResponse {
            product_id: item.product_id.as_uuid(),
            product_name: item.product_name.clone(),
            quantity: i64::from(item.quantity),
            unit_price_cents: item.unit_price.cents(),
            line_total_cents: item.line_total.cents(),
        })
        .collect();

    CreateOrderResponse {
        message: "Order created",
        order: OrderResponse {
            id: placed.id.as_uuid(),
            user_id: placed.user_id.as_uuid(),
            customer_name: placed.customer_name,
            status: placed.status.to_string(),
            total_amount_cents: placed.total_amount.cents(),
            shipping_address_id: placed.shipping_address_id.map(|id| id.as_uuid()),
        },
        items,
        payment: PaymentResponse {
            id: placed.payment.id.as_uuid(),
            amount_cents: placed.payment.amount.cents(),
            status: placed.payment.status.to_string(),
            payment_method: placed.payment.payment_method,
            provider_reference: placed.payment.provider_reference,
            error_message: placed.payment.error_message,
        },
    }
}

fn view_to_response(view: OrderView) -> OrderViewResponse {
    OrderViewResponse {
        order: OrderResponse {
            id: view.order.id.as_uuid(),
            user_id: view.order.user_id.as_uuid(),
            customer_name: view.order.customer_name,
            status: view.order.status.to_string(),
            total_amount_cents: view.order.total_amount.cents(),
            shipping_address_id: view.order.shipping_address_id.map(|id| id.as_uuid()),
        },
        items: view
            .items
            .into_iter()
            .map(|item| OrderItemResponse {
                product_id: item.product_id.as_uuid(),
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price_cents: item.unit_price.cents(),
                line_total_cents: item.line_total.cents(),
            })
            .collect(),
        payment: view.payment.map(|payment| PaymentResponse {
            id: payment.id.as_uuid(),
            amount_cents: payment.amount.cents(),
            status: payment.status.to_string(),
            payment_method: payment.payment_method,
            provider_reference: payment.provider_reference,
            error_message: payment.error_message,
        }),
    }
}

// -- Handlers --

/// POST /orders — run the checkout workflow for the authenticated user.
#[tracing::instrument(skip(state, user, req))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), ApiError> {
    let order = NewOrder {
        shipping_address_id: req.shipping_address_id.map(AddressId::from_uuid),
        items: req
            .items
            .iter()
            .map(|item| NewOrderItem {
                product_id: ProductId::from_uuid(item.product_id),
                quantity: item.quantity,
                unit_price: Money::from_cents(item.unit_price_cents),
            })
            .collect(),
    };

    let placed = state.workflow.place_order(&user, order).await?;

    Ok((StatusCode::CREATED, Json(placed_to_response(placed))))
}

/// GET /orders/:id — enriched order view for the owner or an admin.
#[tracing::instrument(skip(state, user))]
pub async fn get(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderViewResponse>, ApiError> {
    let view = orders::get_order(&state.pool, &user, OrderId::from_uuid(id)).await?;
    Ok(Json(view_to_response(view)))
}
