//! HTTP API server for the order-fulfillment system.
//!
//! Wires the inventory ledger, order workflow, and payment simulator
//! behind an axum router with bearer-token authentication, structured
//! logging (tracing), and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use inventory::InventoryService;
use metrics_exporter_prometheus::PrometheusHandle;
use orders::{LoggingSink, NotificationSink, Notifier, OrderWorkflow};
use payments::{EventPublisher, PaymentGateway, PaymentService, SimulatedGateway};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::AuthKeys;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub pool: PgPool,
    pub workflow: OrderWorkflow,
    pub inventory: InventoryService,
    pub payments: PaymentService,
    pub auth: AuthKeys,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/inventory/check", get(routes::inventory::check))
        .route("/inventory/reserve", post(routes::inventory::reserve))
        .route("/inventory/release", post(routes::inventory::release))
        .route("/orders", post(routes::orders::create))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/payments", post(routes::payments::initiate))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state with the default simulated gateway and the
/// logging notification sink. Must run inside a tokio runtime (the
/// notifier and event publisher spawn drain workers).
pub fn create_state(pool: PgPool, jwt_secret: &str) -> Arc<AppState> {
    create_state_with(
        pool,
        jwt_secret,
        Arc::new(SimulatedGateway::new()),
        Arc::new(LoggingSink),
    )
}

/// Creates application state with explicit gateway and notification sink,
/// for tests that need deterministic payments or observable notifications.
pub fn create_state_with(
    pool: PgPool,
    jwt_secret: &str,
    gateway: Arc<dyn PaymentGateway>,
    sink: Arc<dyn NotificationSink>,
) -> Arc<AppState> {
    let notifier = Notifier::spawn(sink);
    let events = EventPublisher::spawn();

    Arc::new(AppState {
        workflow: OrderWorkflow::new(pool.clone(), gateway.clone(), notifier),
        inventory: InventoryService::new(pool.clone()),
        payments: PaymentService::new(pool.clone(), gateway, events),
        auth: AuthKeys::from_secret(jwt_secret),
        pool,
    })
}
