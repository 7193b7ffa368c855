//! Payment service integration tests against a real PostgreSQL.

use std::sync::Arc;

use common::{Identity, Money, OrderId, PaymentStatus, ProductId, Role, UserId};
use payments::{
    EventPublisher, ForcedOutcome, InitiatePayment, PaymentError, PaymentService, SimulatedGateway,
};
use sqlx::{PgPool, Row};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();
            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_commerce_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_pool() -> PgPool {
    let info = get_container_info().await;
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap()
}

fn service(pool: &PgPool) -> PaymentService {
    PaymentService::new(
        pool.clone(),
        Arc::new(SimulatedGateway),
        EventPublisher::spawn(),
    )
}

async fn seed_user(pool: &PgPool, role: Role) -> Identity {
    let user_id = UserId::new();
    let email = format!("{user_id}@example.com");
    sqlx::query("INSERT INTO users (id, full_name, email, role) VALUES ($1, 'Jane Doe', $2, $3)")
        .bind(user_id.as_uuid())
        .bind(&email)
        .bind(role.as_str())
        .execute(pool)
        .await
        .unwrap();
    Identity::new(user_id, email, role)
}

/// Seeds a PENDING order directly, bypassing the workflow.
async fn seed_order(pool: &PgPool, owner: &Identity, total_cents: i64) -> OrderId {
    let product_id = ProductId::new();
    sqlx::query("INSERT INTO products (id, name, price_cents) VALUES ($1, 'Widget', $2)")
        .bind(product_id.as_uuid())
        .bind(total_cents)
        .execute(pool)
        .await
        .unwrap();

    let order_id = OrderId::new();
    sqlx::query(
        "INSERT INTO orders (id, user_id, status, total_amount_cents) VALUES ($1, $2, 'PENDING', $3)",
    )
    .bind(order_id.as_uuid())
    .bind(owner.user_id.as_uuid())
    .bind(total_cents)
    .execute(pool)
    .await
    .unwrap();
    order_id
}

fn request(order_id: OrderId, amount_cents: i64, simulate: Option<ForcedOutcome>) -> InitiatePayment {
    InitiatePayment {
        order_id,
        amount: Money::from_cents(amount_cents),
        payment_method: None,
        simulate,
    }
}

#[tokio::test]
async fn forced_success_persists_completed_payment() {
    let pool = get_pool().await;
    let owner = seed_user(&pool, Role::Customer).await;
    let order_id = seed_order(&pool, &owner, 4999).await;

    let record = service(&pool)
        .initiate(&owner, request(order_id, 4999, Some(ForcedOutcome::Success)))
        .await
        .unwrap();

    assert_eq!(record.status, PaymentStatus::Completed);
    assert_eq!(record.payment_method, "CARD");
    let reference = record.provider_reference.as_deref().unwrap();
    assert!(reference.starts_with("SIM-TXN-"));
    assert!(reference.ends_with(&record.id.to_string()));
    assert!(record.error_message.is_none());

    let row = sqlx::query("SELECT status, provider_reference FROM payments WHERE id = $1")
        .bind(record.id.as_uuid())
        .fetch_one(&pool)
        .await
        .unwrap();
    let status: String = row.try_get("status").unwrap();
    let stored_reference: Option<String> = row.try_get("provider_reference").unwrap();
    assert_eq!(status, "COMPLETED");
    assert_eq!(stored_reference.as_deref(), Some(reference));
}

#[tokio::test]
async fn forced_failure_persists_failed_payment_with_message() {
    let pool = get_pool().await;
    let owner = seed_user(&pool, Role::Customer).await;
    let order_id = seed_order(&pool, &owner, 4999).await;

    let record = service(&pool)
        .initiate(&owner, request(order_id, 4999, Some(ForcedOutcome::Failed)))
        .await
        .unwrap();

    assert_eq!(record.status, PaymentStatus::Failed);
    assert!(record.provider_reference.is_none());
    assert_eq!(
        record.error_message.as_deref(),
        Some("Simulated payment failure")
    );

    let row = sqlx::query("SELECT status, error_message FROM payments WHERE id = $1")
        .bind(record.id.as_uuid())
        .fetch_one(&pool)
        .await
        .unwrap();
    let status: String = row.try_get("status").unwrap();
    let message: Option<String> = row.try_get("error_message").unwrap();
    assert_eq!(status, "FAILED");
    assert_eq!(message.as_deref(), Some("Simulated payment failure"));
}

#[tokio::test]
async fn unknown_order_is_rejected() {
    let pool = get_pool().await;
    let caller = seed_user(&pool, Role::Customer).await;

    let err = service(&pool)
        .initiate(
            &caller,
            request(OrderId::new(), 100, Some(ForcedOutcome::Success)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::OrderNotFound(_)));
}

#[tokio::test]
async fn stranger_cannot_pay_for_someone_elses_order() {
    let pool = get_pool().await;
    let owner = seed_user(&pool, Role::Customer).await;
    let stranger = seed_user(&pool, Role::Customer).await;
    let order_id = seed_order(&pool, &owner, 4999).await;

    let err = service(&pool)
        .initiate(
            &stranger,
            request(order_id, 4999, Some(ForcedOutcome::Success)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Forbidden));

    // No attempt row is left behind.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_id = $1")
        .bind(order_id.as_uuid())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn admin_may_pay_for_any_order() {
    let pool = get_pool().await;
    let owner = seed_user(&pool, Role::Customer).await;
    let admin = seed_user(&pool, Role::Admin).await;
    let order_id = seed_order(&pool, &owner, 4999).await;

    let record = service(&pool)
        .initiate(&admin, request(order_id, 4999, Some(ForcedOutcome::Success)))
        .await
        .unwrap();
    assert_eq!(record.status, PaymentStatus::Completed);
}

#[tokio::test]
async fn non_positive_amount_is_rejected() {
    let pool = get_pool().await;
    let owner = seed_user(&pool, Role::Customer).await;
    let order_id = seed_order(&pool, &owner, 4999).await;

    for amount in [0, -100] {
        let err = service(&pool)
            .initiate(&owner, request(order_id, amount, None))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }
}

#[tokio::test]
async fn repeated_attempts_accumulate_as_separate_rows() {
    let pool = get_pool().await;
    let owner = seed_user(&pool, Role::Customer).await;
    let order_id = seed_order(&pool, &owner, 4999).await;
    let service = service(&pool);

    service
        .initiate(&owner, request(order_id, 4999, Some(ForcedOutcome::Failed)))
        .await
        .unwrap();
    service
        .initiate(&owner, request(order_id, 4999, Some(ForcedOutcome::Success)))
        .await
        .unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE order_id = $1")
        .bind(order_id.as_uuid())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}
