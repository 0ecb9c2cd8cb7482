//! Notification ledger against a real Postgres.
//!
//! These tests require a running database:
//! DATABASE_URL=postgres://... cargo test --test ledger_postgres -- --ignored

#![cfg(feature = "database")]

mod common;

use std::sync::Arc;

use common::{gateway_config, signed_callback};
use platron_gateway::database::notification_repository::NotificationRepository;
use platron_gateway::database::{init_pool, LedgerHandler, PgAtomicScope};
use platron_gateway::payments::{CallbackProcessor, Endpoint, ResponseStatus, SignatureEngine};

async fn setup_db() -> sqlx::PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = init_pool(&database_url, None)
        .await
        .expect("Failed to init DB pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

#[tokio::test]
#[ignore]
async fn test_accepted_notification_is_recorded_once() {
    let pool = setup_db().await;
    let order_id = format!("order-{}", uuid::Uuid::new_v4());
    let payment_id = uuid::Uuid::new_v4().to_string();
    let processor = CallbackProcessor::new(gateway_config(), PgAtomicScope::new(pool.clone()));
    let handler = Arc::new(LedgerHandler);

    let mut params = signed_callback("result", &order_id);
    params.insert("pg_payment_id", payment_id.as_str());
    let config = gateway_config();
    SignatureEngine::new(config.digest()).attach(
        &Endpoint::new("result").unwrap(),
        &mut params,
        config.secret_key(),
    );

    for _ in 0..2 {
        let response = processor
            .process_notification(params.clone(), common::RESULT_URL, handler.as_ref())
            .await
            .unwrap();
        assert_eq!(response.status(), ResponseStatus::Ok);
    }

    let records = NotificationRepository::new(pool)
        .find_by_order(&order_id, 10)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payment_id.as_deref(), Some(payment_id.as_str()));
    assert!(records[0].succeeded);
    assert_eq!(records[0].amount.as_deref(), Some("10.00"));
}

#[tokio::test]
#[ignore]
async fn test_notification_without_order_is_not_recorded() {
    let pool = setup_db().await;
    let processor = CallbackProcessor::new(gateway_config(), PgAtomicScope::new(pool));

    let response = processor
        .process_notification(signed_callback("result", ""), common::RESULT_URL, &LedgerHandler)
        .await
        .unwrap();

    assert_eq!(response.status(), ResponseStatus::Error);
}
