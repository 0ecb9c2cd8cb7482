use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::payments::types::GatewayEvent;

/// Accepted gateway notification, written inside the callback transaction.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentNotification {
    pub id: Uuid,
    pub order_id: String,
    pub payment_id: Option<String>,
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub succeeded: bool,
    pub failure_code: Option<i32>,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

/// Ledger of processed notifications.
///
/// Write operations take a connection so they can run on the callback's
/// transaction.
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether a notification for `payment_id` was already recorded
    pub async fn is_recorded(conn: &mut PgConnection, payment_id: &str) -> Result<bool, sqlx::Error> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM payment_notifications WHERE payment_id = $1)",
        )
        .bind(payment_id)
        .fetch_one(conn)
        .await?;

        Ok(row.0)
    }

    /// Insert a notification record for a verified event
    pub async fn record(
        conn: &mut PgConnection,
        event: &GatewayEvent,
    ) -> Result<PaymentNotification, sqlx::Error> {
        let payload: serde_json::Map<String, serde_json::Value> = event
            .params()
            .to_wire_pairs()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();

        sqlx::query_as::<_, PaymentNotification>(
            "INSERT INTO payment_notifications (id, order_id, payment_id, amount, currency, succeeded, failure_code, payload, received_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, order_id, payment_id, amount, currency, succeeded, failure_code, payload, received_at",
        )
        .bind(event.id())
        .bind(event.order_id().unwrap_or_default())
        .bind(event.payment_id())
        .bind(event.get("pg_amount"))
        .bind(event.currency())
        .bind(event.is_successful())
        .bind(failure_code_column(event.failure_code()))
        .bind(serde_json::Value::Object(payload))
        .bind(event.received_at())
        .fetch_one(conn)
        .await
    }

    /// Notifications recorded for an order, newest first
    pub async fn find_by_order(
        &self,
        order_id: &str,
        limit: i64,
    ) -> Result<Vec<PaymentNotification>, sqlx::Error> {
        sqlx::query_as::<_, PaymentNotification>(
            "SELECT id, order_id, payment_id, amount, currency, succeeded, failure_code, payload, received_at
             FROM payment_notifications
             WHERE order_id = $1
             ORDER BY received_at DESC LIMIT $2",
        )
        .bind(order_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

// INTEGER column; codes outside its range are stored as NULL.
fn failure_code_column(code: Option<u32>) -> Option<i32> {
    code.and_then(|c| i32::try_from(c).ok())
}
