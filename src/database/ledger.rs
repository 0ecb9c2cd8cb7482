use anyhow::Context;
use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use crate::database::notification_repository::NotificationRepository;
use crate::payments::traits::NotificationHandler;
use crate::payments::types::{Disposition, GatewayEvent};

/// Records every notification that names an order in `payment_notifications`.
///
/// Repeated deliveries of the same payment are acknowledged without a second
/// insert.
#[derive(Debug, Clone, Default)]
pub struct LedgerHandler;

#[async_trait]
impl NotificationHandler<Transaction<'static, Postgres>> for LedgerHandler {
    async fn inspect(&self, event: &GatewayEvent) -> Disposition {
        if event.order_id().is_none() {
            warn!("Notification {} carries no pg_order_id", event.id());
            return Disposition::Unhandled;
        }
        Disposition::Handled
    }

    async fn settle(
        &self,
        event: &GatewayEvent,
        tx: &mut Transaction<'static, Postgres>,
    ) -> anyhow::Result<()> {
        if let Some(payment_id) = event.payment_id() {
            let recorded = NotificationRepository::is_recorded(&mut **tx, payment_id)
                .await
                .context("Failed to look up payment notification")?;
            if recorded {
                info!(
                    "Payment {} already recorded, acknowledging duplicate notification",
                    payment_id
                );
                return Ok(());
            }
        }

        let record = NotificationRepository::record(&mut **tx, event)
            .await
            .context("Failed to record payment notification")?;

        info!(
            "Recorded payment notification: id={} order_id={} succeeded={}",
            record.id, record.order_id, record.succeeded
        );
        Ok(())
    }
}
