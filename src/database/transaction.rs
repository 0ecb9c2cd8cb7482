use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error as log_error};

use crate::error::{GatewayError, GatewayResult};
use crate::payments::traits::AtomicScope;

/// Atomic scope backed by a Postgres transaction per callback.
///
/// A transaction dropped without commit is rolled back by sqlx.
#[derive(Debug, Clone)]
pub struct PgAtomicScope {
    pool: PgPool,
}

impl PgAtomicScope {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AtomicScope for PgAtomicScope {
    type Transaction = Transaction<'static, Postgres>;

    async fn begin(&self) -> GatewayResult<Self::Transaction> {
        debug!("Beginning database transaction");

        self.pool.begin().await.map_err(|e| {
            log_error!("Failed to begin transaction: {}", e);
            GatewayError::processing(format!("Failed to begin transaction: {}", e))
        })
    }

    async fn commit(&self, tx: Self::Transaction) -> GatewayResult<()> {
        debug!("Committing transaction");

        tx.commit().await.map_err(|e| {
            log_error!("Failed to commit transaction: {}", e);
            GatewayError::processing(format!("Failed to commit transaction: {}", e))
        })
    }

    async fn rollback(&self, tx: Self::Transaction) -> GatewayResult<()> {
        debug!("Rolling back transaction");

        tx.rollback().await.map_err(|e| {
            log_error!("Failed to rollback transaction: {}", e);
            GatewayError::processing(format!("Failed to rollback transaction: {}", e))
        })
    }
}
