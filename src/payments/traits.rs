//! Payment gateway trait definitions
//!
//! Seams between the gateway protocol and its collaborators: the HTTP
//! transport, the salt generator, the database transaction manager and the
//! merchant's business handler.

use crate::error::GatewayResult;
use crate::payments::types::{Disposition, GatewayEvent, PaymentRedirect, PaymentRequest};
use async_trait::async_trait;

/// Outbound side of the gateway integration.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register a payment with the gateway
    ///
    /// Returns the payment page the customer must be redirected to.
    ///
    /// # Errors
    /// * `GatewayUnavailable` - transport failure, timeout or non-2xx status
    /// * `GatewayRejected` - the gateway answered with `pg_status` other than `ok`
    async fn initiate_payment(&self, request: PaymentRequest) -> GatewayResult<PaymentRedirect>;
}

/// Raw answer of the gateway's HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// "Send a request, get a response" capability used to reach the gateway.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// POST `form` as `application/x-www-form-urlencoded`.
    ///
    /// Non-2xx answers are returned as responses; only network failures and
    /// timeouts are errors.
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> GatewayResult<TransportResponse>;
}

/// Source of per-request nonces. Implementations must be cryptographically secure.
pub trait SaltSource: Send + Sync {
    fn generate(&self) -> String;
}

/// Atomic-commit capability wrapping the business side effects of a callback.
#[async_trait]
pub trait AtomicScope: Send + Sync {
    type Transaction: Send;

    async fn begin(&self) -> GatewayResult<Self::Transaction>;

    async fn commit(&self, tx: Self::Transaction) -> GatewayResult<()>;

    async fn rollback(&self, tx: Self::Transaction) -> GatewayResult<()>;
}

/// Merchant business logic invoked for verified callbacks.
#[async_trait]
pub trait NotificationHandler<Tx: Send>: Send + Sync {
    /// Decide whether this notification is claimed by the merchant.
    async fn inspect(&self, event: &GatewayEvent) -> Disposition;

    /// Apply the side effects of a claimed notification.
    ///
    /// Runs inside `tx`; any error rolls the transaction back and the gateway
    /// is asked to retry later.
    async fn settle(&self, event: &GatewayEvent, tx: &mut Tx) -> anyhow::Result<()>;
}
