//! Inbound gateway notifications
//!
//! A callback moves through `Received -> Verified -> Dispatched` and ends
//! `Accepted`, `Rejected` or `Errored`. The signature is checked before any
//! business code runs. A success acknowledgment is only produced for a
//! settlement whose transaction committed.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::payments::config::GatewayConfig;
use crate::payments::signature::{Endpoint, SignatureEngine};
use crate::payments::traits::{AtomicScope, NotificationHandler};
use crate::payments::types::{
    CallbackResponse, Disposition, GatewayEvent, ParameterSet, ResponseStatus, SIGNATURE_FIELD,
};

pub const DESCRIPTION_NOT_ACCEPTED: &str = "Оплата не принята";
pub const DESCRIPTION_ACCEPTED: &str = "Оплата принята";

// Returned to the gateway instead of handler internals.
const PROCESSING_FAILURE: &str = "Error processing request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackState {
    Received,
    Verified,
    Dispatched,
    Accepted,
    Rejected,
    Errored,
}

impl fmt::Display for CallbackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackState::Received => "received",
            CallbackState::Verified => "verified",
            CallbackState::Dispatched => "dispatched",
            CallbackState::Accepted => "accepted",
            CallbackState::Rejected => "rejected",
            CallbackState::Errored => "errored",
        };
        f.write_str(name)
    }
}

pub struct CallbackProcessor<S: AtomicScope> {
    config: Arc<GatewayConfig>,
    engine: SignatureEngine,
    scope: S,
}

impl<S: AtomicScope> CallbackProcessor<S> {
    pub fn new(config: Arc<GatewayConfig>, scope: S) -> Self {
        let engine = SignatureEngine::new(config.digest());
        Self {
            config,
            engine,
            scope,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Processes a callback delivered to `callback_url`, whose last path
    /// segment is the signed endpoint name.
    pub async fn process_notification<H>(
        &self,
        raw_params: ParameterSet,
        callback_url: &str,
        handler: &H,
    ) -> GatewayResult<CallbackResponse>
    where
        H: NotificationHandler<S::Transaction> + ?Sized,
    {
        let endpoint = Endpoint::from_url(callback_url)?;
        self.process_notification_for(raw_params, &endpoint, handler)
            .await
    }

    /// Same as [`process_notification`](Self::process_notification) with an
    /// explicit endpoint name.
    pub async fn process_notification_for<H>(
        &self,
        raw_params: ParameterSet,
        endpoint: &Endpoint,
        handler: &H,
    ) -> GatewayResult<CallbackResponse>
    where
        H: NotificationHandler<S::Transaction> + ?Sized,
    {
        debug!(
            "Callback {}: endpoint={} fields={}",
            CallbackState::Received,
            endpoint,
            raw_params.len()
        );

        if !self
            .engine
            .verify(endpoint, &raw_params, self.config.secret_key())
        {
            error!(
                "Rejected callback with invalid signature: endpoint={} order_id={} payment_id={}",
                endpoint,
                raw_params.get_str("pg_order_id").unwrap_or("-"),
                raw_params.get_str("pg_payment_id").unwrap_or("-")
            );
            return Err(GatewayError::forbidden_signature(endpoint.as_str()));
        }

        let mut params = raw_params;
        params.remove(SIGNATURE_FIELD);
        let event = GatewayEvent::new(endpoint.as_str(), params);
        let salt = event.salt().map(str::to_string);

        debug!(
            "Callback {}: event_id={} order_id={}",
            CallbackState::Verified,
            event.id(),
            event.order_id().unwrap_or("-")
        );

        let disposition = handler.inspect(&event).await;
        debug!(
            "Callback {}: event_id={} disposition={:?}",
            CallbackState::Dispatched,
            event.id(),
            disposition
        );

        match disposition {
            Disposition::Unhandled => {
                warn!(
                    "Callback not claimed by any handler: event_id={} order_id={}",
                    event.id(),
                    event.order_id().unwrap_or("-")
                );
                Ok(self.respond(
                    endpoint,
                    ResponseStatus::Error,
                    salt,
                    DESCRIPTION_NOT_ACCEPTED,
                ))
            }
            Disposition::Rejected { description } => {
                info!(
                    "Callback {}: event_id={} order_id={} reason={}",
                    CallbackState::Rejected,
                    event.id(),
                    event.order_id().unwrap_or("-"),
                    description
                );
                Ok(self.respond(endpoint, ResponseStatus::Rejected, salt, &description))
            }
            Disposition::Handled => self.settle(endpoint, &event, handler, salt).await,
        }
    }

    async fn settle<H>(
        &self,
        endpoint: &Endpoint,
        event: &GatewayEvent,
        handler: &H,
        salt: Option<String>,
    ) -> GatewayResult<CallbackResponse>
    where
        H: NotificationHandler<S::Transaction> + ?Sized,
    {
        let mut tx = self.scope.begin().await.map_err(|e| {
            error!(
                "Failed to begin transaction for callback {}: {}",
                event.id(),
                e
            );
            GatewayError::processing(PROCESSING_FAILURE)
        })?;

        // Panics count as settle failures.
        let failure = match AssertUnwindSafe(handler.settle(event, &mut tx))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("{:#}", e)),
            Err(panic) => Some(format!("handler panicked: {}", panic_message(&*panic))),
        };

        if let Some(reason) = failure {
            error!(
                "Payment processing error: event_id={} order_id={}: {}",
                event.id(),
                event.order_id().unwrap_or("-"),
                reason
            );
            if let Err(rollback_err) = self.scope.rollback(tx).await {
                error!(
                    "Failed to roll back transaction for callback {}: {}",
                    event.id(),
                    rollback_err
                );
            }
            debug!("Callback {}: event_id={}", CallbackState::Errored, event.id());
            return Err(GatewayError::processing(PROCESSING_FAILURE));
        }

        let response = self.respond(endpoint, ResponseStatus::Ok, salt, DESCRIPTION_ACCEPTED);

        self.scope.commit(tx).await.map_err(|e| {
            error!(
                "Failed to commit transaction for callback {}: {}",
                event.id(),
                e
            );
            GatewayError::processing(PROCESSING_FAILURE)
        })?;

        info!(
            "Callback {}: event_id={} order_id={} payment_id={}",
            CallbackState::Accepted,
            event.id(),
            event.order_id().unwrap_or("-"),
            event.payment_id().unwrap_or("-")
        );

        Ok(response)
    }

    fn respond(
        &self,
        endpoint: &Endpoint,
        status: ResponseStatus,
        salt: Option<String>,
        description: &str,
    ) -> CallbackResponse {
        let params = CallbackResponse::unsigned_params(status, salt.as_deref(), description);
        let signature = self
            .engine
            .sign(endpoint, &params, self.config.secret_key());

        CallbackResponse::new(status, salt, description, signature)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}
