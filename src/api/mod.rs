//! HTTP surface: health, payment redirect and the gateway result callback.

pub mod callback;
pub mod health;
pub mod payments;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::error;
use url::Url;

use crate::error::GatewayError;
use crate::payments::traits::{AtomicScope, NotificationHandler, PaymentGateway};
use crate::payments::CallbackProcessor;

pub const DEFAULT_RESULT_PATH: &str = "/platron/result";

/// Shared state of the gateway routes.
pub struct AppState<S: AtomicScope, H> {
    pub gateway: Arc<dyn PaymentGateway>,
    pub processor: Arc<CallbackProcessor<S>>,
    pub handler: Arc<H>,
}

impl<S: AtomicScope, H> Clone for AppState<S, H> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            processor: Arc::clone(&self.processor),
            handler: Arc::clone(&self.handler),
        }
    }
}

pub fn router<S, H>(state: AppState<S, H>) -> Router
where
    S: AtomicScope + 'static,
    H: NotificationHandler<S::Transaction> + 'static,
{
    let result_path = state
        .processor
        .config()
        .callbacks()
        .result
        .as_deref()
        .and_then(|u| Url::parse(u).ok())
        .map(|u| u.path().to_string())
        .unwrap_or_else(|| DEFAULT_RESULT_PATH.to_string());

    Router::new()
        .route("/health", get(health::health_check::<S, H>))
        .route("/payments", post(payments::create_payment::<S, H>))
        .route(
            &result_path,
            get(callback::result_query::<S, H>).post(callback::result_form::<S, H>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            GatewayError::ForbiddenSignature { .. } => "Hash error".to_string(),
            GatewayError::Processing { .. } => "Error processing request".to_string(),
            GatewayError::Configuration { .. } => {
                error!("Configuration error while serving request: {}", self);
                "Gateway misconfigured".to_string()
            }
            other => other.to_string(),
        };

        (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response()
    }
}
