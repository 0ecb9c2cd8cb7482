//! Outbound payment initiation
//!
//! Builds the signed `init_payment.php` request, sends it through the
//! configured transport and turns the gateway's XML answer into a redirect
//! URL or a typed error.

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{GatewayError, GatewayResult};
use crate::payments::codes::error_code_label;
use crate::payments::config::GatewayConfig;
use crate::payments::signature::{Endpoint, OsRngSalt, SignatureEngine, INIT_PAYMENT_SCRIPT};
use crate::payments::traits::{GatewayTransport, PaymentGateway, SaltSource, TransportResponse};
use crate::payments::transport::ReqwestTransport;
use crate::payments::types::{ParameterSet, PaymentRedirect, PaymentRequest};
use crate::payments::wire::InitPaymentReply;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Fixed-point amount with exactly two fraction digits and a `.` separator.
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.to_string()
}

pub struct PaymentClient {
    config: Arc<GatewayConfig>,
    engine: SignatureEngine,
    transport: Arc<dyn GatewayTransport>,
    salts: Arc<dyn SaltSource>,
}

impl PaymentClient {
    pub fn new(
        config: Arc<GatewayConfig>,
        transport: Arc<dyn GatewayTransport>,
        salts: Arc<dyn SaltSource>,
    ) -> Self {
        let engine = SignatureEngine::new(config.digest());
        Self {
            config,
            engine,
            transport,
            salts,
        }
    }

    /// Client with the reqwest transport and OS random salts.
    pub fn from_config(config: Arc<GatewayConfig>) -> GatewayResult<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::new(config, Arc::new(transport), Arc::new(OsRngSalt)))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Signed parameter set for `init_payment.php`.
    pub fn build_init_params(&self, request: &PaymentRequest) -> GatewayResult<ParameterSet> {
        if request.invoice_id.trim().is_empty() {
            return Err(GatewayError::invalid_request("Invoice id cannot be empty"));
        }
        if request.description.trim().is_empty() {
            return Err(GatewayError::invalid_request("Payment description cannot be empty"));
        }
        if request.amount <= Decimal::ZERO {
            return Err(GatewayError::invalid_request(format!(
                "Amount must be positive, got {}",
                request.amount
            )));
        }

        let config = &self.config;
        let callbacks = config.callbacks();
        let response_method = config.response_method();

        // Opaque extras first so the protocol fields always win.
        let mut params = request.extra.clone();
        params
            .insert("pg_merchant_id", config.account_id())
            .insert("pg_description", request.description.as_str())
            .insert("pg_amount", format_amount(request.amount))
            .insert("pg_salt", self.salts.generate())
            .insert("pg_order_id", request.invoice_id.as_str())
            .insert("pg_currency", config.currency())
            .insert("pg_check_url", callbacks.check.as_deref())
            .insert("pg_result_url", callbacks.result.as_deref())
            .insert("pg_refund_url", callbacks.refund.as_deref())
            .insert("pg_capture_url", callbacks.capture.as_deref())
            .insert("pg_success_url", callbacks.success.as_deref())
            .insert("pg_failure_url", callbacks.failure.as_deref())
            .insert("pg_site_url", callbacks.site_return.as_deref())
            .insert("pg_state_url", callbacks.state.as_deref())
            .insert("pg_request_method", config.request_method())
            .insert("pg_success_url_method", response_method)
            .insert("pg_failure_url_method", response_method)
            .insert("pg_state_url_method", response_method)
            // Live mode omits the flag entirely instead of sending 0.
            .insert("pg_testing_mode", config.test_mode().then_some(true));

        self.engine
            .attach(&Endpoint::init_payment(), &mut params, config.secret_key());

        Ok(params)
    }

    async fn send_with_retries(&self, script: &str, params: &ParameterSet) -> GatewayResult<TransportResponse> {
        let url = self.config.script_url(script)?;
        let form = params.to_wire_pairs();
        let max_retries = self.config.max_retries();

        let mut attempt = 0;
        loop {
            let outcome = self.transport.post_form(url.as_str(), &form).await;

            let failure = match outcome {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    let err = GatewayError::unavailable(
                        Some(response.status),
                        format!("Gateway HTTP error: {}", response.status),
                    );
                    // Client errors will not change on retry.
                    if response.status < 500 {
                        return Err(err);
                    }
                    err
                }
                Err(err) => err,
            };

            if attempt >= max_retries || !failure.is_retryable() {
                error!("Gateway call to {} failed: {}", script, failure);
                return Err(failure);
            }

            let backoff = RETRY_BASE_DELAY * 2_u32.pow(attempt);
            warn!(
                "Gateway call to {} failed, retrying after {:?} (attempt {}): {}",
                script,
                backoff,
                attempt + 1,
                failure
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl PaymentGateway for PaymentClient {
    async fn initiate_payment(&self, request: PaymentRequest) -> GatewayResult<PaymentRedirect> {
        info!(
            "Initiating payment: order_id={} amount={} {}",
            request.invoice_id,
            format_amount(request.amount),
            self.config.currency()
        );

        let params = self.build_init_params(&request)?;
        let response = self.send_with_retries(INIT_PAYMENT_SCRIPT, &params).await?;
        let reply = InitPaymentReply::parse(&response.body)?;

        if !reply.is_ok() {
            let code = reply.error_code();
            let label = error_code_label(code);
            let description = reply.pg_error_description.unwrap_or_default();
            error!(
                "Gateway rejected payment: order_id={} code={} label={} description={}",
                request.invoice_id, code, label, description
            );
            return Err(GatewayError::GatewayRejected {
                code,
                label,
                description,
            });
        }

        let redirect_url = reply
            .pg_redirect_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                GatewayError::unavailable(
                    Some(response.status),
                    "Gateway response has no pg_redirect_url",
                )
            })?;

        info!(
            "Payment initiated: order_id={} payment_id={}",
            request.invoice_id,
            reply.pg_payment_id.as_deref().unwrap_or("-")
        );

        Ok(PaymentRedirect {
            redirect_url: redirect_url.trim().to_string(),
            payment_id: reply.pg_payment_id,
            order_id: request.invoice_id,
        })
    }
}
