//! HTTP transport to the gateway
//!
//! Posts form-encoded requests through reqwest. Only network failures and
//! timeouts are errors here; status handling belongs to the client.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::{GatewayError, GatewayResult};
use crate::payments::traits::{GatewayTransport, TransportResponse};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// `GatewayTransport` over a pooled reqwest client with a hard request timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("platron-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                GatewayError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl GatewayTransport for ReqwestTransport {
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> GatewayResult<TransportResponse> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form.iter())
            .finish();

        debug!("POST {} ({} fields)", url, form.len());

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::unavailable(
                        None,
                        format!("Request timed out after {:?}", self.timeout),
                    )
                } else {
                    GatewayError::unavailable(
                        e.status().map(|s| s.as_u16()),
                        format!("Request failed: {}", e),
                    )
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            GatewayError::unavailable(Some(status), format!("Failed to read response body: {}", e))
        })?;

        Ok(TransportResponse { status, body })
    }
}
