//! Merchant credentials and gateway settings

use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::error::{GatewayError, GatewayResult};
use crate::payments::signature::{DigestAlgorithm, Endpoint, SecretKey};

pub const DEFAULT_BASE_URL: &str = "https://www.platron.ru";
pub const DEFAULT_CURRENCY: &str = "RUR";
pub const DEFAULT_REQUEST_METHOD: &str = "POST";
pub const DEFAULT_RESPONSE_METHOD: &str = "AUTOPOST";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_PREFIX: &str = "PLATRON";

/// Merchant pages the gateway calls back or redirects to. All absolute once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackUrls {
    pub result: Option<String>,
    pub success: Option<String>,
    pub failure: Option<String>,
    /// Page where the gateway asks whether the invoice can still be paid
    pub check: Option<String>,
    pub refund: Option<String>,
    pub capture: Option<String>,
    /// Page where the customer waits for the payment system response
    pub state: Option<String>,
    /// Page the customer returns to after a cash payment
    pub site_return: Option<String>,
}

/// Validated gateway configuration. Immutable after [`GatewayConfigBuilder::build`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    account_id: String,
    secret_key: SecretKey,
    currency: String,
    test_mode: bool,
    request_method: Option<String>,
    response_method: Option<String>,
    digest: DigestAlgorithm,
    base_url: Url,
    request_timeout: Duration,
    max_retries: u32,
    callbacks: CallbackUrls,
}

impl GatewayConfig {
    pub fn builder(
        account_id: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> GatewayConfigBuilder {
        GatewayConfigBuilder::new(account_id, secret_key)
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret_key
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn request_method(&self) -> Option<&str> {
        self.request_method.as_deref()
    }

    pub fn response_method(&self) -> Option<&str> {
        self.response_method.as_deref()
    }

    pub fn digest(&self) -> DigestAlgorithm {
        self.digest
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn callbacks(&self) -> &CallbackUrls {
        &self.callbacks
    }

    /// Absolute URL of a gateway script, e.g. `init_payment.php`.
    pub fn script_url(&self, script: &str) -> GatewayResult<Url> {
        self.base_url.join(script).map_err(|e| {
            GatewayError::configuration(format!("Invalid gateway script '{}': {}", script, e))
        })
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfigBuilder {
    account_id: String,
    secret_key: String,
    currency: String,
    test_mode: bool,
    request_method: Option<String>,
    response_method: Option<String>,
    digest: DigestAlgorithm,
    base_url: String,
    site_url: Option<String>,
    request_timeout: Duration,
    max_retries: u32,
    callbacks: CallbackUrls,
}

impl GatewayConfigBuilder {
    pub fn new(account_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            secret_key: secret_key.into(),
            currency: DEFAULT_CURRENCY.to_string(),
            test_mode: true,
            request_method: Some(DEFAULT_REQUEST_METHOD.to_string()),
            response_method: Some(DEFAULT_RESPONSE_METHOD.to_string()),
            digest: DigestAlgorithm::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            site_url: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 0,
            callbacks: CallbackUrls::default(),
        }
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Empty values leave the method out of outbound requests.
    pub fn request_method(mut self, method: impl Into<String>) -> Self {
        self.request_method = non_empty(method.into());
        self
    }

    pub fn response_method(mut self, method: impl Into<String>) -> Self {
        self.response_method = non_empty(method.into());
        self
    }

    pub fn digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Base for resolving relative callback URLs.
    pub fn site_url(mut self, site_url: impl Into<String>) -> Self {
        self.site_url = non_empty(site_url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn callbacks(mut self, callbacks: CallbackUrls) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn result_url(mut self, url: impl Into<String>) -> Self {
        self.callbacks.result = non_empty(url.into());
        self
    }

    pub fn success_url(mut self, url: impl Into<String>) -> Self {
        self.callbacks.success = non_empty(url.into());
        self
    }

    pub fn failure_url(mut self, url: impl Into<String>) -> Self {
        self.callbacks.failure = non_empty(url.into());
        self
    }

    pub fn check_url(mut self, url: impl Into<String>) -> Self {
        self.callbacks.check = non_empty(url.into());
        self
    }

    pub fn refund_url(mut self, url: impl Into<String>) -> Self {
        self.callbacks.refund = non_empty(url.into());
        self
    }

    pub fn capture_url(mut self, url: impl Into<String>) -> Self {
        self.callbacks.capture = non_empty(url.into());
        self
    }

    pub fn state_url(mut self, url: impl Into<String>) -> Self {
        self.callbacks.state = non_empty(url.into());
        self
    }

    pub fn site_return_url(mut self, url: impl Into<String>) -> Self {
        self.callbacks.site_return = non_empty(url.into());
        self
    }

    pub fn build(self) -> GatewayResult<GatewayConfig> {
        let account_id = self.account_id.trim().to_string();
        if account_id.is_empty() {
            return Err(GatewayError::configuration("accountId required"));
        }
        let secret_key = SecretKey::new(self.secret_key)?;

        let currency_pattern = Regex::new(r"^[A-Z]{3}$")
            .map_err(|e| GatewayError::configuration(format!("Currency pattern: {}", e)))?;
        if !currency_pattern.is_match(&self.currency) {
            return Err(GatewayError::configuration(format!(
                "Currency must be a 3-letter uppercase code, got '{}'",
                self.currency
            )));
        }

        // Scripts are joined onto the base, so it must end with a slash.
        let mut base = self.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            GatewayError::configuration(format!("Invalid gateway base URL '{}': {}", self.base_url, e))
        })?;

        if self.request_timeout.is_zero() {
            return Err(GatewayError::configuration("Request timeout must be greater than 0"));
        }

        let site_url = self
            .site_url
            .as_deref()
            .map(|s| {
                Url::parse(s).map_err(|e| {
                    GatewayError::configuration(format!("Invalid site URL '{}': {}", s, e))
                })
            })
            .transpose()?;

        let resolve = |url: Option<String>| -> GatewayResult<Option<String>> {
            url.map(|u| absolute_url(&u, site_url.as_ref())).transpose()
        };
        let callbacks = CallbackUrls {
            result: resolve(self.callbacks.result)?,
            success: resolve(self.callbacks.success)?,
            failure: resolve(self.callbacks.failure)?,
            check: resolve(self.callbacks.check)?,
            refund: resolve(self.callbacks.refund)?,
            capture: resolve(self.callbacks.capture)?,
            state: resolve(self.callbacks.state)?,
            site_return: resolve(self.callbacks.site_return)?,
        };

        // The result URL's last path segment is the endpoint callbacks are signed with.
        if let Some(result) = callbacks.result.as_deref() {
            Endpoint::from_url(result).map_err(|_| {
                GatewayError::configuration(format!(
                    "Result URL '{}' has no path segment to sign callbacks with",
                    result
                ))
            })?;
        }

        Ok(GatewayConfig {
            account_id,
            secret_key,
            currency: self.currency,
            test_mode: self.test_mode,
            request_method: self.request_method,
            response_method: self.response_method,
            digest: self.digest,
            base_url,
            request_timeout: self.request_timeout,
            max_retries: self.max_retries,
            callbacks,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn absolute_url(url: &str, site_url: Option<&Url>) -> GatewayResult<String> {
    match Url::parse(url) {
        Ok(absolute) => Ok(absolute.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let site_url = site_url.ok_or_else(|| {
                GatewayError::configuration(format!(
                    "Callback URL '{}' is relative but no site URL is configured",
                    url
                ))
            })?;
            site_url
                .join(url)
                .map(|u| u.to_string())
                .map_err(|e| GatewayError::configuration(format!("Invalid callback URL '{}': {}", url, e)))
        }
        Err(e) => Err(GatewayError::configuration(format!(
            "Invalid callback URL '{}': {}",
            url, e
        ))),
    }
}

/// Raw settings as read from the environment (`PLATRON_*`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySettings {
    pub account_id: Option<String>,
    pub secret_key: Option<String>,
    pub currency: Option<String>,
    pub test_mode: Option<bool>,
    pub request_method: Option<String>,
    pub response_method: Option<String>,
    pub digest: Option<String>,
    pub base_url: Option<String>,
    pub site_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub result_url: Option<String>,
    pub success_url: Option<String>,
    pub failure_url: Option<String>,
    pub check_url: Option<String>,
    pub refund_url: Option<String>,
    pub capture_url: Option<String>,
    pub state_url: Option<String>,
    pub site_return_url: Option<String>,
}

impl GatewaySettings {
    pub fn from_env() -> GatewayResult<Self> {
        let source = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| GatewayError::configuration(format!("Failed to read settings: {}", e)))?;

        Self::from_config(source)
    }

    pub fn from_config(source: config::Config) -> GatewayResult<Self> {
        source
            .try_deserialize()
            .map_err(|e| GatewayError::configuration(format!("Invalid gateway settings: {}", e)))
    }

    pub fn into_gateway_config(self) -> GatewayResult<GatewayConfig> {
        let account_id = self
            .account_id
            .ok_or_else(|| GatewayError::configuration("accountId required"))?;
        let secret_key = self
            .secret_key
            .ok_or_else(|| GatewayError::configuration("secretKey required"))?;

        let mut builder = GatewayConfigBuilder::new(account_id, secret_key);

        if let Some(currency) = self.currency {
            builder = builder.currency(currency);
        }
        if let Some(test_mode) = self.test_mode {
            builder = builder.test_mode(test_mode);
        }
        if let Some(method) = self.request_method {
            builder = builder.request_method(method);
        }
        if let Some(method) = self.response_method {
            builder = builder.response_method(method);
        }
        if let Some(digest) = self.digest {
            builder = builder.digest(digest.parse()?);
        }
        if let Some(base_url) = self.base_url {
            builder = builder.base_url(base_url);
        }
        if let Some(site_url) = self.site_url {
            builder = builder.site_url(site_url);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(max_retries) = self.max_retries {
            builder = builder.max_retries(max_retries);
        }

        builder
            .callbacks(CallbackUrls {
                result: self.result_url,
                success: self.success_url,
                failure: self.failure_url,
                check: self.check_url,
                refund: self.refund_url,
                capture: self.capture_url,
                state: self.state_url,
                site_return: self.site_return_url,
            })
            .build()
    }
}
