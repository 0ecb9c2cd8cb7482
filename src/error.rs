use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors produced while talking to the payment gateway or processing its callbacks.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or malformed merchant configuration. Never recoverable at runtime.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Invalid payment request: {message}")]
    InvalidRequest { message: String },

    /// Callback signature did not match the recomputed digest.
    #[error("Invalid callback signature for endpoint '{endpoint}'")]
    ForbiddenSignature { endpoint: String },

    #[error("Payment gateway unavailable: {message}")]
    GatewayUnavailable { status: Option<u16>, message: String },

    #[error("Payment gateway rejected request: {label} ({code}): {description}")]
    GatewayRejected {
        code: u32,
        label: &'static str,
        description: String,
    },

    /// Business handler failure during callback dispatch. The transaction was rolled back.
    #[error("Error processing notification: {message}")]
    Processing { message: String },
}

impl GatewayError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn forbidden_signature(endpoint: impl Into<String>) -> Self {
        Self::ForbiddenSignature {
            endpoint: endpoint.into(),
        }
    }

    pub fn unavailable(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::GatewayUnavailable {
            status,
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    /// Whether repeating the same operation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::GatewayUnavailable { .. } | GatewayError::Processing { .. }
        )
    }

    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;

        match self {
            GatewayError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            GatewayError::ForbiddenSignature { .. } => StatusCode::FORBIDDEN,
            GatewayError::GatewayUnavailable { .. } | GatewayError::GatewayRejected { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Processing { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
