//! Payment gateway integration module
//!
//! Signs and verifies gateway messages, initiates payments and processes the
//! gateway's asynchronous result notifications.

pub mod callback;
pub mod client;
pub mod codes;
pub mod config;
pub mod signature;
pub mod traits;
pub mod transport;
pub mod types;
pub mod wire;

pub use callback::CallbackProcessor;
pub use client::PaymentClient;
pub use config::{GatewayConfig, GatewaySettings};
pub use signature::{DigestAlgorithm, Endpoint, SecretKey, SignatureEngine};
pub use traits::{AtomicScope, GatewayTransport, NotificationHandler, PaymentGateway, SaltSource};
pub use types::{
    CallbackResponse, Disposition, GatewayEvent, ParamValue, ParameterSet, PaymentRedirect,
    PaymentRequest, ResponseStatus,
};
