//! Platron payment gateway integration.
//!
//! Builds signed payment-initiation requests, verifies and dispatches the
//! gateway's result notifications inside a transactional scope, and serves
//! both over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod payments;

#[cfg(feature = "database")]
pub mod database;

pub use error::{GatewayError, GatewayResult};
pub use payments::{
    CallbackProcessor, CallbackResponse, Disposition, GatewayConfig, GatewayEvent, ParameterSet,
    PaymentClient, PaymentGateway, PaymentRequest,
};
