use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::payments::traits::AtomicScope;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub account_id: String,
    pub test_mode: bool,
    pub currency: String,
}

pub async fn health_check<S, H>(State(state): State<AppState<S, H>>) -> Json<HealthResponse>
where
    S: AtomicScope,
{
    let config = state.processor.config();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        account_id: config.account_id().to_string(),
        test_mode: config.test_mode(),
        currency: config.currency().to_string(),
    })
}
