use axum::extract::State;
use axum::response::Redirect;
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::api::AppState;
use crate::error::GatewayResult;
use crate::payments::traits::AtomicScope;
use crate::payments::types::PaymentRequest;

#[derive(Debug, Deserialize)]
pub struct CreatePayment {
    pub invoice_id: String,
    pub amount: Decimal,
    pub description: String,
}

/// Registers the payment and sends the customer to the gateway's payment page.
pub async fn create_payment<S, H>(
    State(state): State<AppState<S, H>>,
    Json(body): Json<CreatePayment>,
) -> GatewayResult<Redirect>
where
    S: AtomicScope,
{
    let request = PaymentRequest::new(body.invoice_id, body.amount, body.description);
    let redirect = state.gateway.initiate_payment(request).await?;

    Ok(Redirect::to(&redirect.redirect_url))
}
