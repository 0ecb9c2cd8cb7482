//! Payment initiation against a mock gateway.
//!
//! ```bash
//! cargo test --test payment_client_http
//! ```

use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{body_string_contains, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use platron_gateway::payments::config::GatewayConfigBuilder;
use platron_gateway::payments::{GatewayConfig, PaymentClient, PaymentGateway, PaymentRequest};
use platron_gateway::GatewayError;

fn client(
    server: &MockServer,
    configure: impl FnOnce(GatewayConfigBuilder) -> GatewayConfigBuilder,
) -> PaymentClient {
    let builder = GatewayConfig::builder("42", "topsecret")
        .base_url(server.uri())
        .result_url("https://shop.example/platron/result");
    let config = configure(builder).build().unwrap();
    PaymentClient::from_config(Arc::new(config)).unwrap()
}

fn request() -> PaymentRequest {
    PaymentRequest::new("order-1", dec!(10), "Order #1")
}

const OK_REPLY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<response>
  <pg_status>ok</pg_status>
  <pg_payment_id>15826</pg_payment_id>
  <pg_redirect_url>https://www.platron.ru/payment_params.php?customer=ccaa41a4f425d124a23c3a53a3140bdc15826</pg_redirect_url>
  <pg_redirect_url_type>need data</pg_redirect_url_type>
  <pg_salt>xyz</pg_salt>
  <pg_sig>0123456789abcdef</pg_sig>
</response>"#;

#[tokio::test]
async fn test_initiate_payment_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/init_payment.php"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("pg_amount=10.00"))
        .and(body_string_contains("pg_merchant_id=42"))
        .and(body_string_contains("pg_testing_mode=1"))
        .and(body_string_contains("pg_sig="))
        .respond_with(ResponseTemplate::new(200).set_body_string(OK_REPLY))
        .expect(1)
        .mount(&server)
        .await;

    let redirect = client(&server, |b| b).initiate_payment(request()).await.unwrap();

    assert_eq!(
        redirect.redirect_url,
        "https://www.platron.ru/payment_params.php?customer=ccaa41a4f425d124a23c3a53a3140bdc15826"
    );
    assert_eq!(redirect.payment_id.as_deref(), Some("15826"));
    assert_eq!(redirect.order_id, "order-1");
}

#[tokio::test]
async fn test_gateway_error_code_is_labelled() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/init_payment.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<response><pg_status>error</pg_status><pg_error_code>101</pg_error_code>\
             <pg_error_description>Incorrect merchant</pg_error_description></response>",
        ))
        .mount(&server)
        .await;

    let err = client(&server, |b| b).initiate_payment(request()).await.unwrap_err();

    match err {
        GatewayError::GatewayRejected {
            code,
            label,
            description,
        } => {
            assert_eq!(code, 101);
            assert_eq!(label, "Неверный номер магазина");
            assert_eq!(description, "Incorrect merchant");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/init_payment.php"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, |b| b).initiate_payment(request()).await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::GatewayUnavailable {
            status: Some(500),
            ..
        }
    ));
}

#[tokio::test]
async fn test_server_error_is_retried_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/init_payment.php"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server, |b| b.max_retries(1))
        .initiate_payment(request())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/init_payment.php"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, |b| b.max_retries(3))
        .initiate_payment(request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::GatewayUnavailable {
            status: Some(404),
            ..
        }
    ));
}

#[tokio::test]
async fn test_slow_gateway_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/init_payment.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(OK_REPLY)
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = client(&server, |b| b.request_timeout(Duration::from_millis(200)))
        .initiate_payment(request())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::GatewayUnavailable { status: None, .. }
    ));
}

#[tokio::test]
async fn test_malformed_reply_is_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/init_payment.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server, |b| b).initiate_payment(request()).await.unwrap_err();

    assert!(matches!(err, GatewayError::GatewayUnavailable { .. }));
}

#[tokio::test]
async fn test_invalid_request_never_reaches_gateway() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(OK_REPLY))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, |b| b)
        .initiate_payment(PaymentRequest::new("order-1", dec!(0), "Order #1"))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::InvalidRequest { .. }));
}
