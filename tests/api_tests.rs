mod common;

use axum_test::TestServer;
use hmac::{Hmac, Mac};
use http::StatusCode;
use serde_json::json;
use sha2::Sha512;

fn test_server() -> TestServer {
    let state = common::create_test_app_state();
    TestServer::new(common::create_test_app(state)).expect("Failed to start test server")
}

fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[tokio::test]
async fn health_check_works() {
    let server = test_server();

    let response = server.get("/api/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn payments_require_authentication() {
    let server = test_server();

    let response = server
        .post("/api/payments")
        .json(&json!({
            "amount_kobo": 5000,
            "purpose": "wallet_topup",
            "method": "card",
            "idempotency_key": "key-12345678"
        }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wallet_requires_authentication() {
    let server = test_server();

    let response = server.get("/api/wallet").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server.get("/api/wallet/ledger").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_bearer_token_is_rejected() {
    let server = test_server();

    let response = server
        .get("/api/wallet")
        .add_header("Authorization", "Bearer not-a-jwt")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_without_signature_is_rejected() {
    let server = test_server();

    let response = server
        .post("/webhooks/paystack")
        .json(&json!({
            "event": "charge.success",
            "data": { "reference": "ref-123" }
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_rejected() {
    let server = test_server();

    let body = json!({
        "event": "charge.success",
        "data": { "reference": "ref-123" }
    })
    .to_string();

    let response = server
        .post("/webhooks/paystack")
        .add_header("x-paystack-signature", "deadbeef")
        .add_header("content-type", "application/json")
        .bytes(body.into_bytes().into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_ignores_unhandled_events() {
    let server = test_server();

    let body = json!({
        "event": "transfer.success",
        "data": { "reference": "ref-123" }
    })
    .to_string();
    let signature = sign("whsec_test_fake_secret", body.as_bytes());

    let response = server
        .post("/webhooks/paystack")
        .add_header("x-paystack-signature", signature)
        .add_header("content-type", "application/json")
        .bytes(body.into_bytes().into())
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn webhook_rejects_unparseable_payload() {
    let server = test_server();

    let body = b"not json at all".to_vec();
    let signature = sign("whsec_test_fake_secret", &body);

    let response = server
        .post("/webhooks/paystack")
        .add_header("x-paystack-signature", signature)
        .bytes(body.into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn swagger_ui_is_mounted() {
    let server = test_server();

    let response = server.get("/api-docs/openapi.json").await;
    response.assert_status_ok();
}
