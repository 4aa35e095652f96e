use reelpay::models::dtos::{PaymentRequest, RefundRequest, MIN_CHARGE_KOBO};
use serde_json::json;
use validator::Validate;

fn request(value: serde_json::Value) -> PaymentRequest {
    serde_json::from_value(value).expect("valid request JSON")
}

#[test]
fn accepts_minimal_topup() {
    let req = request(json!({
        "amount_kobo": 5000,
        "purpose": "wallet_topup",
        "method": "card",
        "idempotency_key": "key-12345678"
    }));
    assert!(req.validate().is_ok());
    assert!(req.validate_shape().is_ok());
    assert_eq!(req.currency, "NGN");
}

#[test]
fn rejects_amount_below_minimum() {
    let req = request(json!({
        "amount_kobo": MIN_CHARGE_KOBO - 1,
        "purpose": "wallet_topup",
        "method": "card",
        "idempotency_key": "key-12345678"
    }));
    assert!(req.validate().is_err());
}

#[test]
fn rejects_short_idempotency_key() {
    let req = request(json!({
        "amount_kobo": 5000,
        "purpose": "wallet_topup",
        "method": "card",
        "idempotency_key": "short"
    }));
    assert!(req.validate().is_err());
}

#[test]
fn rejects_topup_from_wallet() {
    let req = request(json!({
        "amount_kobo": 5000,
        "purpose": "wallet_topup",
        "method": "wallet",
        "idempotency_key": "key-12345678"
    }));
    assert!(req.validate().is_ok());
    assert!(req.validate_shape().is_err());
}

#[test]
fn rejects_rental_without_content() {
    let req = request(json!({
        "amount_kobo": 50000,
        "purpose": "rental",
        "method": "card",
        "idempotency_key": "key-12345678"
    }));
    assert!(req.validate_shape().is_err());
}

#[test]
fn accepts_rental_with_content_and_duration() {
    let req = request(json!({
        "amount_kobo": 50000,
        "purpose": "rental",
        "method": "wallet",
        "idempotency_key": "key-12345678",
        "content_id": "movie-42",
        "content_type": "movie",
        "rental_duration_hours": 72
    }));
    assert!(req.validate().is_ok());
    assert!(req.validate_shape().is_ok());
}

#[test]
fn rejects_rental_duration_out_of_range() {
    let req = request(json!({
        "amount_kobo": 50000,
        "purpose": "rental",
        "method": "card",
        "idempotency_key": "key-12345678",
        "content_id": "movie-42",
        "content_type": "movie",
        "rental_duration_hours": 10000
    }));
    assert!(req.validate().is_err());
}

#[test]
fn rejects_topup_carrying_content() {
    let req = request(json!({
        "amount_kobo": 5000,
        "purpose": "wallet_topup",
        "method": "card",
        "idempotency_key": "key-12345678",
        "content_id": "movie-42",
        "content_type": "movie"
    }));
    assert!(req.validate_shape().is_err());
}

#[test]
fn rejects_unsupported_currency() {
    let req = request(json!({
        "amount_kobo": 5000,
        "currency": "USD",
        "purpose": "wallet_topup",
        "method": "card",
        "idempotency_key": "key-12345678"
    }));
    assert!(req.validate_shape().is_err());
}

#[test]
fn metadata_carries_content_fields() {
    let req = request(json!({
        "amount_kobo": 100000,
        "purpose": "purchase",
        "method": "card",
        "idempotency_key": "key-12345678",
        "content_id": "series-7",
        "content_type": "series"
    }));

    let metadata = req.metadata();
    assert_eq!(metadata["content_id"], "series-7");
    assert_eq!(metadata["content_type"], "series");
    assert!(metadata["rental_duration_hours"].is_null());
}

#[test]
fn refund_request_validation() {
    let req: RefundRequest = serde_json::from_value(json!({
        "reason": "customer complaint",
        "amount_kobo": 2500
    }))
    .unwrap();
    assert!(req.validate().is_ok());

    let req: RefundRequest = serde_json::from_value(json!({ "reason": "ok" })).unwrap();
    assert!(req.validate().is_err());

    let req: RefundRequest = serde_json::from_value(json!({
        "reason": "negative amount",
        "amount_kobo": 0
    }))
    .unwrap();
    assert!(req.validate().is_err());
}
