use http::StatusCode;
use reelpay::error::ApiError;
use uuid::Uuid;

fn status_of(err: ApiError) -> StatusCode {
    let (status, _): (StatusCode, String) = err.into();
    status
}

#[test]
fn not_found_maps_to_404() {
    let err = ApiError::Database(diesel::result::Error::NotFound);
    let (status, body): (StatusCode, String) = err.into();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Record not found");
}

#[test]
fn bad_request_maps_to_400() {
    assert_eq!(
        status_of(ApiError::BadRequest("bad combination".into())),
        StatusCode::BAD_REQUEST
    );
}

#[test]
fn insufficient_funds_maps_to_400_without_leaking_balance() {
    let err = ApiError::InsufficientFunds {
        available_kobo: 150,
        required_kobo: 5000,
    };
    let (status, body): (StatusCode, String) = err.into();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.contains("150"));
}

#[test]
fn provider_failure_maps_to_502() {
    assert_eq!(
        status_of(ApiError::Provider("connection reset".into())),
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn already_settled_maps_to_200() {
    // Replayed webhooks and verify calls must not look like failures.
    assert_eq!(
        status_of(ApiError::AlreadySettled(Uuid::new_v4())),
        StatusCode::OK
    );
}

#[test]
fn reconciliation_required_maps_to_500() {
    let id = Uuid::new_v4();
    let (status, body): (StatusCode, String) = ApiError::ReconciliationRequired(id).into();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains(&id.to_string()));
}

#[test]
fn auth_failure_maps_to_401() {
    assert_eq!(
        status_of(ApiError::Auth("missing token".into())),
        StatusCode::UNAUTHORIZED
    );
}

#[test]
fn database_connection_maps_to_500() {
    assert_eq!(
        status_of(ApiError::DatabaseConnection("pool timeout".into())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn display_messages_are_descriptive() {
    let err = ApiError::InsufficientFunds {
        available_kobo: 150,
        required_kobo: 5000,
    };
    let msg = err.to_string();
    assert!(msg.contains("150"));
    assert!(msg.contains("5000"));

    let id = Uuid::new_v4();
    assert!(ApiError::AlreadySettled(id).to_string().contains(&id.to_string()));
}
