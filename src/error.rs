use axum::response::{IntoResponse, Response};
use diesel::r2d2;
use http::StatusCode;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    Database(diesel::result::Error),
    DatabaseConnection(String),
    Validation(validator::ValidationErrors),
    /// Request-level validation that does not come from the derive layer
    /// (amount below minimum, bad purpose/method combination, ...).
    BadRequest(String),
    InsufficientFunds { available_kobo: i64, required_kobo: i64 },
    /// Checkout initialization, verification or refund call failed.
    Provider(String),
    Payment(String),
    /// A webhook or poll arrived for an intent already in a terminal state.
    /// Treated as a no-op by callers, never surfaced to the end user.
    AlreadySettled(uuid::Uuid),
    /// Money moved but the corresponding grant (or reversal) could not be
    /// applied. A reconciliation task has been persisted before this is raised.
    ReconciliationRequired(uuid::Uuid),
    Auth(String),
    Token(String),
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Database(e) => write!(f, "Database error: {}", e),
            ApiError::DatabaseConnection(e) => write!(f, "Database connection error: {}", e),
            ApiError::Validation(e) => write!(f, "Validation error: {}", e),
            ApiError::BadRequest(e) => write!(f, "Invalid request: {}", e),
            ApiError::InsufficientFunds {
                available_kobo,
                required_kobo,
            } => write!(
                f,
                "Insufficient funds: available {} kobo, required {} kobo",
                available_kobo, required_kobo
            ),
            ApiError::Provider(e) => write!(f, "Provider error: {}", e),
            ApiError::Payment(e) => write!(f, "Payment error: {}", e),
            ApiError::AlreadySettled(id) => write!(f, "Payment {} already settled", id),
            ApiError::ReconciliationRequired(id) => {
                write!(f, "Payment {} requires reconciliation", id)
            }
            ApiError::Auth(e) => write!(f, "Authentication error: {}", e),
            ApiError::Token(e) => write!(f, "Token error: {}", e),
            ApiError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Database(e) => Some(e),
            ApiError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(err: r2d2::Error) -> Self {
        ApiError::DatabaseConnection(err.to_string())
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        ApiError::Database(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation(err)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Provider(err.to_string())
    }
}

impl From<ApiError> for (StatusCode, String) {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Database(e) => match e {
                diesel::result::Error::NotFound => {
                    (StatusCode::NOT_FOUND, "Record not found".to_string())
                }
                diesel::result::Error::DatabaseError(
                    diesel::result::DatabaseErrorKind::UniqueViolation,
                    _,
                ) => (StatusCode::CONFLICT, format!("Conflict: {}", e)),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Database error: {}", e),
                ),
            },
            ApiError::DatabaseConnection(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database connection error: {}", e),
            ),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                format!("Validation error: {}", errors),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InsufficientFunds { .. } => {
                (StatusCode::BAD_REQUEST, "Insufficient funds".to_string())
            }
            ApiError::Provider(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Payment provider error: {}", msg),
            ),
            ApiError::Payment(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Payment error: {}", msg),
            ),
            ApiError::AlreadySettled(_) => {
                (StatusCode::OK, "Payment already settled".to_string())
            }
            ApiError::ReconciliationRequired(id) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Payment {} queued for reconciliation", id),
            ),
            ApiError::Auth(msg) => (StatusCode::UNAUTHORIZED, format!("Auth error: {}", msg)),
            ApiError::Token(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Token error: {}", msg),
            ),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal error: {}", msg),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body): (StatusCode, String) = self.into();
        (status, body).into_response()
    }
}
