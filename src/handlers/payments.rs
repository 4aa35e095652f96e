use crate::config::security_config::Claims;
use crate::error::ApiError;
use crate::models::dtos::{PaymentRequest, PaymentResponse, PaymentStatusResponse};
use crate::models::AppState;
use crate::repositories::intent_repository::IntentRepository;
use crate::services::settlement_service::SettlementService;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

fn parse_user_id(claims: &Claims) -> Result<Uuid, ApiError> {
    Uuid::parse_str(&claims.sub).map_err(|e| {
        error!("Invalid user ID in token: {}", e);
        ApiError::Auth("Invalid user ID".to_string())
    })
}

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = PaymentRequest,
    responses(
        (status = 200, description = "Payment settled (wallet) or checkout created (card)", body = PaymentResponse),
        (status = 400, description = "Invalid request or insufficient funds"),
        (status = 401, description = "Unauthorized"),
        (status = 502, description = "Checkout provider unavailable")
    ),
    security(("bearerAuth" = [])),
    tag = "Payments"
)]
pub async fn request_payment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<PaymentResponse>, (StatusCode, String)> {
    req.validate().map_err(ApiError::Validation)?;
    let user_id = parse_user_id(&claims)?;

    info!(
        "Payment request: user {}, {} kobo, purpose {}, method {}",
        user_id, req.amount_kobo, req.purpose, req.method
    );

    let response = SettlementService::request_payment(&state, user_id, &claims.email, &req).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/payments/{payment_id}",
    params(("payment_id" = Uuid, Path, description = "Payment intent id")),
    responses(
        (status = 200, description = "Payment status", body = PaymentStatusResponse),
        (status = 404, description = "Unknown payment"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<PaymentStatusResponse>, (StatusCode, String)> {
    let user_id = parse_user_id(&claims)?;

    let mut conn = state.db.get().map_err(|e| {
        error!("payments.get: failed to acquire db connection: {}", e);
        ApiError::DatabaseConnection(e.to_string())
    })?;

    let intent = IntentRepository::find_by_id_and_user(&mut conn, payment_id, user_id)?
        .ok_or((StatusCode::NOT_FOUND, "Payment not found".to_string()))?;

    Ok(Json(PaymentStatusResponse::from(intent)))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct VerifyParams {
    /// Block and poll until the payment is terminal or the configured
    /// timeout lapses, instead of a single verification pass.
    #[serde(default)]
    pub wait: bool,
}

#[utoipa::path(
    post,
    path = "/api/payments/{payment_id}/verify",
    params(
        ("payment_id" = Uuid, Path, description = "Payment intent id"),
        VerifyParams
    ),
    responses(
        (status = 200, description = "Current payment state after verification", body = PaymentStatusResponse),
        (status = 404, description = "Unknown payment"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(payment_id): Path<Uuid>,
    Query(params): Query<VerifyParams>,
) -> Result<Json<PaymentStatusResponse>, (StatusCode, String)> {
    let user_id = parse_user_id(&claims)?;

    // Ownership check before any provider round-trip.
    {
        let mut conn = state.db.get().map_err(|e| {
            error!("payments.verify: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;
        IntentRepository::find_by_id_and_user(&mut conn, payment_id, user_id)?
            .ok_or((StatusCode::NOT_FOUND, "Payment not found".to_string()))?;
    }

    let intent = if params.wait {
        SettlementService::poll_until_settled(&state, payment_id).await?
    } else {
        SettlementService::confirm_completion(&state, &payment_id.to_string()).await?
    };

    Ok(Json(PaymentStatusResponse::from(intent)))
}
