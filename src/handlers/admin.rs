use crate::config::security_config::Claims;
use crate::error::ApiError;
use crate::models::dtos::{
    AdminAdjustmentRequest, AdminAdjustmentResponse, RefundRequest, RefundResponse,
};
use crate::models::AppState;
use crate::services::refund_service::RefundService;
use crate::services::wallet_service::WalletService;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;
use validator::Validate;

fn require_admin(claims: &Claims) -> Result<Uuid, ApiError> {
    if !claims.is_admin() {
        warn!("Non-admin {} attempted a back-office operation", claims.sub);
        return Err(ApiError::Auth("Admin role required".to_string()));
    }
    Uuid::parse_str(&claims.sub).map_err(|e| {
        error!("Invalid admin ID in token: {}", e);
        ApiError::Auth("Invalid user ID".to_string())
    })
}

#[utoipa::path(
    post,
    path = "/api/payments/{payment_id}/refund",
    params(("payment_id" = Uuid, Path, description = "Payment intent id")),
    request_body = RefundRequest,
    responses(
        (status = 200, description = "Payment refunded", body = RefundResponse),
        (status = 400, description = "Payment not refundable"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown payment"),
        (status = 502, description = "Provider refund failed")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn refund_payment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Path(payment_id): Path<Uuid>,
    Json(req): Json<RefundRequest>,
) -> Result<Json<RefundResponse>, (StatusCode, String)> {
    let admin_id = require_admin(&claims)?;
    req.validate().map_err(ApiError::Validation)?;

    let response = RefundService::refund(&state, admin_id, payment_id, &req).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/admin/wallet_adjustment",
    request_body = AdminAdjustmentRequest,
    responses(
        (status = 200, description = "Wallet adjusted", body = AdminAdjustmentResponse),
        (status = 400, description = "Invalid adjustment"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Admin"
)]
pub async fn wallet_adjustment(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AdminAdjustmentRequest>,
) -> Result<Json<AdminAdjustmentResponse>, (StatusCode, String)> {
    let admin_id = require_admin(&claims)?;
    req.validate().map_err(ApiError::Validation)?;

    let balance_kobo =
        WalletService::admin_adjust(&state, admin_id, req.user_id, req.amount_kobo, &req.reason)?;

    Ok(Json(AdminAdjustmentResponse {
        user_id: req.user_id,
        balance_kobo,
    }))
}
