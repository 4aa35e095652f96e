use crate::config::security_config::Claims;
use crate::error::ApiError;
use crate::models::dtos::{LedgerHistoryResponse, WalletResponse};
use crate::models::AppState;
use crate::services::wallet_service::WalletService;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::IntoParams;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/wallet",
    responses(
        (status = 200, description = "Wallet balance", body = WalletResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<WalletResponse>, (StatusCode, String)> {
    let user_id = Uuid::parse_str(&claims.sub).map_err(|e| {
        error!("Invalid user ID in token: {}", e);
        ApiError::Auth("Invalid user ID".to_string())
    })?;

    let wallet = WalletService::get_wallet(&state, user_id)?;
    Ok(Json(wallet))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct LedgerParams {
    /// Most recent entries first; capped at 200.
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/wallet/ledger",
    params(LedgerParams),
    responses(
        (status = 200, description = "Ledger history, most recent first", body = LedgerHistoryResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearerAuth" = [])),
    tag = "Wallet"
)]
pub async fn get_ledger(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<LedgerParams>,
) -> Result<Json<LedgerHistoryResponse>, (StatusCode, String)> {
    let user_id = Uuid::parse_str(&claims.sub).map_err(|e| {
        error!("Invalid user ID in token: {}", e);
        ApiError::Auth("Invalid user ID".to_string())
    })?;

    let limit = params.limit.unwrap_or(50).clamp(1, 200);
    let history = WalletService::ledger_history(&state, user_id, limit)?;
    Ok(Json(history))
}
