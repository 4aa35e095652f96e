use crate::clients::paystack::verify_signature;
use crate::error::ApiError;
use crate::models::AppState;
use crate::services::settlement_service::SettlementService;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
pub struct PaystackWebhook {
    pub event: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub reference: String,
    #[serde(default)]
    pub gateway_response: Option<String>,
}

/// Receives Paystack event deliveries. Kept off the OpenAPI surface: the body
/// must stay raw bytes for signature verification, and the endpoint is for
/// the provider, not API consumers.
pub async fn paystack_webhook(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, String)> {
    let signature = headers
        .get("x-paystack-signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            error!("Missing or invalid Paystack signature header");
            ApiError::BadRequest("Missing or invalid signature".to_string())
        })?;

    // Verified over the raw body: re-serialized JSON would not round-trip.
    verify_signature(
        state.config.paystack.webhook_secret.expose_secret(),
        &body,
        signature,
    )?;

    let payload: PaystackWebhook = serde_json::from_slice(&body).map_err(|e| {
        error!("Failed to parse webhook payload: {}", e);
        ApiError::BadRequest("Invalid webhook payload".to_string())
    })?;

    debug!("Received Paystack webhook event: {}", payload.event);

    match payload.event.as_str() {
        "charge.success" => {
            // Providers redeliver webhooks; confirm_completion is idempotent
            // and a duplicate degrades to a logged no-op.
            match SettlementService::confirm_completion(&state, &payload.data.reference).await {
                Ok(intent) => {
                    info!(
                        "Webhook settled payment {} (state {})",
                        intent.id, intent.state
                    );
                }
                Err(ApiError::AlreadySettled(id)) => {
                    info!("Webhook replay for already-settled payment {}", id);
                }
                Err(e) => return Err(e.into()),
            }
        }
        "charge.failed" => {
            let reason = payload
                .data
                .gateway_response
                .as_deref()
                .unwrap_or("charge failed");
            SettlementService::fail_from_provider(&state, &payload.data.reference, reason)?;
        }
        other => {
            debug!("Ignored Paystack event: {}", other);
        }
    }

    Ok(StatusCode::OK)
}
