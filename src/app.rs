use axum::{middleware, Router};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::security_config::auth_middleware;
use crate::config::swagger_config::ApiDoc;
use crate::handlers::{
    admin::{refund_payment, wallet_adjustment},
    health::health,
    payments::{get_payment, request_payment, verify_payment},
    paystack_webhook::paystack_webhook,
    wallet::{get_ledger, get_wallet},
};
use crate::models::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Public routes (no authentication)
    let public_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", axum::routing::get(health))
        .route("/webhooks/paystack", axum::routing::post(paystack_webhook));

    // Protected routes (require JWT authentication)
    let protected_router = Router::new()
        .route("/api/payments", axum::routing::post(request_payment))
        .route("/api/payments/{payment_id}", axum::routing::get(get_payment))
        .route(
            "/api/payments/{payment_id}/verify",
            axum::routing::post(verify_payment),
        )
        .route(
            "/api/payments/{payment_id}/refund",
            axum::routing::post(refund_payment),
        )
        .route("/api/wallet", axum::routing::get(get_wallet))
        .route("/api/wallet/ledger", axum::routing::get(get_ledger))
        .route(
            "/api/admin/wallet_adjustment",
            axum::routing::post(wallet_adjustment),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_router)
        .merge(protected_router)
        .with_state(state)
}
