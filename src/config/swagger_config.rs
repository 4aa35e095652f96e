use crate::handlers::{
    admin::{__path_refund_payment, __path_wallet_adjustment},
    health::__path_health,
    payments::{__path_get_payment, __path_request_payment, __path_verify_payment},
    wallet::{__path_get_ledger, __path_get_wallet},
};
use crate::models::dtos::*;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        health, request_payment, get_payment, verify_payment,
        get_wallet, get_ledger, refund_payment, wallet_adjustment
    ),
    components(schemas(
        PaymentRequest, PaymentResponse, PaymentStatusResponse,
        WalletResponse, LedgerEntryDto, LedgerHistoryResponse,
        RefundRequest, RefundResponse,
        AdminAdjustmentRequest, AdminAdjustmentResponse, ErrorResponse
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Payments", description = "Payment intents and settlement"),
        (name = "Wallet", description = "Wallet balance and ledger"),
        (name = "Admin", description = "Back-office operations")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "bearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
