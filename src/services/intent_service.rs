use crate::error::ApiError;
use crate::models::dtos::PaymentRequest;
use crate::models::entities::{NewPaymentIntent, PaymentIntent};
use crate::models::enums::{IntentState, PaymentMethod};
use crate::models::AppState;
use crate::repositories::intent_repository::IntentRepository;
use crate::services::entitlement_service::EntitlementService;
use tracing::{error, info};
use uuid::Uuid;

pub const PROVIDER_PAYSTACK: &str = "paystack";
pub const PROVIDER_WALLET: &str = "wallet";

/// Creates and tracks provider checkout sessions. Idempotent on the
/// client-supplied key: a retried request gets the stored intent back and
/// never opens a second checkout session.
pub struct IntentService;

impl IntentService {
    pub async fn create_card_intent(
        state: &AppState,
        user_id: Uuid,
        email: &str,
        req: &PaymentRequest,
    ) -> Result<(PaymentIntent, Option<String>), ApiError> {
        let mut conn = state.db.get().map_err(|e| {
            error!("intent.create: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;

        let currency = req.currency.to_uppercase();
        let (intent, created) = IntentRepository::create_idempotent(
            &mut conn,
            NewPaymentIntent {
                user_id,
                amount_kobo: req.amount_kobo,
                currency: &currency,
                purpose: req.purpose,
                method: PaymentMethod::Card,
                metadata: req.metadata(),
                idempotency_key: &req.idempotency_key,
                provider: Some(PROVIDER_PAYSTACK),
                state: IntentState::Initiated,
            },
        )?;

        if !created {
            info!(
                "Idempotent replay: intent {} already exists for key {}",
                intent.id, req.idempotency_key
            );
            let checkout_url = Self::stored_checkout_url(&intent);
            return Ok((intent, checkout_url));
        }

        // Only fresh intents get the duplicate-entitlement check; a replay
        // for already-granted content must return the stored intent above.
        if let Err(e) = EntitlementService::ensure_not_already_entitled(&mut conn, user_id, req) {
            IntentRepository::mark_failed(&mut conn, intent.id, &e.to_string())?;
            return Err(e);
        }

        // Fresh intent: one provider call, exactly once per idempotency key.
        let callback_url = format!("{}/payment/callback?payment_id={}", state.config.app_url, intent.id);
        let provider_metadata = serde_json::json!({
            "payment_id": intent.id,
            "purpose": intent.purpose,
        });

        let checkout = match state
            .paystack
            .initialize_transaction(email, intent.amount_kobo, intent.id, &callback_url, &provider_metadata)
            .await
        {
            Ok(checkout) => checkout,
            Err(e) => {
                error!("Checkout initialization failed for intent {}: {}", intent.id, e);
                IntentRepository::mark_failed(&mut conn, intent.id, &e.to_string())?;
                return Err(e);
            }
        };

        let mut metadata = intent.metadata.clone();
        metadata["checkout_url"] = serde_json::Value::from(checkout.authorization_url.clone());

        IntentRepository::mark_pending(
            &mut conn,
            intent.id,
            PROVIDER_PAYSTACK,
            &checkout.reference,
            &metadata,
        )?;

        info!(
            "Intent {} pending: provider reference {}, amount {} kobo",
            intent.id, checkout.reference, intent.amount_kobo
        );

        let intent = IntentRepository::find_by_id(&mut conn, intent.id)?;
        Ok((intent, Some(checkout.authorization_url)))
    }

    pub fn stored_checkout_url(intent: &PaymentIntent) -> Option<String> {
        intent
            .metadata
            .get("checkout_url")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}
