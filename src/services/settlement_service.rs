use crate::error::ApiError;
use crate::models::dtos::{PaymentRequest, PaymentResponse};
use crate::models::entities::{NewPaymentIntent, PaymentIntent};
use crate::models::enums::{EntryKind, IntentState, PaymentMethod};
use crate::models::AppState;
use crate::repositories::intent_repository::IntentRepository;
use crate::repositories::reconciliation_repository::{stages, ReconciliationRepository};
use crate::services::entitlement_service::EntitlementService;
use crate::services::intent_service::{IntentService, PROVIDER_WALLET};
use crate::services::ledger_service::{AppendRequest, LedgerService};
use diesel::prelude::*;
use diesel::Connection;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Ties intents, the ledger and entitlements together. Every externally
/// triggerable mutation here is safe to invoke more than once with the same
/// identifying key: the unique idempotency key on intents and the
/// state-guarded transition in [`SettlementService::confirm_completion`] are
/// the two enforcement points.
pub struct SettlementService;

impl SettlementService {
    pub async fn request_payment(
        state: &AppState,
        user_id: Uuid,
        email: &str,
        req: &PaymentRequest,
    ) -> Result<PaymentResponse, ApiError> {
        req.validate_shape()?;

        let mut conn = state.db.get().map_err(|e| {
            error!("settlement.request: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;

        match req.method {
            PaymentMethod::Wallet => Self::settle_from_wallet(state, &mut conn, user_id, req),
            PaymentMethod::Card => {
                let (intent, checkout_url) =
                    IntentService::create_card_intent(state, user_id, email, req).await?;
                let mut response = PaymentResponse::from(&intent);
                response.checkout_url = checkout_url;
                Ok(response)
            }
        }
    }

    /// Synchronous path: debit and grant share one transaction with the
    /// intent row, so a failed grant rolls the debit back instead of leaving
    /// money taken with nothing granted.
    fn settle_from_wallet(
        state: &AppState,
        conn: &mut PgConnection,
        user_id: Uuid,
        req: &PaymentRequest,
    ) -> Result<PaymentResponse, ApiError> {
        let currency = req.currency.to_uppercase();
        let default_hours = state.config.settlement.default_rental_hours;

        let (intent, settled_now) = conn.transaction(|conn| {
            let (intent, created) = IntentRepository::create_idempotent(
                conn,
                NewPaymentIntent {
                    user_id,
                    amount_kobo: req.amount_kobo,
                    currency: &currency,
                    purpose: req.purpose,
                    method: PaymentMethod::Wallet,
                    metadata: req.metadata(),
                    idempotency_key: &req.idempotency_key,
                    provider: Some(PROVIDER_WALLET),
                    // No provider round-trip: the intent is settled the moment
                    // this transaction commits.
                    state: IntentState::Success,
                },
            )?;

            if !created {
                info!(
                    "Idempotent replay: wallet payment {} already settled for key {}",
                    intent.id, req.idempotency_key
                );
                return Ok((intent, false));
            }

            // Duplicate-entitlement checks run only for fresh intents, after
            // the replay short-circuit: a replayed request for content the
            // first attempt granted must return the stored intent, not a
            // duplicate error.
            EntitlementService::ensure_not_already_entitled(conn, user_id, req)?;

            LedgerService::append_locked(
                conn,
                AppendRequest {
                    user_id,
                    amount_kobo: req.amount_kobo,
                    kind: EntryKind::Debit,
                    description: &format!("Wallet payment for {}", req.purpose),
                    metadata: serde_json::json!({ "payment_id": intent.id }),
                    intent_id: Some(intent.id),
                    allow_overdraw: false,
                },
            )?;

            EntitlementService::grant(conn, &intent, default_hours)?;

            Ok::<_, ApiError>((intent, true))
        })?;

        if settled_now {
            info!(
                "Wallet payment {} settled: user {}, {} kobo, purpose {}",
                intent.id, user_id, intent.amount_kobo, intent.purpose
            );
        }

        Ok(PaymentResponse::from(&intent))
    }

    /// Converges the webhook, verify-endpoint and poller paths. Re-verifies
    /// against the provider, then settles behind a state-guarded
    /// `pending -> success` update: only the call that wins that transition
    /// grants; every other delivery degrades to a logged no-op.
    pub async fn confirm_completion(
        state: &AppState,
        reference: &str,
    ) -> Result<PaymentIntent, ApiError> {
        let mut conn = state.db.get().map_err(|e| {
            error!("settlement.confirm: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;

        let intent = IntentRepository::find_by_reference(&mut conn, reference)?
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown payment reference: {}", reference)))?;

        if intent.state.is_terminal() {
            info!(
                "Ignoring settlement attempt for {}: already {}",
                intent.id, intent.state
            );
            return Ok(intent);
        }

        if intent.state == IntentState::Initiated {
            // Checkout was never opened with the provider; nothing to verify.
            return Ok(intent);
        }

        let provider_reference = intent.provider_reference.clone().ok_or_else(|| {
            ApiError::Internal(format!("Pending intent {} has no provider reference", intent.id))
        })?;

        let verified = state.paystack.verify_transaction(&provider_reference).await?;

        if verified.is_declared_failure() {
            warn!(
                "Provider declared payment {} failed (status {})",
                intent.id, verified.status
            );
            IntentRepository::mark_failed(&mut conn, intent.id, &format!("provider status: {}", verified.status))?;
            return IntentRepository::find_by_id(&mut conn, intent.id);
        }

        if !verified.is_success() {
            // Still in flight at the provider; the poller will come back.
            return Ok(intent);
        }

        if verified.amount != intent.amount_kobo
            || !verified.currency.eq_ignore_ascii_case(&intent.currency)
        {
            let detail = format!(
                "provider reports {} {}, intent expects {} {}",
                verified.amount, verified.currency, intent.amount_kobo, intent.currency
            );
            error!("Amount mismatch for intent {}: {}", intent.id, detail);
            ReconciliationRepository::enqueue(&mut conn, intent.id, stages::AMOUNT_MISMATCH, &detail)?;
            return Err(ApiError::ReconciliationRequired(intent.id));
        }

        let default_hours = state.config.settlement.default_rental_hours;
        let settled = conn.transaction(|conn| {
            if !IntentRepository::transition(conn, intent.id, IntentState::Pending, IntentState::Success)? {
                return Ok(false);
            }
            let fresh = IntentRepository::find_by_id(conn, intent.id)?;
            EntitlementService::grant(conn, &fresh, default_hours)?;
            Ok::<_, ApiError>(true)
        });

        match settled {
            Ok(true) => {
                info!("Payment {} settled via {}", intent.id, provider_reference);
                IntentRepository::find_by_id(&mut conn, intent.id)
            }
            Ok(false) => {
                info!(
                    "Settlement race for {} lost: another delivery already settled it",
                    intent.id
                );
                IntentRepository::find_by_id(&mut conn, intent.id)
            }
            Err(e) => {
                // Money confirmed at the provider but the grant failed and
                // rolled the state flip back. Park it for the sweeper rather
                // than losing the drift.
                error!("Grant failed for settled payment {}: {}", intent.id, e);
                ReconciliationRepository::enqueue(&mut conn, intent.id, stages::GRANT, &e.to_string())?;
                Err(ApiError::ReconciliationRequired(intent.id))
            }
        }
    }

    /// Marks a pending intent failed on a provider failure event. Guarded the
    /// same way as success: terminal intents are left untouched.
    pub fn fail_from_provider(
        state: &AppState,
        reference: &str,
        reason: &str,
    ) -> Result<(), ApiError> {
        let mut conn = state.db.get().map_err(|e| {
            error!("settlement.fail: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;

        match IntentRepository::find_by_reference(&mut conn, reference)? {
            Some(intent) if !intent.state.is_terminal() => {
                IntentRepository::mark_failed(&mut conn, intent.id, reason)?;
                info!("Payment {} marked failed: {}", intent.id, reason);
            }
            Some(intent) => {
                info!("Ignoring failure event for {}: already {}", intent.id, intent.state);
            }
            None => {
                warn!("Failure event for unknown reference {}", reference);
            }
        }
        Ok(())
    }

    /// Bounded fallback when no webhook is configured: poll at a fixed
    /// interval until the intent is terminal or the timeout lapses. Each
    /// attempt is independently idempotent, so running this concurrently with
    /// webhook delivery is safe. On timeout the intent is returned as-is,
    /// still pending (abandoned checkouts look exactly like this).
    pub async fn poll_until_settled(
        state: &AppState,
        intent_id: Uuid,
    ) -> Result<PaymentIntent, ApiError> {
        let deadline = tokio::time::Instant::now() + state.config.settlement.poll_timeout;
        let mut ticker = tokio::time::interval(state.config.settlement.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let intent = Self::confirm_completion(state, &intent_id.to_string()).await?;
            if intent.state.is_terminal() {
                return Ok(intent);
            }

            if tokio::time::Instant::now() >= deadline {
                warn!("Polling for payment {} timed out, leaving it pending", intent_id);
                return Ok(intent);
            }
        }
    }
}
