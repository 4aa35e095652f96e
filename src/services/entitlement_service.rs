use crate::error::ApiError;
use crate::models::dtos::PaymentRequest;
use crate::models::entities::{LedgerEntry, NewPurchase, NewRental, PaymentIntent, Rental};
use crate::models::enums::{ContentType, EntryKind, IntentState, PaymentPurpose, RentalState};
use crate::repositories::entitlement_repository::EntitlementRepository;
use crate::repositories::reconciliation_repository::{stages, ReconciliationRepository};
use crate::services::ledger_service::{AppendRequest, LedgerService};
use chrono::{Duration, Utc};
use diesel::prelude::*;
use serde::Deserialize;
use tracing::info;

/// Converts a settled payment into its effect: a wallet credit for top-ups,
/// a time-boxed rental, or a permanent purchase. Runs inside the same
/// transaction as the state flip so a failed grant rolls the flip back and
/// the settlement can be retried.
pub struct EntitlementService;

#[derive(Debug)]
pub enum GrantOutcome {
    WalletCredited(LedgerEntry),
    RentalGranted(Rental),
    PurchaseGranted { created: bool },
    /// Subscription periods are provisioned by the plan subsystem; the grant
    /// is parked as a reconciliation task it picks up.
    Deferred,
}

/// The slice of intent metadata the grantor reads back.
#[derive(Debug, Deserialize, Default)]
pub struct GrantMetadata {
    pub content_id: Option<String>,
    pub content_type: Option<ContentType>,
    pub rental_duration_hours: Option<i64>,
}

impl GrantMetadata {
    pub fn from_intent(intent: &PaymentIntent) -> Self {
        serde_json::from_value(intent.metadata.clone()).unwrap_or_default()
    }
}

impl EntitlementService {
    /// Request-time duplicate checks with clear errors, run for fresh intents
    /// only (after the idempotency replay short-circuit). Settlement re-checks
    /// under the transaction, this just fails fast before money moves.
    pub fn ensure_not_already_entitled(
        conn: &mut PgConnection,
        user_id: uuid::Uuid,
        req: &PaymentRequest,
    ) -> Result<(), ApiError> {
        let content_id = match (&req.content_id, req.purpose) {
            (Some(id), PaymentPurpose::Rental | PaymentPurpose::Purchase) => id,
            _ => return Ok(()),
        };

        if EntitlementRepository::unrevoked_purchase(conn, user_id, content_id)?.is_some() {
            return Err(ApiError::BadRequest(format!(
                "Content {} is already owned",
                content_id
            )));
        }

        if req.purpose == PaymentPurpose::Rental
            && EntitlementRepository::active_rental(conn, user_id, content_id)?.is_some()
        {
            return Err(ApiError::BadRequest(format!(
                "An active rental already exists for content {}",
                content_id
            )));
        }

        Ok(())
    }

    pub fn grant(
        conn: &mut PgConnection,
        intent: &PaymentIntent,
        default_rental_hours: i64,
    ) -> Result<GrantOutcome, ApiError> {
        if intent.state != IntentState::Success {
            return Err(ApiError::Internal(format!(
                "Grant called for intent {} in state {}",
                intent.id, intent.state
            )));
        }

        match intent.purpose {
            PaymentPurpose::WalletTopup => {
                let entry = LedgerService::append_locked(
                    conn,
                    AppendRequest {
                        user_id: intent.user_id,
                        amount_kobo: intent.amount_kobo,
                        kind: EntryKind::Credit,
                        description: "Wallet top-up",
                        metadata: serde_json::json!({ "payment_id": intent.id }),
                        intent_id: Some(intent.id),
                        allow_overdraw: false,
                    },
                )?;
                Ok(GrantOutcome::WalletCredited(entry))
            }

            PaymentPurpose::Rental => {
                let meta = GrantMetadata::from_intent(intent);
                let content_id = meta
                    .content_id
                    .ok_or_else(|| ApiError::BadRequest("Rental intent missing content_id".into()))?;
                let content_type = meta
                    .content_type
                    .ok_or_else(|| ApiError::BadRequest("Rental intent missing content_type".into()))?;

                // Reject rather than extend: repeated rental of already-active
                // content is a product decision, not a default.
                if EntitlementRepository::active_rental(conn, intent.user_id, &content_id)?.is_some()
                {
                    return Err(ApiError::BadRequest(format!(
                        "An active rental already exists for content {}",
                        content_id
                    )));
                }

                let duration = meta.rental_duration_hours.unwrap_or(default_rental_hours);
                let rental = EntitlementRepository::insert_rental(
                    conn,
                    NewRental {
                        user_id: intent.user_id,
                        content_id: &content_id,
                        content_type,
                        amount_paid_kobo: intent.amount_kobo,
                        intent_id: Some(intent.id),
                        expires_at: Utc::now() + Duration::hours(duration),
                        state: RentalState::Active,
                    },
                )?;

                info!(
                    "Rental {} granted to user {} for content {} until {}",
                    rental.id, rental.user_id, rental.content_id, rental.expires_at
                );
                Ok(GrantOutcome::RentalGranted(rental))
            }

            PaymentPurpose::Purchase => {
                let meta = GrantMetadata::from_intent(intent);
                let content_id = meta
                    .content_id
                    .ok_or_else(|| ApiError::BadRequest("Purchase intent missing content_id".into()))?;
                let content_type = meta.content_type.ok_or_else(|| {
                    ApiError::BadRequest("Purchase intent missing content_type".into())
                })?;

                let created = EntitlementRepository::insert_purchase_idempotent(
                    conn,
                    NewPurchase {
                        user_id: intent.user_id,
                        content_id: &content_id,
                        content_type,
                        amount_paid_kobo: intent.amount_kobo,
                        intent_id: intent.id,
                    },
                )?;

                if created {
                    info!(
                        "Purchase granted to user {} for content {}",
                        intent.user_id, content_id
                    );
                } else {
                    info!(
                        "Purchase for intent {} already granted, skipping",
                        intent.id
                    );
                }
                Ok(GrantOutcome::PurchaseGranted { created })
            }

            PaymentPurpose::Subscription => {
                ReconciliationRepository::enqueue(
                    conn,
                    intent.id,
                    stages::SUBSCRIPTION_PROVISION,
                    "awaiting plan provisioning",
                )?;
                Ok(GrantOutcome::Deferred)
            }
        }
    }
}
