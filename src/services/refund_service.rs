use crate::error::ApiError;
use crate::models::dtos::{RefundRequest, RefundResponse};
use crate::models::entities::PaymentIntent;
use crate::models::enums::{EntryKind, IntentState, PaymentPurpose};
use crate::models::AppState;
use crate::repositories::entitlement_repository::EntitlementRepository;
use crate::repositories::intent_repository::IntentRepository;
use crate::repositories::ledger_repository::LedgerRepository;
use crate::repositories::reconciliation_repository::{stages, ReconciliationRepository};
use crate::services::intent_service::PROVIDER_PAYSTACK;
use crate::services::ledger_service::{AppendRequest, LedgerService};
use diesel::prelude::*;
use diesel::Connection;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

pub const REFUND_METADATA_KEY: &str = "refund";

/// Refund parameters persisted on the intent before any money moves, so an
/// interrupted local reversal can be re-driven by the reconciliation sweeper
/// with the same amount and reason.
#[derive(Debug, Serialize, Deserialize)]
pub struct PendingRefund {
    pub amount_kobo: i64,
    pub full: bool,
    pub admin_id: Uuid,
    pub reason: String,
}

/// Reverses a completed payment: compensating ledger entries mirroring what
/// the intent originally wrote (never deleting them), entitlement revocation,
/// and the `success -> refunded` flip.
///
/// The flip doubles as the concurrency claim: it is taken with a state-guarded
/// update *before* the provider call, so two racing refunds of the same intent
/// cannot both reach the provider. The loser sees `AlreadySettled`.
pub struct RefundService;

impl RefundService {
    pub async fn refund(
        state: &AppState,
        admin_id: Uuid,
        intent_id: Uuid,
        req: &RefundRequest,
    ) -> Result<RefundResponse, ApiError> {
        let mut conn = state.db.get().map_err(|e| {
            error!("refund: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;

        let intent = IntentRepository::find_by_id(&mut conn, intent_id)?;

        match intent.state {
            IntentState::Success => {}
            IntentState::Refunded => return Err(ApiError::AlreadySettled(intent.id)),
            other => {
                return Err(ApiError::BadRequest(format!(
                    "Only successful payments can be refunded (payment is {})",
                    other
                )))
            }
        }

        let refund_kobo = req.amount_kobo.unwrap_or(intent.amount_kobo);
        if refund_kobo > intent.amount_kobo {
            return Err(ApiError::BadRequest(format!(
                "Refund of {} kobo exceeds the original {} kobo payment",
                refund_kobo, intent.amount_kobo
            )));
        }
        let full_refund = refund_kobo == intent.amount_kobo;

        // Card money lives at the provider; wallet money never left us.
        let provider_reference = if intent.provider.as_deref() == Some(PROVIDER_PAYSTACK) {
            Some(intent.provider_reference.clone().ok_or_else(|| {
                ApiError::Internal(format!("Intent {} has no provider reference", intent.id))
            })?)
        } else {
            None
        };

        let pending = PendingRefund {
            amount_kobo: refund_kobo,
            full: full_refund,
            admin_id,
            reason: req.reason.clone(),
        };
        let pending_value = serde_json::to_value(&pending)
            .map_err(|e| ApiError::Internal(format!("Failed to encode refund parameters: {}", e)))?;
        IntentRepository::merge_metadata(&mut conn, intent.id, REFUND_METADATA_KEY, pending_value)?;

        // Claim the flip before talking to the provider: a concurrent refund
        // of the same intent loses this guarded update and never reaches
        // Paystack.
        if !IntentRepository::transition(
            &mut conn,
            intent.id,
            IntentState::Success,
            IntentState::Refunded,
        )? {
            return Err(ApiError::AlreadySettled(intent.id));
        }

        if let Some(reference) = provider_reference {
            let partial = (!full_refund).then_some(refund_kobo);
            if let Err(e) = state.paystack.refund(&reference, partial).await {
                // The provider kept the money; release the claim so the
                // refund can be retried.
                error!("Provider refund for payment {} failed: {}", intent.id, e);
                IntentRepository::reopen_refund_claim(&mut conn, intent.id)?;
                return Err(e);
            }
        }

        let reversed = conn.transaction(|conn| Self::apply_reversal(conn, &intent, &pending));

        if let Err(e) = reversed {
            // The provider already accepted the refund; never swallow the drift.
            error!("Local reversal failed for refunded payment {}: {}", intent.id, e);
            ReconciliationRepository::enqueue(
                &mut conn,
                intent.id,
                stages::REFUND_REVERSAL,
                &e.to_string(),
            )?;
            return Err(ApiError::ReconciliationRequired(intent.id));
        }

        info!(
            "Payment {} refunded by admin {}: {} kobo ({})",
            intent.id, admin_id, refund_kobo, req.reason
        );

        Ok(RefundResponse {
            payment_id: intent.id,
            refunded_kobo: refund_kobo,
            state: IntentState::Refunded,
        })
    }

    /// Re-drives the local half of a refund whose reversal transaction failed
    /// after the claim was taken and the provider accepted the money back.
    /// Returns true when nothing is left to do.
    pub fn retry_reversal(state: &AppState, intent_id: Uuid) -> Result<bool, ApiError> {
        let mut conn = state.db.get().map_err(|e| {
            error!("refund.retry: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;

        let intent = IntentRepository::find_by_id(&mut conn, intent_id)?;
        if intent.state != IntentState::Refunded {
            return Err(ApiError::Internal(format!(
                "Refund reversal pending for intent {} in state {}",
                intent.id, intent.state
            )));
        }

        let pending = intent
            .metadata
            .get(REFUND_METADATA_KEY)
            .cloned()
            .ok_or_else(|| {
                ApiError::Internal(format!(
                    "Intent {} has no stored refund parameters",
                    intent.id
                ))
            })?;
        let pending: PendingRefund = serde_json::from_value(pending).map_err(|e| {
            ApiError::Internal(format!(
                "Stored refund parameters for intent {} unreadable: {}",
                intent.id, e
            ))
        })?;

        conn.transaction(|conn| Self::apply_reversal(conn, &intent, &pending))?;

        info!("Refund reversal for payment {} re-applied", intent.id);
        Ok(true)
    }

    /// Ledger reversal plus entitlement revocation, inside the caller's
    /// transaction. The `success -> refunded` claim has already been taken.
    fn apply_reversal(
        conn: &mut PgConnection,
        intent: &PaymentIntent,
        pending: &PendingRefund,
    ) -> Result<(), ApiError> {
        Self::reverse_ledger(
            conn,
            intent,
            pending.amount_kobo,
            pending.full,
            pending.admin_id,
            &pending.reason,
        )?;

        if pending.full {
            match intent.purpose {
                PaymentPurpose::Rental => {
                    EntitlementRepository::revoke_rental_by_intent(conn, intent.id)?;
                }
                PaymentPurpose::Purchase => {
                    EntitlementRepository::revoke_purchase_by_intent(conn, intent.id)?;
                }
                PaymentPurpose::WalletTopup | PaymentPurpose::Subscription => {}
            }
        }

        Ok(())
    }

    /// Writes compensating entries negating what the intent produced. A
    /// reversal that debits (undoing a top-up credit) may overdraw: the user
    /// can have spent the credited money already, and the audit trail must
    /// still balance.
    fn reverse_ledger(
        conn: &mut PgConnection,
        intent: &PaymentIntent,
        refund_kobo: i64,
        full_refund: bool,
        admin_id: Uuid,
        reason: &str,
    ) -> Result<(), ApiError> {
        let entries = LedgerRepository::entries_for_intent(conn, intent.id)?;

        let (reversals, originals): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .partition(|e| e.metadata.get("reversed_entry").is_some());

        if !reversals.is_empty() {
            // A previous attempt already wrote the compensating entries.
            return Ok(());
        }

        if originals.is_empty() {
            // Card rentals/purchases never touched the wallet; the provider
            // refund is the whole reversal.
            return Ok(());
        }

        if !full_refund && originals.len() > 1 {
            return Err(ApiError::BadRequest(
                "Partial refunds are not supported for multi-entry payments".into(),
            ));
        }

        for entry in &originals {
            let reversal_kind = match entry.kind {
                EntryKind::Credit => EntryKind::Debit,
                EntryKind::Debit => EntryKind::Credit,
            };
            let amount = if full_refund {
                entry.amount_kobo.abs()
            } else {
                refund_kobo
            };

            LedgerService::append_locked(
                conn,
                AppendRequest {
                    user_id: intent.user_id,
                    amount_kobo: amount,
                    kind: reversal_kind,
                    description: "Refund reversal",
                    metadata: serde_json::json!({
                        "payment_id": intent.id,
                        "reversed_entry": entry.id,
                        "admin_id": admin_id,
                        "reason": reason,
                    }),
                    intent_id: Some(intent.id),
                    allow_overdraw: reversal_kind == EntryKind::Debit,
                },
            )?;
        }

        Ok(())
    }
}
