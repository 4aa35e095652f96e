use crate::error::ApiError;
use crate::models::AppState;
use crate::repositories::reconciliation_repository::{stages, ReconciliationRepository};
use crate::services::refund_service::RefundService;
use crate::services::settlement_service::SettlementService;
use tracing::{error, info, warn};

const SWEEP_BATCH: i64 = 20;

/// Stages this sweep knows how to re-drive. `subscription_provision` tasks
/// are drained by the plan subsystem and deliberately left alone.
const SWEEPABLE_STAGES: &[&str] = &[
    stages::GRANT,
    stages::AMOUNT_MISMATCH,
    stages::REFUND_REVERSAL,
];

/// Drains the reconciliation queue: settlements whose grant failed after the
/// provider confirmed, amount mismatches awaiting re-verification, and refund
/// reversals interrupted after the provider accepted the refund. Each stage
/// is re-driven through its own idempotent path; re-running a task that a
/// late webhook already settled resolves it cleanly.
pub struct ReconciliationService;

impl ReconciliationService {
    /// One sweep pass; returns how many tasks were resolved.
    pub async fn sweep_once(state: &AppState) -> Result<usize, ApiError> {
        let max_attempts = state.config.settlement.reconciliation_max_attempts;

        let tasks = {
            let mut conn = state.db.get().map_err(|e| {
                error!("reconciliation: failed to acquire db connection: {}", e);
                ApiError::DatabaseConnection(e.to_string())
            })?;
            ReconciliationRepository::unresolved_in_stages(
                &mut conn,
                SWEEPABLE_STAGES,
                max_attempts,
                SWEEP_BATCH,
            )?
        };

        let mut resolved = 0;
        for task in tasks {
            let outcome = match task.stage.as_str() {
                // The intent stays refunded while the local reversal is owed;
                // only re-applying the reversal settles the drift.
                stages::REFUND_REVERSAL => RefundService::retry_reversal(state, task.intent_id),
                _ => SettlementService::confirm_completion(state, &task.intent_id.to_string())
                    .await
                    .map(|intent| intent.state.is_terminal()),
            };

            let mut conn = state.db.get().map_err(|e| {
                error!("reconciliation: failed to acquire db connection: {}", e);
                ApiError::DatabaseConnection(e.to_string())
            })?;

            match outcome {
                Ok(true) => {
                    ReconciliationRepository::resolve(&mut conn, task.id)?;
                    info!(
                        "Reconciliation task {} ({}) resolved for payment {}",
                        task.id, task.stage, task.intent_id
                    );
                    resolved += 1;
                }
                Ok(false) => {
                    ReconciliationRepository::record_attempt(
                        &mut conn,
                        task.id,
                        "payment still pending",
                    )?;
                }
                Err(e) => {
                    warn!(
                        "Reconciliation retry for payment {} ({}) failed: {}",
                        task.intent_id, task.stage, e
                    );
                    ReconciliationRepository::record_attempt(&mut conn, task.id, &e.to_string())?;
                }
            }
        }

        Ok(resolved)
    }
}
