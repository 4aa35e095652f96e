use crate::error::ApiError;
use crate::models::entities::{NewReconciliationTask, ReconciliationTask};
use crate::schema::reconciliation_tasks;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

/// Stage labels for reconciliation tasks. Each names the step that failed
/// (or is still owed) after money had already moved.
pub mod stages {
    pub const GRANT: &str = "grant";
    pub const AMOUNT_MISMATCH: &str = "amount_mismatch";
    pub const REFUND_REVERSAL: &str = "refund_reversal";
    pub const SUBSCRIPTION_PROVISION: &str = "subscription_provision";
}

pub struct ReconciliationRepository;

impl ReconciliationRepository {
    /// Records that money moved without its corresponding grant (or reversal).
    /// An unresolved task for the same intent is bumped instead of duplicated.
    pub fn enqueue(
        conn: &mut PgConnection,
        intent_id: Uuid,
        stage: &str,
        error: &str,
    ) -> Result<ReconciliationTask, ApiError> {
        let existing = reconciliation_tasks::table
            .filter(reconciliation_tasks::intent_id.eq(intent_id))
            .filter(reconciliation_tasks::resolved.eq(false))
            .first::<ReconciliationTask>(conn)
            .optional()
            .map_err(ApiError::Database)?;

        if let Some(task) = existing {
            return diesel::update(reconciliation_tasks::table.find(task.id))
                .set((
                    reconciliation_tasks::last_error.eq(error),
                    reconciliation_tasks::attempts.eq(reconciliation_tasks::attempts + 1),
                    reconciliation_tasks::updated_at.eq(Utc::now()),
                ))
                .get_result::<ReconciliationTask>(conn)
                .map_err(ApiError::Database);
        }

        diesel::insert_into(reconciliation_tasks::table)
            .values(NewReconciliationTask {
                intent_id,
                stage,
                last_error: error,
            })
            .get_result::<ReconciliationTask>(conn)
            .map_err(ApiError::Database)
    }

    /// Unresolved tasks restricted to the given stages. The sweeper passes
    /// only the stages it knows how to re-drive; tasks owned by other
    /// subsystems stay untouched.
    pub fn unresolved_in_stages(
        conn: &mut PgConnection,
        stages: &[&str],
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<ReconciliationTask>, ApiError> {
        reconciliation_tasks::table
            .filter(reconciliation_tasks::resolved.eq(false))
            .filter(reconciliation_tasks::stage.eq_any(stages.iter().copied()))
            .filter(reconciliation_tasks::attempts.lt(max_attempts))
            .order(reconciliation_tasks::created_at.asc())
            .limit(limit)
            .load::<ReconciliationTask>(conn)
            .map_err(ApiError::Database)
    }

    pub fn record_attempt(conn: &mut PgConnection, id: Uuid, error: &str) -> Result<(), ApiError> {
        diesel::update(reconciliation_tasks::table.find(id))
            .set((
                reconciliation_tasks::last_error.eq(error),
                reconciliation_tasks::attempts.eq(reconciliation_tasks::attempts + 1),
                reconciliation_tasks::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }

    pub fn resolve(conn: &mut PgConnection, id: Uuid) -> Result<(), ApiError> {
        diesel::update(reconciliation_tasks::table.find(id))
            .set((
                reconciliation_tasks::resolved.eq(true),
                reconciliation_tasks::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }
}
