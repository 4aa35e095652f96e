use crate::error::ApiError;
use crate::models::entities::{LedgerEntry, NewLedgerEntry};
use crate::schema::wallet_ledger;
use diesel::prelude::*;
use uuid::Uuid;

pub struct LedgerRepository;

impl LedgerRepository {
    pub fn insert(conn: &mut PgConnection, entry: NewLedgerEntry<'_>) -> Result<LedgerEntry, ApiError> {
        diesel::insert_into(wallet_ledger::table)
            .values(entry)
            .get_result::<LedgerEntry>(conn)
            .map_err(ApiError::Database)
    }

    /// Every entry a payment intent produced, oldest first. Refunds mirror
    /// these with negated compensating entries.
    pub fn entries_for_intent(
        conn: &mut PgConnection,
        intent_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, ApiError> {
        wallet_ledger::table
            .filter(wallet_ledger::intent_id.eq(intent_id))
            .order(wallet_ledger::created_at.asc())
            .load::<LedgerEntry>(conn)
            .map_err(ApiError::Database)
    }

    pub fn history(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, ApiError> {
        wallet_ledger::table
            .filter(wallet_ledger::wallet_id.eq(wallet_id))
            .order(wallet_ledger::created_at.desc())
            .limit(limit)
            .load::<LedgerEntry>(conn)
            .map_err(ApiError::Database)
    }
}
