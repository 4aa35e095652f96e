use crate::error::ApiError;
use crate::models::entities::{LedgerEntry, NewLedgerEntry};
use crate::models::enums::EntryKind;
use crate::repositories::ledger_repository::LedgerRepository;
use crate::repositories::wallet_repository::WalletRepository;
use diesel::prelude::*;
use diesel::Connection;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// The single lock/transaction boundary of the system: every balance change
/// is an atomic read-modify-write against the wallet row held `FOR UPDATE`,
/// with the ledger row carrying the resulting balance snapshot.
pub struct LedgerService;

pub struct AppendRequest<'a> {
    pub user_id: Uuid,
    /// Magnitude, always positive; the sign is derived from `kind`.
    pub amount_kobo: i64,
    pub kind: EntryKind,
    pub description: &'a str,
    pub metadata: Value,
    pub intent_id: Option<Uuid>,
    /// Refund reversals may push a balance below zero; user-initiated debits
    /// never may.
    pub allow_overdraw: bool,
}

impl LedgerService {
    /// Appends inside the caller's open transaction (diesel nests this as a
    /// savepoint when called from a larger unit of work).
    pub fn append_locked(
        conn: &mut PgConnection,
        req: AppendRequest<'_>,
    ) -> Result<LedgerEntry, ApiError> {
        if req.amount_kobo <= 0 {
            return Err(ApiError::BadRequest(
                "Ledger amounts must be positive".into(),
            ));
        }

        let wallet = WalletRepository::lock_or_create(conn, req.user_id)?;

        let signed_amount = match req.kind {
            EntryKind::Credit => req.amount_kobo,
            EntryKind::Debit => -req.amount_kobo,
        };

        if req.kind == EntryKind::Debit
            && !req.allow_overdraw
            && req.amount_kobo > wallet.balance_kobo
        {
            return Err(ApiError::InsufficientFunds {
                available_kobo: wallet.balance_kobo,
                required_kobo: req.amount_kobo,
            });
        }

        let new_balance = wallet.balance_kobo + signed_amount;

        let entry = LedgerRepository::insert(
            conn,
            NewLedgerEntry {
                wallet_id: wallet.id,
                intent_id: req.intent_id,
                amount_kobo: signed_amount,
                kind: req.kind,
                description: req.description,
                metadata: req.metadata,
                balance_after_kobo: new_balance,
            },
        )?;

        WalletRepository::set_balance(conn, wallet.id, new_balance)?;

        info!(
            "Ledger entry {} for wallet {}: {} {} kobo, balance {} -> {}",
            entry.id,
            wallet.id,
            entry.kind,
            req.amount_kobo,
            wallet.balance_kobo,
            new_balance
        );

        Ok(entry)
    }

    pub fn append(conn: &mut PgConnection, req: AppendRequest<'_>) -> Result<LedgerEntry, ApiError> {
        conn.transaction(|conn| Self::append_locked(conn, req))
    }
}
