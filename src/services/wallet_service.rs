use crate::error::ApiError;
use crate::models::dtos::{LedgerEntryDto, LedgerHistoryResponse, WalletResponse};
use crate::models::entities::{LedgerEntry, Wallet};
use crate::models::enums::EntryKind;
use crate::models::AppState;
use crate::repositories::ledger_repository::LedgerRepository;
use crate::repositories::wallet_repository::WalletRepository;
use crate::services::ledger_service::{AppendRequest, LedgerService};
use diesel::prelude::*;
use diesel::Connection;
use tracing::{error, info};
use uuid::Uuid;

/// Thin facade over the ledger. Nothing outside this module and the
/// settlement path touches wallet balances.
pub struct WalletService;

impl WalletService {
    pub fn balance(conn: &mut PgConnection, user_id: Uuid) -> Result<i64, ApiError> {
        Ok(WalletRepository::find_by_user(conn, user_id)?
            .map(|w| w.balance_kobo)
            .unwrap_or(0))
    }

    pub fn can_afford(conn: &mut PgConnection, user_id: Uuid, amount_kobo: i64) -> Result<bool, ApiError> {
        Ok(Self::balance(conn, user_id)? >= amount_kobo)
    }

    pub fn credit(
        conn: &mut PgConnection,
        user_id: Uuid,
        amount_kobo: i64,
        reason: &str,
        intent_id: Option<Uuid>,
    ) -> Result<LedgerEntry, ApiError> {
        LedgerService::append(
            conn,
            AppendRequest {
                user_id,
                amount_kobo,
                kind: EntryKind::Credit,
                description: reason,
                metadata: serde_json::json!({}),
                intent_id,
                allow_overdraw: false,
            },
        )
    }

    pub fn debit(
        conn: &mut PgConnection,
        user_id: Uuid,
        amount_kobo: i64,
        reason: &str,
        intent_id: Option<Uuid>,
    ) -> Result<LedgerEntry, ApiError> {
        LedgerService::append(
            conn,
            AppendRequest {
                user_id,
                amount_kobo,
                kind: EntryKind::Debit,
                description: reason,
                metadata: serde_json::json!({}),
                intent_id,
                allow_overdraw: false,
            },
        )
    }

    pub fn get_wallet(state: &AppState, user_id: Uuid) -> Result<WalletResponse, ApiError> {
        let mut conn = state.db.get().map_err(|e| {
            error!("wallet.get: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;

        let wallet = Self::wallet_or_empty(&mut conn, user_id)?;
        Ok(WalletResponse::from(wallet))
    }

    pub fn ledger_history(
        state: &AppState,
        user_id: Uuid,
        limit: i64,
    ) -> Result<LedgerHistoryResponse, ApiError> {
        let mut conn = state.db.get().map_err(|e| {
            error!("wallet.ledger: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;

        let entries = match WalletRepository::find_by_user(&mut conn, user_id)? {
            Some(wallet) => LedgerRepository::history(&mut conn, wallet.id, limit)?,
            None => Vec::new(),
        };

        Ok(LedgerHistoryResponse {
            entries: entries.into_iter().map(LedgerEntryDto::from).collect(),
        })
    }

    /// Back-office signed adjustment. The reason lands in the entry metadata
    /// so the audit trail explains every manual movement.
    pub fn admin_adjust(
        state: &AppState,
        admin_id: Uuid,
        user_id: Uuid,
        amount_kobo: i64,
        reason: &str,
    ) -> Result<i64, ApiError> {
        if amount_kobo == 0 {
            return Err(ApiError::BadRequest("Adjustment amount cannot be zero".into()));
        }

        let mut conn = state.db.get().map_err(|e| {
            error!("wallet.adjust: failed to acquire db connection: {}", e);
            ApiError::DatabaseConnection(e.to_string())
        })?;

        let kind = if amount_kobo > 0 {
            EntryKind::Credit
        } else {
            EntryKind::Debit
        };

        let entry = conn.transaction(|conn| {
            LedgerService::append_locked(
                conn,
                AppendRequest {
                    user_id,
                    amount_kobo: amount_kobo.abs(),
                    kind,
                    description: "Admin wallet adjustment",
                    metadata: serde_json::json!({
                        "admin_id": admin_id,
                        "reason": reason,
                    }),
                    intent_id: None,
                    allow_overdraw: false,
                },
            )
        })?;

        info!(
            "Admin {} adjusted wallet of user {} by {} kobo ({})",
            admin_id, user_id, amount_kobo, reason
        );

        Ok(entry.balance_after_kobo)
    }

    fn wallet_or_empty(conn: &mut PgConnection, user_id: Uuid) -> Result<Wallet, ApiError> {
        match WalletRepository::find_by_user(conn, user_id)? {
            Some(wallet) => Ok(wallet),
            // No wallet row yet: report a zero balance without creating one.
            None => Ok(Wallet {
                id: Uuid::nil(),
                user_id,
                balance_kobo: 0,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            }),
        }
    }
}
