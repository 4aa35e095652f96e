use crate::error::ApiError;
use crate::models::entities::{NewWallet, Wallet};
use crate::schema::wallets;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

pub struct WalletRepository;

impl WalletRepository {
    pub fn find_by_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<Wallet>, ApiError> {
        wallets::table
            .filter(wallets::user_id.eq(user_id))
            .first::<Wallet>(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    /// Row-level lock. Every balance mutation goes through this inside a
    /// transaction so concurrent appends to the same wallet serialize instead
    /// of both reading a stale balance.
    pub fn find_by_user_for_update(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Option<Wallet>, ApiError> {
        wallets::table
            .filter(wallets::user_id.eq(user_id))
            .for_update()
            .first::<Wallet>(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    /// Lazily creates the wallet on first use, then re-fetches it locked.
    pub fn lock_or_create(conn: &mut PgConnection, user_id: Uuid) -> Result<Wallet, ApiError> {
        if let Some(wallet) = Self::find_by_user_for_update(conn, user_id)? {
            return Ok(wallet);
        }

        diesel::insert_into(wallets::table)
            .values(NewWallet {
                user_id,
                balance_kobo: 0,
            })
            .on_conflict(wallets::user_id)
            .do_nothing()
            .execute(conn)
            .map_err(ApiError::Database)?;

        Self::find_by_user_for_update(conn, user_id)?
            .ok_or_else(|| ApiError::Internal("Wallet creation raced and lost".into()))
    }

    /// Only the ledger append path may call this, with the row already locked.
    pub fn set_balance(
        conn: &mut PgConnection,
        wallet_id: Uuid,
        new_balance_kobo: i64,
    ) -> Result<(), ApiError> {
        diesel::update(wallets::table.find(wallet_id))
            .set((
                wallets::balance_kobo.eq(new_balance_kobo),
                wallets::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }
}
