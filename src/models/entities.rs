use crate::models::enums::{
    ContentType, EntryKind, IntentState, PaymentMethod, PaymentPurpose, RentalState,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = crate::schema::wallets)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: Uuid,
    pub balance_kobo: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::wallets)]
pub struct NewWallet {
    pub user_id: Uuid,
    pub balance_kobo: i64,
}

/// Append-only. Rows are never updated or deleted; `balance_after_kobo` is
/// the wallet balance snapshot taken inside the writing transaction.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = crate::schema::wallet_ledger)]
#[diesel(belongs_to(Wallet))]
pub struct LedgerEntry {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub intent_id: Option<Uuid>,
    pub amount_kobo: i64,
    pub kind: EntryKind,
    pub description: String,
    pub metadata: Value,
    pub balance_after_kobo: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::wallet_ledger)]
pub struct NewLedgerEntry<'a> {
    pub wallet_id: Uuid,
    pub intent_id: Option<Uuid>,
    pub amount_kobo: i64,
    pub kind: EntryKind,
    pub description: &'a str,
    pub metadata: Value,
    pub balance_after_kobo: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = crate::schema::payment_intents)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_kobo: i64,
    pub currency: String,
    pub purpose: PaymentPurpose,
    pub method: PaymentMethod,
    pub metadata: Value,
    pub idempotency_key: String,
    pub provider: Option<String>,
    pub provider_reference: Option<String>,
    pub state: IntentState,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::payment_intents)]
pub struct NewPaymentIntent<'a> {
    pub user_id: Uuid,
    pub amount_kobo: i64,
    pub currency: &'a str,
    pub purpose: PaymentPurpose,
    pub method: PaymentMethod,
    pub metadata: Value,
    pub idempotency_key: &'a str,
    pub provider: Option<&'a str>,
    pub state: IntentState,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = crate::schema::rentals)]
pub struct Rental {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_id: String,
    pub content_type: ContentType,
    pub amount_paid_kobo: i64,
    pub intent_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub state: RentalState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::rentals)]
pub struct NewRental<'a> {
    pub user_id: Uuid,
    pub content_id: &'a str,
    pub content_type: ContentType,
    pub amount_paid_kobo: i64,
    pub intent_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub state: RentalState,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = crate::schema::purchases)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content_id: String,
    pub content_type: ContentType,
    pub amount_paid_kobo: i64,
    pub intent_id: Uuid,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::purchases)]
pub struct NewPurchase<'a> {
    pub user_id: Uuid,
    pub content_id: &'a str,
    pub content_type: ContentType,
    pub amount_paid_kobo: i64,
    pub intent_id: Uuid,
}

/// Durable record of a settlement whose money movement succeeded but whose
/// grant (or reversal) did not. Swept by the background retry loop.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(table_name = crate::schema::reconciliation_tasks)]
pub struct ReconciliationTask {
    pub id: Uuid,
    pub intent_id: Uuid,
    pub stage: String,
    pub last_error: String,
    pub attempts: i32,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::reconciliation_tasks)]
pub struct NewReconciliationTask<'a> {
    pub intent_id: Uuid,
    pub stage: &'a str,
    pub last_error: &'a str,
}
