use crate::error::ApiError;
use crate::models::entities::{LedgerEntry, PaymentIntent, Wallet};
use crate::models::enums::{ContentType, EntryKind, IntentState, PaymentMethod, PaymentPurpose};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Smallest amount Paystack will charge, in kobo.
pub const MIN_CHARGE_KOBO: i64 = 100;

pub const SUPPORTED_CURRENCIES: &[&str] = &["NGN"];

/// Everything is minor units (kobo) end-to-end; no floats in the money path.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PaymentRequest {
    #[validate(range(min = 100, message = "Amount must be at least 100 kobo"))]
    pub amount_kobo: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub purpose: PaymentPurpose,
    pub method: PaymentMethod,
    #[validate(length(min = 8, max = 128, message = "Idempotency key must be 8-128 characters"))]
    pub idempotency_key: String,
    #[validate(length(min = 1, max = 128))]
    pub content_id: Option<String>,
    pub content_type: Option<ContentType>,
    #[validate(range(min = 1, max = 720, message = "Rental duration must be 1-720 hours"))]
    pub rental_duration_hours: Option<i64>,
}

fn default_currency() -> String {
    "NGN".to_string()
}

impl PaymentRequest {
    /// Cross-field checks `validator` cannot express: which fields each
    /// purpose requires, and which purpose/method combinations make sense.
    pub fn validate_shape(&self) -> Result<(), ApiError> {
        if !SUPPORTED_CURRENCIES.contains(&self.currency.to_uppercase().as_str()) {
            return Err(ApiError::BadRequest(format!(
                "Unsupported currency: {}",
                self.currency
            )));
        }

        match self.purpose {
            PaymentPurpose::WalletTopup => {
                if self.method == PaymentMethod::Wallet {
                    return Err(ApiError::BadRequest(
                        "A wallet cannot be topped up from itself".into(),
                    ));
                }
                if self.content_id.is_some() || self.content_type.is_some() {
                    return Err(ApiError::BadRequest(
                        "Top-ups must not reference content".into(),
                    ));
                }
            }
            PaymentPurpose::Rental | PaymentPurpose::Purchase => {
                if self.content_id.is_none() || self.content_type.is_none() {
                    return Err(ApiError::BadRequest(format!(
                        "A {} payment requires content_id and content_type",
                        self.purpose
                    )));
                }
            }
            PaymentPurpose::Subscription => {
                if self.content_id.is_some() {
                    return Err(ApiError::BadRequest(
                        "Subscriptions must not reference content".into(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Free-form metadata carried on the intent, read back at grant time.
    pub fn metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "content_id": self.content_id,
            "content_type": self.content_type,
            "rental_duration_hours": self.rental_duration_hours,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub state: IntentState,
    pub amount_kobo: i64,
    /// Present only for card payments awaiting checkout.
    pub checkout_url: Option<String>,
}

impl From<&PaymentIntent> for PaymentResponse {
    fn from(intent: &PaymentIntent) -> Self {
        PaymentResponse {
            payment_id: intent.id,
            state: intent.state,
            amount_kobo: intent.amount_kobo,
            checkout_url: None,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentStatusResponse {
    pub payment_id: Uuid,
    pub state: IntentState,
    pub purpose: PaymentPurpose,
    pub amount_kobo: i64,
    pub currency: String,
    pub provider_reference: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentIntent> for PaymentStatusResponse {
    fn from(intent: PaymentIntent) -> Self {
        PaymentStatusResponse {
            payment_id: intent.id,
            state: intent.state,
            purpose: intent.purpose,
            amount_kobo: intent.amount_kobo,
            currency: intent.currency,
            provider_reference: intent.provider_reference,
            error: intent.error,
            created_at: intent.created_at,
            updated_at: intent.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletResponse {
    pub wallet_id: Uuid,
    pub balance_kobo: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletResponse {
    fn from(wallet: Wallet) -> Self {
        WalletResponse {
            wallet_id: wallet.id,
            balance_kobo: wallet.balance_kobo,
            updated_at: wallet.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerEntryDto {
    pub id: Uuid,
    pub amount_kobo: i64,
    pub kind: EntryKind,
    pub description: String,
    pub balance_after_kobo: i64,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerEntryDto {
    fn from(entry: LedgerEntry) -> Self {
        LedgerEntryDto {
            id: entry.id,
            amount_kobo: entry.amount_kobo,
            kind: entry.kind,
            description: entry.description,
            balance_after_kobo: entry.balance_after_kobo,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerHistoryResponse {
    pub entries: Vec<LedgerEntryDto>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefundRequest {
    #[validate(length(min = 3, max = 500, message = "Reason must be 3-500 characters"))]
    pub reason: String,
    /// Omitted means a full refund.
    #[validate(range(min = 1))]
    pub amount_kobo: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefundResponse {
    pub payment_id: Uuid,
    pub refunded_kobo: i64,
    pub state: IntentState,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdminAdjustmentRequest {
    pub user_id: Uuid,
    /// Signed: positive credits, negative debits.
    pub amount_kobo: i64,
    #[validate(length(min = 3, max = 500, message = "Reason must be 3-500 characters"))]
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminAdjustmentResponse {
    pub user_id: Uuid,
    pub balance_kobo: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
