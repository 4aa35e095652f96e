use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// What a successful payment settles into: a wallet credit, a time-boxed
/// rental, a permanent purchase, or a subscription period.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::PaymentPurpose"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentPurpose {
    WalletTopup,
    Rental,
    Purchase,
    Subscription,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::PaymentMethod"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    Wallet,
    Card,
}

/// Payment intent lifecycle. `Refunded` is terminal and reachable only from
/// `Success`; every transition is validated through [`IntentState::can_transition`]
/// and enforced in SQL with state-guarded updates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::IntentState"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IntentState {
    Initiated,
    Pending,
    Success,
    Failed,
    Refunded,
}

impl IntentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, IntentState::Success | IntentState::Failed | IntentState::Refunded)
    }

    pub fn can_transition(self, to: IntentState) -> bool {
        use IntentState::*;
        matches!(
            (self, to),
            (Initiated, Pending) | (Initiated, Failed) | (Pending, Success) | (Pending, Failed) | (Success, Refunded)
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::EntryKind"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    Credit,
    Debit,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::ContentType"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentType {
    Movie,
    Series,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, DbEnum, Display, EnumString, ToSchema,
)]
#[ExistingTypePath = "crate::schema::sql_types::RentalState"]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RentalState {
    Active,
    Expired,
    Revoked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!IntentState::Initiated.is_terminal());
        assert!(!IntentState::Pending.is_terminal());
        assert!(IntentState::Success.is_terminal());
        assert!(IntentState::Failed.is_terminal());
        assert!(IntentState::Refunded.is_terminal());
    }

    #[test]
    fn allowed_transitions() {
        use IntentState::*;
        assert!(Initiated.can_transition(Pending));
        assert!(Initiated.can_transition(Failed));
        assert!(Pending.can_transition(Success));
        assert!(Pending.can_transition(Failed));
        assert!(Success.can_transition(Refunded));
    }

    #[test]
    fn forbidden_transitions() {
        use IntentState::*;
        // Refunded is reachable only from Success.
        assert!(!Pending.can_transition(Refunded));
        assert!(!Failed.can_transition(Refunded));
        // Terminal states never move forward again.
        assert!(!Success.can_transition(Pending));
        assert!(!Failed.can_transition(Success));
        assert!(!Refunded.can_transition(Success));
        // No skipping the provider round-trip.
        assert!(!Initiated.can_transition(Success));
    }

    #[test]
    fn wire_names_are_snake_case() {
        assert_eq!(PaymentPurpose::WalletTopup.to_string(), "wallet_topup");
        assert_eq!(IntentState::Pending.to_string(), "pending");
        assert_eq!(
            serde_json::to_value(PaymentMethod::Card).unwrap(),
            serde_json::json!("card")
        );
    }
}
