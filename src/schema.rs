// Diesel table definitions, maintained by hand alongside migrations/.

pub mod sql_types {
    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "payment_purpose"))]
    pub struct PaymentPurpose;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "payment_method"))]
    pub struct PaymentMethod;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "intent_state"))]
    pub struct IntentState;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "entry_kind"))]
    pub struct EntryKind;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "content_type"))]
    pub struct ContentType;

    #[derive(diesel::query_builder::QueryId, diesel::sql_types::SqlType)]
    #[diesel(postgres_type(name = "rental_state"))]
    pub struct RentalState;
}

diesel::table! {
    wallets (id) {
        id -> Uuid,
        user_id -> Uuid,
        balance_kobo -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use super::sql_types::EntryKind;

    wallet_ledger (id) {
        id -> Uuid,
        wallet_id -> Uuid,
        intent_id -> Nullable<Uuid>,
        amount_kobo -> Int8,
        kind -> EntryKind,
        description -> Text,
        metadata -> Jsonb,
        balance_after_kobo -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use super::sql_types::{PaymentPurpose, PaymentMethod, IntentState};

    payment_intents (id) {
        id -> Uuid,
        user_id -> Uuid,
        amount_kobo -> Int8,
        #[max_length = 3]
        currency -> Varchar,
        purpose -> PaymentPurpose,
        method -> PaymentMethod,
        metadata -> Jsonb,
        idempotency_key -> Text,
        provider -> Nullable<Text>,
        provider_reference -> Nullable<Text>,
        state -> IntentState,
        error -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use super::sql_types::{ContentType, RentalState};

    rentals (id) {
        id -> Uuid,
        user_id -> Uuid,
        content_id -> Text,
        content_type -> ContentType,
        amount_paid_kobo -> Int8,
        intent_id -> Nullable<Uuid>,
        expires_at -> Timestamptz,
        state -> RentalState,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    use diesel::sql_types::*;
    use super::sql_types::ContentType;

    purchases (id) {
        id -> Uuid,
        user_id -> Uuid,
        content_id -> Text,
        content_type -> ContentType,
        amount_paid_kobo -> Int8,
        intent_id -> Uuid,
        revoked -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    reconciliation_tasks (id) {
        id -> Uuid,
        intent_id -> Uuid,
        stage -> Text,
        last_error -> Text,
        attempts -> Int4,
        resolved -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(wallet_ledger -> wallets (wallet_id));
diesel::joinable!(wallet_ledger -> payment_intents (intent_id));
diesel::joinable!(rentals -> payment_intents (intent_id));
diesel::joinable!(purchases -> payment_intents (intent_id));
diesel::joinable!(reconciliation_tasks -> payment_intents (intent_id));

diesel::allow_tables_to_appear_in_same_query!(
    wallets,
    wallet_ledger,
    payment_intents,
    rentals,
    purchases,
    reconciliation_tasks,
);
