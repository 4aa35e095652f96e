use crate::error::ApiError;
use crate::models::entities::{NewPaymentIntent, PaymentIntent};
use crate::models::enums::IntentState;
use crate::schema::payment_intents;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

pub struct IntentRepository;

impl IntentRepository {
    /// Insert guarded by the (user_id, idempotency_key) unique constraint.
    /// A conflict means a retried client request: the stored intent is
    /// returned untouched and the caller must not open a second checkout.
    /// The bool is true only for a freshly inserted row.
    pub fn create_idempotent(
        conn: &mut PgConnection,
        new_intent: NewPaymentIntent<'_>,
    ) -> Result<(PaymentIntent, bool), ApiError> {
        let inserted_id = diesel::insert_into(payment_intents::table)
            .values(&new_intent)
            .on_conflict((payment_intents::user_id, payment_intents::idempotency_key))
            .do_nothing()
            .returning(payment_intents::id)
            .get_result::<Uuid>(conn)
            .optional()
            .map_err(ApiError::Database)?;

        match inserted_id {
            Some(id) => Ok((Self::find_by_id(conn, id)?, true)),
            None => {
                let existing = payment_intents::table
                    .filter(payment_intents::user_id.eq(new_intent.user_id))
                    .filter(payment_intents::idempotency_key.eq(new_intent.idempotency_key))
                    .first::<PaymentIntent>(conn)
                    .map_err(ApiError::Database)?;
                Ok((existing, false))
            }
        }
    }

    pub fn find_by_id(conn: &mut PgConnection, id: Uuid) -> Result<PaymentIntent, ApiError> {
        payment_intents::table
            .find(id)
            .first::<PaymentIntent>(conn)
            .map_err(ApiError::Database)
    }

    pub fn find_by_id_and_user(
        conn: &mut PgConnection,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<PaymentIntent>, ApiError> {
        payment_intents::table
            .find(id)
            .filter(payment_intents::user_id.eq(user_id))
            .first::<PaymentIntent>(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    /// Webhooks carry the provider reference; the poll path carries our id.
    /// Both converge here.
    pub fn find_by_reference(
        conn: &mut PgConnection,
        reference: &str,
    ) -> Result<Option<PaymentIntent>, ApiError> {
        if let Some(existing) = payment_intents::table
            .filter(payment_intents::provider_reference.eq(reference))
            .first::<PaymentIntent>(conn)
            .optional()
            .map_err(ApiError::Database)?
        {
            return Ok(Some(existing));
        }

        match Uuid::parse_str(reference) {
            Ok(id) => payment_intents::table
                .find(id)
                .first::<PaymentIntent>(conn)
                .optional()
                .map_err(ApiError::Database),
            Err(_) => Ok(None),
        }
    }

    /// Merges one key into the stored metadata object without touching state.
    pub fn merge_metadata(
        conn: &mut PgConnection,
        id: Uuid,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), ApiError> {
        let intent = Self::find_by_id(conn, id)?;
        let mut metadata = intent.metadata;
        metadata[key] = value;

        diesel::update(payment_intents::table.find(id))
            .set((
                payment_intents::metadata.eq(&metadata),
                payment_intents::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }

    /// Releases a refund claim after the provider rejected the refund call.
    /// Deliberately not a `transition`: the state machine has no
    /// `refunded -> success` edge, this un-does an optimistic claim whose
    /// provider half never happened.
    pub fn reopen_refund_claim(conn: &mut PgConnection, id: Uuid) -> Result<bool, ApiError> {
        let updated = diesel::update(payment_intents::table.find(id))
            .filter(payment_intents::state.eq(IntentState::Refunded))
            .set((
                payment_intents::state.eq(IntentState::Success),
                payment_intents::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;

        Ok(updated == 1)
    }

    /// State-guarded transition: updates only when the row is still in
    /// `from`, and reports whether this call won the transition. Duplicate
    /// webhook deliveries lose here and degrade to no-ops.
    pub fn transition(
        conn: &mut PgConnection,
        id: Uuid,
        from: IntentState,
        to: IntentState,
    ) -> Result<bool, ApiError> {
        debug_assert!(from.can_transition(to));

        let updated = diesel::update(payment_intents::table.find(id))
            .filter(payment_intents::state.eq(from))
            .set((
                payment_intents::state.eq(to),
                payment_intents::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;

        Ok(updated == 1)
    }

    /// `metadata` replaces the stored value wholesale; the service merges in
    /// the checkout URL before calling so idempotent replays can return it.
    pub fn mark_pending(
        conn: &mut PgConnection,
        id: Uuid,
        provider: &str,
        provider_reference: &str,
        metadata: &serde_json::Value,
    ) -> Result<bool, ApiError> {
        let updated = diesel::update(payment_intents::table.find(id))
            .filter(payment_intents::state.eq(IntentState::Initiated))
            .set((
                payment_intents::state.eq(IntentState::Pending),
                payment_intents::provider.eq(provider),
                payment_intents::provider_reference.eq(provider_reference),
                payment_intents::metadata.eq(metadata),
                payment_intents::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;

        Ok(updated == 1)
    }

    /// The failed intent remains on record for audit and debugging.
    pub fn mark_failed(conn: &mut PgConnection, id: Uuid, error: &str) -> Result<(), ApiError> {
        diesel::update(payment_intents::table.find(id))
            .filter(payment_intents::state.eq_any([IntentState::Initiated, IntentState::Pending]))
            .set((
                payment_intents::state.eq(IntentState::Failed),
                payment_intents::error.eq(error),
                payment_intents::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)?;
        Ok(())
    }
}
