use crate::error::ApiError;
use crate::models::entities::{NewPurchase, NewRental, Purchase, Rental};
use crate::models::enums::RentalState;
use crate::schema::{purchases, rentals};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

pub struct EntitlementRepository;

impl EntitlementRepository {
    pub fn active_rental(
        conn: &mut PgConnection,
        user_id: Uuid,
        content_id: &str,
    ) -> Result<Option<Rental>, ApiError> {
        rentals::table
            .filter(rentals::user_id.eq(user_id))
            .filter(rentals::content_id.eq(content_id))
            .filter(rentals::state.eq(RentalState::Active))
            .filter(rentals::expires_at.gt(Utc::now()))
            .first::<Rental>(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    /// The partial unique index on (user_id, content_id) WHERE active backs
    /// this up: a racing duplicate insert surfaces as a unique violation.
    pub fn insert_rental(conn: &mut PgConnection, rental: NewRental<'_>) -> Result<Rental, ApiError> {
        diesel::insert_into(rentals::table)
            .values(rental)
            .get_result::<Rental>(conn)
            .map_err(ApiError::Database)
    }

    /// Keyed on intent_id: a second grant attempt for the same settled
    /// payment inserts nothing and is reported as such.
    pub fn insert_purchase_idempotent(
        conn: &mut PgConnection,
        purchase: NewPurchase<'_>,
    ) -> Result<bool, ApiError> {
        let inserted = diesel::insert_into(purchases::table)
            .values(purchase)
            .on_conflict(purchases::intent_id)
            .do_nothing()
            .execute(conn)
            .map_err(ApiError::Database)?;

        Ok(inserted == 1)
    }

    pub fn unrevoked_purchase(
        conn: &mut PgConnection,
        user_id: Uuid,
        content_id: &str,
    ) -> Result<Option<Purchase>, ApiError> {
        purchases::table
            .filter(purchases::user_id.eq(user_id))
            .filter(purchases::content_id.eq(content_id))
            .filter(purchases::revoked.eq(false))
            .first::<Purchase>(conn)
            .optional()
            .map_err(ApiError::Database)
    }

    pub fn revoke_rental_by_intent(conn: &mut PgConnection, intent_id: Uuid) -> Result<usize, ApiError> {
        diesel::update(rentals::table)
            .filter(rentals::intent_id.eq(intent_id))
            .filter(rentals::state.eq(RentalState::Active))
            .set((
                rentals::state.eq(RentalState::Revoked),
                rentals::updated_at.eq(Utc::now()),
            ))
            .execute(conn)
            .map_err(ApiError::Database)
    }

    pub fn revoke_purchase_by_intent(
        conn: &mut PgConnection,
        intent_id: Uuid,
    ) -> Result<usize, ApiError> {
        diesel::update(purchases::table)
            .filter(purchases::intent_id.eq(intent_id))
            .filter(purchases::revoked.eq(false))
            .set(purchases::revoked.eq(true))
            .execute(conn)
            .map_err(ApiError::Database)
    }

    /// Background sweep: active rentals past their expiry flip to expired.
    pub fn expire_overdue_rentals(
        conn: &mut PgConnection,
        now: DateTime<Utc>,
    ) -> Result<usize, ApiError> {
        diesel::update(rentals::table)
            .filter(rentals::state.eq(RentalState::Active))
            .filter(rentals::expires_at.le(now))
            .set((
                rentals::state.eq(RentalState::Expired),
                rentals::updated_at.eq(now),
            ))
            .execute(conn)
            .map_err(ApiError::Database)
    }
}
