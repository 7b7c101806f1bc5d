//! Booking repository.
//!
//! Status changes are conditional updates: the WHERE clause carries the
//! expected current status and a missing row means the precondition failed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use domain::models::{Booking, BookingFilter, BookingStatus, NewBooking};
use domain::ports::{BookingStore, StoreError, StoreResult};

use crate::entities::{BookingEntity, BookingStatusDb};
use crate::error::store_error;
use crate::metrics::QueryTimer;

pub(crate) const BOOKING_COLUMNS: &str = "id, provider_id, client_user_id, quote_id, event_date, \
     status, total_amount, currency, payment_session_id, paid_at, contact_name, contact_email, \
     contact_phone, listing_ids, created_at, updated_at";

/// Inserts a booking row. Shared with the quote acceptance transaction.
pub(crate) async fn insert_booking<'e, E>(
    executor: E,
    booking: &NewBooking,
) -> Result<BookingEntity, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, BookingEntity>(&format!(
        r#"
        INSERT INTO bookings (provider_id, client_user_id, quote_id, event_date, status,
                              total_amount, currency, payment_session_id, paid_at, contact_name,
                              contact_email, contact_phone, listing_ids)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(booking.provider_id)
    .bind(booking.client_user_id)
    .bind(booking.quote_id)
    .bind(booking.event_date)
    .bind(BookingStatusDb::from(booking.status))
    .bind(booking.total_amount)
    .bind(&booking.currency)
    .bind(&booking.payment_session_id)
    .bind(booking.paid_at)
    .bind(&booking.contact_name)
    .bind(&booking.contact_email)
    .bind(&booking.contact_phone)
    .bind(&booking.listing_ids)
    .fetch_one(executor)
    .await
}

/// Repository for bookings.
#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Creates a new BookingRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_by_session(&self, session_id: &str) -> Result<Option<BookingEntity>, sqlx::Error> {
        sqlx::query_as::<_, BookingEntity>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE payment_session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[async_trait]
impl BookingStore for BookingRepository {
    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let timer = QueryTimer::new("create_booking");
        let result = insert_booking(&self.pool, &booking).await;
        timer.record();
        result.map(Into::into).map_err(store_error)
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let timer = QueryTimer::new("find_booking");
        let result = sqlx::query_as::<_, BookingEntity>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }

    async fn attach_payment_session(
        &self,
        booking_id: Uuid,
        session_id: &str,
    ) -> StoreResult<Option<Booking>> {
        let timer = QueryTimer::new("attach_payment_session");
        let result = sqlx::query_as::<_, BookingEntity>(&format!(
            r#"
            UPDATE bookings
            SET payment_session_id = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING_PAYMENT'
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }

    async fn confirm_booking_payment(
        &self,
        booking_id: Uuid,
        session_id: &str,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let timer = QueryTimer::new("confirm_booking_payment");
        let result = sqlx::query_as::<_, BookingEntity>(&format!(
            r#"
            UPDATE bookings
            SET status = 'CONFIRMED', payment_session_id = $2, paid_at = $3, updated_at = $3
            WHERE id = $1 AND status = 'PENDING_PAYMENT'
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking_id)
        .bind(session_id)
        .bind(paid_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }

    async fn materialize_paid_booking(&self, booking: NewBooking) -> StoreResult<(Booking, bool)> {
        let timer = QueryTimer::new("materialize_paid_booking");
        let inserted = sqlx::query_as::<_, BookingEntity>(&format!(
            r#"
            INSERT INTO bookings (provider_id, client_user_id, quote_id, event_date, status,
                                  total_amount, currency, payment_session_id, paid_at,
                                  contact_name, contact_email, contact_phone, listing_ids)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (payment_session_id) DO NOTHING
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(booking.provider_id)
        .bind(booking.client_user_id)
        .bind(booking.quote_id)
        .bind(booking.event_date)
        .bind(BookingStatusDb::from(booking.status))
        .bind(booking.total_amount)
        .bind(&booking.currency)
        .bind(&booking.payment_session_id)
        .bind(booking.paid_at)
        .bind(&booking.contact_name)
        .bind(&booking.contact_email)
        .bind(&booking.contact_phone)
        .bind(&booking.listing_ids)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        let result = match (inserted, booking.payment_session_id.as_deref()) {
            (Some(created), _) => Ok((created.into(), true)),
            (None, Some(session_id)) => self
                .find_by_session(session_id)
                .await
                .map_err(store_error)?
                .map(|existing| (existing.into(), false))
                .ok_or(StoreError::NotFound),
            (None, None) => Err(StoreError::NotFound),
        };
        timer.record();
        result
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<(Vec<Booking>, i64)> {
        let timer = QueryTimer::new("list_bookings");
        let status = filter.status.map(BookingStatusDb::from);

        let total: Result<(i64,), _> = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM bookings
            WHERE ($1::booking_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR provider_id = $2)
              AND ($3::date IS NULL OR event_date >= $3)
              AND ($4::date IS NULL OR event_date <= $4)
            "#,
        )
        .bind(status)
        .bind(filter.provider_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_one(&self.pool)
        .await;
        let (total,) = total.map_err(store_error)?;

        let rows = sqlx::query_as::<_, BookingEntity>(&format!(
            r#"
            SELECT {BOOKING_COLUMNS}
            FROM bookings
            WHERE ($1::booking_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR provider_id = $2)
              AND ($3::date IS NULL OR event_date >= $3)
              AND ($4::date IS NULL OR event_date <= $4)
            ORDER BY event_date DESC, created_at DESC
            LIMIT $5 OFFSET $6
            "#
        ))
        .bind(status)
        .bind(filter.provider_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.limit())
        .bind(filter.offset())
        .fetch_all(&self.pool)
        .await;
        timer.record();

        let rows = rows.map_err(store_error)?;
        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> StoreResult<Option<Booking>> {
        let timer = QueryTimer::new("set_booking_status");
        let result = sqlx::query_as::<_, BookingEntity>(&format!(
            r#"
            UPDATE bookings
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(BookingStatusDb::from(status))
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }
}
