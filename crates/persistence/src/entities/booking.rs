//! Booking entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Booking, BookingStatus};

/// Database enum for booking_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatusDb {
    PendingPayment,
    Confirmed,
    Completed,
    Cancelled,
}

impl From<BookingStatusDb> for BookingStatus {
    fn from(db: BookingStatusDb) -> Self {
        match db {
            BookingStatusDb::PendingPayment => Self::PendingPayment,
            BookingStatusDb::Confirmed => Self::Confirmed,
            BookingStatusDb::Completed => Self::Completed,
            BookingStatusDb::Cancelled => Self::Cancelled,
        }
    }
}

impl From<BookingStatus> for BookingStatusDb {
    fn from(status: BookingStatus) -> Self {
        match status {
            BookingStatus::PendingPayment => Self::PendingPayment,
            BookingStatus::Confirmed => Self::Confirmed,
            BookingStatus::Completed => Self::Completed,
            BookingStatus::Cancelled => Self::Cancelled,
        }
    }
}

/// Database row mapping for the bookings table.
#[derive(Debug, Clone, FromRow)]
pub struct BookingEntity {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub client_user_id: Option<Uuid>,
    pub quote_id: Option<Uuid>,
    pub event_date: NaiveDate,
    pub status: BookingStatusDb,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_session_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub listing_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookingEntity> for Booking {
    fn from(entity: BookingEntity) -> Self {
        Self {
            id: entity.id,
            provider_id: entity.provider_id,
            client_user_id: entity.client_user_id,
            quote_id: entity.quote_id,
            event_date: entity.event_date,
            status: entity.status.into(),
            total_amount: entity.total_amount,
            currency: entity.currency,
            payment_session_id: entity.payment_session_id,
            paid_at: entity.paid_at,
            contact_name: entity.contact_name,
            contact_email: entity.contact_email,
            contact_phone: entity.contact_phone,
            listing_ids: entity.listing_ids,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
