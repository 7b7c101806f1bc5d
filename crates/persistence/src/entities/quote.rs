//! Quote entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Quote, QuoteStatus};

/// Database enum for quote_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "quote_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatusDb {
    Draft,
    Sent,
    Accepted,
    Declined,
}

impl From<QuoteStatusDb> for QuoteStatus {
    fn from(db: QuoteStatusDb) -> Self {
        match db {
            QuoteStatusDb::Draft => Self::Draft,
            QuoteStatusDb::Sent => Self::Sent,
            QuoteStatusDb::Accepted => Self::Accepted,
            QuoteStatusDb::Declined => Self::Declined,
        }
    }
}

/// Database row mapping for the quotes table.
#[derive(Debug, Clone, FromRow)]
pub struct QuoteEntity {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub inquiry_id: Option<Uuid>,
    pub client_user_id: Option<Uuid>,
    pub total_price: Decimal,
    pub notes: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub status: QuoteStatusDb,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<QuoteEntity> for Quote {
    fn from(entity: QuoteEntity) -> Self {
        Self {
            id: entity.id,
            provider_id: entity.provider_id,
            inquiry_id: entity.inquiry_id,
            client_user_id: entity.client_user_id,
            total_price: entity.total_price,
            notes: entity.notes,
            event_date: entity.event_date,
            status: entity.status.into(),
            responded_at: entity.responded_at,
            created_at: entity.created_at,
        }
    }
}
