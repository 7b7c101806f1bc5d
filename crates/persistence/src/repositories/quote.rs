//! Quote repository.
//!
//! Decline and accept update the quote only while it is SENT and touch the
//! linked inquiry in the same transaction; acceptance also inserts the
//! pending booking there.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{Booking, NewQuote, Quote, QuoteAcceptance, QuoteDecline};
use domain::ports::{QuoteStore, StoreResult};

use super::booking::insert_booking;
use crate::entities::QuoteEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for quotes.
#[derive(Clone)]
pub struct QuoteRepository {
    pool: PgPool,
}

impl QuoteRepository {
    /// Creates a new QuoteRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn decline(&self, decline: QuoteDecline) -> Result<Option<QuoteEntity>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let declined = sqlx::query_as::<_, QuoteEntity>(
            r#"
            UPDATE quotes
            SET status = 'DECLINED', notes = $2, responded_at = $3, updated_at = $3
            WHERE id = $1 AND status = 'SENT'
            RETURNING id, provider_id, inquiry_id, client_user_id, total_price, notes,
                      event_date, status, responded_at, created_at
            "#,
        )
        .bind(decline.quote_id)
        .bind(&decline.notes)
        .bind(decline.responded_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(quote) = declined else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(inquiry_id) = quote.inquiry_id {
            sqlx::query(
                "UPDATE inquiries SET status = 'DECLINED', updated_at = $2 WHERE id = $1",
            )
            .bind(inquiry_id)
            .bind(decline.responded_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(quote))
    }

    async fn accept(
        &self,
        acceptance: QuoteAcceptance,
    ) -> Result<Option<(Quote, Booking)>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let accepted = sqlx::query_as::<_, QuoteEntity>(
            r#"
            UPDATE quotes
            SET status = 'ACCEPTED', responded_at = $2, updated_at = $2
            WHERE id = $1 AND status = 'SENT'
            RETURNING id, provider_id, inquiry_id, client_user_id, total_price, notes,
                      event_date, status, responded_at, created_at
            "#,
        )
        .bind(acceptance.quote_id)
        .bind(acceptance.responded_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(quote) = accepted else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(inquiry_id) = quote.inquiry_id {
            sqlx::query(
                "UPDATE inquiries SET status = 'CONVERTED', updated_at = $2 WHERE id = $1",
            )
            .bind(inquiry_id)
            .bind(acceptance.responded_at)
            .execute(&mut *tx)
            .await?;
        }

        let booking = insert_booking(&mut *tx, &acceptance.booking).await?;

        tx.commit().await?;
        Ok(Some((quote.into(), booking.into())))
    }
}

#[async_trait]
impl QuoteStore for QuoteRepository {
    async fn create_quote(&self, quote: NewQuote) -> StoreResult<Quote> {
        let timer = QueryTimer::new("create_quote");
        let result = sqlx::query_as::<_, QuoteEntity>(
            r#"
            INSERT INTO quotes (provider_id, inquiry_id, client_user_id, total_price, notes,
                                event_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, provider_id, inquiry_id, client_user_id, total_price, notes,
                      event_date, status, responded_at, created_at
            "#,
        )
        .bind(quote.provider_id)
        .bind(quote.inquiry_id)
        .bind(quote.client_user_id)
        .bind(quote.total_price)
        .bind(&quote.notes)
        .bind(quote.event_date)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Into::into).map_err(store_error)
    }

    async fn find_quote(&self, id: Uuid) -> StoreResult<Option<Quote>> {
        let timer = QueryTimer::new("find_quote");
        let result = sqlx::query_as::<_, QuoteEntity>(
            r#"
            SELECT id, provider_id, inquiry_id, client_user_id, total_price, notes,
                   event_date, status, responded_at, created_at
            FROM quotes
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }

    async fn mark_quote_sent(&self, id: Uuid) -> StoreResult<Option<Quote>> {
        let timer = QueryTimer::new("mark_quote_sent");
        let result = sqlx::query_as::<_, QuoteEntity>(
            r#"
            UPDATE quotes
            SET status = 'SENT', updated_at = NOW()
            WHERE id = $1 AND status = 'DRAFT'
            RETURNING id, provider_id, inquiry_id, client_user_id, total_price, notes,
                      event_date, status, responded_at, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }

    async fn decline_quote(&self, decline: QuoteDecline) -> StoreResult<Option<Quote>> {
        let timer = QueryTimer::new("decline_quote");
        let result = self.decline(decline).await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }

    async fn accept_quote(
        &self,
        acceptance: QuoteAcceptance,
    ) -> StoreResult<Option<(Quote, Booking)>> {
        let timer = QueryTimer::new("accept_quote");
        let result = self.accept(acceptance).await;
        timer.record();
        result.map_err(store_error)
    }
}
