//! Inquiry repository with the append-only message log.
//!
//! Appending increments `inquiries.message_count` first. The UPDATE takes the
//! inquiry row lock, so concurrent appends to one inquiry queue up and each
//! gets the next sequence number.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use domain::models::{Inquiry, NewInquiry, NewMessage};
use domain::ports::{InquiryStore, StoreError, StoreResult};

use crate::entities::{InquiryEntity, MessageEntity, SenderRoleDb};
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for inquiries and their messages.
#[derive(Clone)]
pub struct InquiryRepository {
    pool: PgPool,
}

impl InquiryRepository {
    /// Creates a new InquiryRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_message(
        tx: &mut Transaction<'_, Postgres>,
        inquiry_id: Uuid,
        seq: i32,
        message: &NewMessage,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO inquiry_messages (inquiry_id, seq, sender_role, sender_name, sender_id, text)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(inquiry_id)
        .bind(seq)
        .bind(SenderRoleDb::from(message.sender_role))
        .bind(&message.sender_name)
        .bind(message.sender_id)
        .bind(&message.text)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Option<Inquiry>, sqlx::Error> {
        let Some(row) = sqlx::query_as::<_, InquiryEntity>(
            r#"
            SELECT id, from_user_id, from_name, provider_id, event_date, status, message_count,
                   created_at, updated_at
            FROM inquiries
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let messages = sqlx::query_as::<_, MessageEntity>(
            r#"
            SELECT seq, sender_role, sender_name, sender_id, text, created_at
            FROM inquiry_messages
            WHERE inquiry_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.into_inquiry(messages)))
    }

    async fn create(&self, inquiry: NewInquiry) -> Result<Uuid, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO inquiries (from_user_id, from_name, provider_id, event_date, message_count)
            VALUES ($1, $2, $3, $4, 1)
            RETURNING id
            "#,
        )
        .bind(inquiry.from_user_id)
        .bind(&inquiry.from_name)
        .bind(inquiry.provider_id)
        .bind(inquiry.event_date)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_message(&mut tx, id, 1, &inquiry.first_message).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn append(&self, inquiry_id: Uuid, message: NewMessage) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let next: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE inquiries
            SET message_count = message_count + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING message_count
            "#,
        )
        .bind(inquiry_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((seq,)) = next else {
            tx.rollback().await?;
            return Ok(false);
        };

        Self::insert_message(&mut tx, inquiry_id, seq, &message).await?;
        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl InquiryStore for InquiryRepository {
    async fn create_inquiry(&self, inquiry: NewInquiry) -> StoreResult<Inquiry> {
        let timer = QueryTimer::new("create_inquiry");
        let id = self.create(inquiry).await.map_err(store_error)?;
        let result = self.load(id).await;
        timer.record();
        result
            .map_err(store_error)?
            .ok_or(StoreError::NotFound)
    }

    async fn find_inquiry(&self, id: Uuid) -> StoreResult<Option<Inquiry>> {
        let timer = QueryTimer::new("find_inquiry");
        let result = self.load(id).await;
        timer.record();
        result.map_err(store_error)
    }

    async fn append_message(
        &self,
        inquiry_id: Uuid,
        message: NewMessage,
    ) -> StoreResult<Option<Inquiry>> {
        let timer = QueryTimer::new("append_inquiry_message");
        let appended = self.append(inquiry_id, message).await;
        timer.record();
        if !appended.map_err(store_error)? {
            return Ok(None);
        }
        self.load(inquiry_id).await.map_err(store_error)
    }

    async fn delete_inquiry(&self, id: Uuid) -> StoreResult<bool> {
        let timer = QueryTimer::new("delete_inquiry");
        let result = sqlx::query("DELETE FROM inquiries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        result
            .map(|r| r.rows_affected() > 0)
            .map_err(store_error)
    }
}
