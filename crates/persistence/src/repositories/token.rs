//! Password reset and email verification token repository.
//!
//! Tokens are stored as SHA-256 hashes. Consuming a token is one
//! transaction that marks it used and applies its effect to the user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{SingleUseToken, TokenPurpose};
use domain::ports::{StoreResult, TokenStore};

use crate::entities::SingleUseTokenEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

fn table(purpose: TokenPurpose) -> &'static str {
    match purpose {
        TokenPurpose::PasswordReset => "password_resets",
        TokenPurpose::EmailVerification => "email_verifications",
    }
}

/// Repository for single-use account tokens.
#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    /// Creates a new TokenRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Marks the token used and runs `effect` for its user in one
    /// transaction. Returns `false` when the token was already used and
    /// `RowNotFound` when the user is gone.
    async fn consume(
        &self,
        purpose: TokenPurpose,
        token_id: Uuid,
        used_at: DateTime<Utc>,
        effect: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let marked = sqlx::query(&format!(
            "UPDATE {} SET used_at = $2 WHERE id = $1 AND used_at IS NULL",
            table(purpose)
        ))
        .bind(token_id)
        .bind(used_at)
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let applied = effect.execute(&mut *tx).await?;
        if applied.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl TokenStore for TokenRepository {
    async fn insert_token(
        &self,
        purpose: TokenPurpose,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<SingleUseToken> {
        let timer = QueryTimer::new("insert_single_use_token");
        let result = sqlx::query_as::<_, SingleUseTokenEntity>(&format!(
            r#"
            INSERT INTO {} (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token_hash, expires_at, used_at, created_at
            "#,
            table(purpose)
        ))
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Into::into).map_err(store_error)
    }

    async fn find_token(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
    ) -> StoreResult<Option<SingleUseToken>> {
        let timer = QueryTimer::new("find_single_use_token");
        let result = sqlx::query_as::<_, SingleUseTokenEntity>(&format!(
            r#"
            SELECT id, user_id, token_hash, expires_at, used_at, created_at
            FROM {}
            WHERE token_hash = $1
            "#,
            table(purpose)
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }

    async fn consume_password_reset(
        &self,
        token: &SingleUseToken,
        new_password_hash: &str,
        used_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let timer = QueryTimer::new("consume_password_reset");
        let effect = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(token.user_id)
        .bind(new_password_hash.to_string());
        let result = self
            .consume(TokenPurpose::PasswordReset, token.id, used_at, effect)
            .await;
        timer.record();
        result.map_err(store_error)
    }

    async fn consume_email_verification(
        &self,
        token: &SingleUseToken,
        used_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let timer = QueryTimer::new("consume_email_verification");
        let effect = sqlx::query(
            "UPDATE users SET email_verified = true, updated_at = NOW() WHERE id = $1",
        )
        .bind(token.user_id);
        let result = self
            .consume(TokenPurpose::EmailVerification, token.id, used_at, effect)
            .await;
        timer.record();
        result.map_err(store_error)
    }
}
