//! Culture and tradition tag repository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::culture_tag::{CreateCultureTagRequest, UpdateCultureTagRequest};
use domain::models::CultureTraditionTag;
use domain::ports::{CultureTagStore, StoreResult};

use crate::entities::CultureTagEntity;
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Repository for culture and tradition tags.
#[derive(Clone)]
pub struct CultureTagRepository {
    pool: PgPool,
}

impl CultureTagRepository {
    /// Creates a new CultureTagRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CultureTagStore for CultureTagRepository {
    async fn list_tags(&self, active_only: bool) -> StoreResult<Vec<CultureTraditionTag>> {
        let timer = QueryTimer::new("list_culture_tags");
        let result = sqlx::query_as::<_, CultureTagEntity>(
            r#"
            SELECT id, name, slug, display_order, is_active, created_at
            FROM culture_tradition_tags
            WHERE is_active OR NOT $1
            ORDER BY display_order ASC, name ASC
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(store_error)
    }

    async fn create_tag(&self, tag: &CreateCultureTagRequest) -> StoreResult<CultureTraditionTag> {
        let timer = QueryTimer::new("create_culture_tag");
        let result = sqlx::query_as::<_, CultureTagEntity>(
            r#"
            INSERT INTO culture_tradition_tags (name, slug, display_order, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, slug, display_order, is_active, created_at
            "#,
        )
        .bind(tag.name.trim())
        .bind(&tag.slug)
        .bind(tag.display_order)
        .bind(tag.is_active)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Into::into).map_err(store_error)
    }

    async fn update_tag(
        &self,
        id: Uuid,
        update: &UpdateCultureTagRequest,
    ) -> StoreResult<Option<CultureTraditionTag>> {
        let timer = QueryTimer::new("update_culture_tag");
        let result = sqlx::query_as::<_, CultureTagEntity>(
            r#"
            UPDATE culture_tradition_tags
            SET name = COALESCE($2, name),
                display_order = COALESCE($3, display_order),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, slug, display_order, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(update.name.as_deref().map(str::trim))
        .bind(update.display_order)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }
}
