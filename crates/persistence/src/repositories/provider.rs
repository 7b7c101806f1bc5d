//! Provider repository: lookups, the nearby query and cascade deletion.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::{CascadeReport, Listing, NearbyQuery, Provider, ProviderDependent, ProviderSummary};
use domain::ports::{ProviderStore, StoreResult};
use domain::services::recommendation::EARTH_RADIUS_MILES;

use crate::entities::{ListingEntity, NearbyProviderEntity, ProviderEntity};
use crate::error::store_error;
use crate::metrics::QueryTimer;

/// Miles spanned by one degree of latitude.
const MILES_PER_DEGREE_LAT: f64 = EARTH_RADIUS_MILES * std::f64::consts::PI / 180.0;

/// Repository for providers and their listings.
#[derive(Clone)]
pub struct ProviderRepository {
    pool: PgPool,
}

impl ProviderRepository {
    /// Creates a new ProviderRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn cascade(&self, id: Uuid) -> Result<Option<CascadeReport>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM providers WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let mut deleted = Vec::with_capacity(ProviderDependent::ALL.len());
        for kind in ProviderDependent::ALL {
            let result = sqlx::query(&format!(
                "DELETE FROM {} WHERE provider_id = $1",
                kind.table_name()
            ))
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!(provider_id = %id, table = %kind, error = %e, "Cascade step failed");
                e
            })?;
            deleted.push((kind, result.rows_affected()));
        }

        sqlx::query("DELETE FROM providers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(CascadeReport {
            provider_id: id,
            deleted,
        }))
    }
}

#[async_trait]
impl ProviderStore for ProviderRepository {
    async fn find_provider(&self, id: Uuid) -> StoreResult<Option<Provider>> {
        let timer = QueryTimer::new("find_provider_by_id");
        let result = sqlx::query_as::<_, ProviderEntity>(
            r#"
            SELECT id, owner_user_id, business_name, slug, latitude, longitude, is_published,
                   is_verified, categories, average_rating, review_count, price_from, currency,
                   created_at
            FROM providers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }

    async fn find_provider_by_owner(&self, owner_user_id: Uuid) -> StoreResult<Option<Provider>> {
        let timer = QueryTimer::new("find_provider_by_owner");
        let result = sqlx::query_as::<_, ProviderEntity>(
            r#"
            SELECT id, owner_user_id, business_name, slug, latitude, longitude, is_published,
                   is_verified, categories, average_rating, review_count, price_from, currency,
                   created_at
            FROM providers
            WHERE owner_user_id = $1
            "#,
        )
        .bind(owner_user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(Into::into)).map_err(store_error)
    }

    async fn slug_exists(&self, slug: &str) -> StoreResult<bool> {
        let timer = QueryTimer::new("provider_slug_exists");
        let result: Result<(bool,), _> =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM providers WHERE slug = $1)")
                .bind(slug)
                .fetch_one(&self.pool)
                .await;
        timer.record();
        result.map(|(exists,)| exists).map_err(store_error)
    }

    async fn find_listings(&self, provider_id: Uuid, ids: &[Uuid]) -> StoreResult<Vec<Listing>> {
        let timer = QueryTimer::new("find_provider_listings");
        let result = sqlx::query_as::<_, ListingEntity>(
            r#"
            SELECT id, provider_id, headline, price, is_active
            FROM listings
            WHERE provider_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(provider_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(store_error)
    }

    async fn find_nearby(&self, query: &NearbyQuery) -> StoreResult<Vec<ProviderSummary>> {
        let timer = QueryTimer::new("find_nearby_providers");
        // Latitude band prefilter; the exact distance check follows.
        let lat_delta = query.radius_miles / MILES_PER_DEGREE_LAT;
        let result = sqlx::query_as::<_, NearbyProviderEntity>(
            r#"
            SELECT * FROM (
                SELECT id, business_name, slug, categories, average_rating, review_count,
                       price_from, is_verified,
                       2 * $5 * ASIN(LEAST(1.0, SQRT(
                           POWER(SIN(RADIANS(latitude - $1) / 2), 2)
                           + COS(RADIANS($1)) * COS(RADIANS(latitude))
                             * POWER(SIN(RADIANS(longitude - $2) / 2), 2)
                       ))) AS distance_miles
                FROM providers
                WHERE is_published
                  AND latitude IS NOT NULL
                  AND longitude IS NOT NULL
                  AND latitude BETWEEN $1 - $6 AND $1 + $6
                  AND ($3::uuid IS NULL OR id <> $3)
            ) nearby
            WHERE distance_miles < $4
            ORDER BY distance_miles ASC, id ASC
            LIMIT $7
            "#,
        )
        .bind(query.latitude)
        .bind(query.longitude)
        .bind(query.exclude_provider_id)
        .bind(query.radius_miles)
        .bind(EARTH_RADIUS_MILES)
        .bind(lat_delta)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
            .map(|rows| rows.into_iter().map(Into::into).collect())
            .map_err(store_error)
    }

    async fn delete_provider_cascade(&self, id: Uuid) -> StoreResult<Option<CascadeReport>> {
        let timer = QueryTimer::new("delete_provider_cascade");
        let result = self.cascade(id).await;
        timer.record();
        result.map_err(store_error)
    }
}
