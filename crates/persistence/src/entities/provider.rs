//! Provider and listing entities (database row mappings).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::{Listing, Provider, ProviderSummary};

/// Database row mapping for the providers table.
#[derive(Debug, Clone, FromRow)]
pub struct ProviderEntity {
    pub id: Uuid,
    pub owner_user_id: Uuid,
    pub business_name: String,
    pub slug: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_published: bool,
    pub is_verified: bool,
    pub categories: Vec<String>,
    pub average_rating: f64,
    pub review_count: i32,
    pub price_from: Option<Decimal>,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl From<ProviderEntity> for Provider {
    fn from(entity: ProviderEntity) -> Self {
        Self {
            id: entity.id,
            owner_user_id: entity.owner_user_id,
            business_name: entity.business_name,
            slug: entity.slug,
            latitude: entity.latitude,
            longitude: entity.longitude,
            is_published: entity.is_published,
            is_verified: entity.is_verified,
            categories: entity.categories,
            average_rating: entity.average_rating,
            review_count: entity.review_count,
            price_from: entity.price_from,
            currency: entity.currency,
            created_at: entity.created_at,
        }
    }
}

/// Result row of the nearby provider query.
#[derive(Debug, Clone, FromRow)]
pub struct NearbyProviderEntity {
    pub id: Uuid,
    pub business_name: String,
    pub slug: String,
    pub categories: Vec<String>,
    pub average_rating: f64,
    pub review_count: i32,
    pub price_from: Option<Decimal>,
    pub is_verified: bool,
    pub distance_miles: f64,
}

impl From<NearbyProviderEntity> for ProviderSummary {
    fn from(entity: NearbyProviderEntity) -> Self {
        Self {
            id: entity.id,
            business_name: entity.business_name,
            slug: entity.slug,
            categories: entity.categories,
            average_rating: entity.average_rating,
            review_count: entity.review_count,
            price_from: entity.price_from,
            is_verified: entity.is_verified,
            distance_miles: entity.distance_miles,
        }
    }
}

/// Database row mapping for the listings table.
#[derive(Debug, Clone, FromRow)]
pub struct ListingEntity {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub headline: String,
    pub price: Decimal,
    pub is_active: bool,
}

impl From<ListingEntity> for Listing {
    fn from(entity: ListingEntity) -> Self {
        Self {
            id: entity.id,
            provider_id: entity.provider_id,
            headline: entity.headline,
            price: entity.price,
            is_active: entity.is_active,
        }
    }
}
