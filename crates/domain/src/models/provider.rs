//! Provider (vendor) and listing domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A vendor business offering services on the marketplace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
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

/// A priced offering of a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub headline: String,
    pub price: Decimal,
    pub is_active: bool,
}

/// Provider summary returned by the recommendation query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
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

impl ProviderSummary {
    pub fn from_provider(p: &Provider, distance_miles: f64) -> Self {
        Self {
            id: p.id,
            business_name: p.business_name.clone(),
            slug: p.slug.clone(),
            categories: p.categories.clone(),
            average_rating: p.average_rating,
            review_count: p.review_count,
            price_from: p.price_from,
            is_verified: p.is_verified,
            distance_miles,
        }
    }
}

/// Rows that belong to a provider and are removed with it.
///
/// `ALL` is the deletion order: rows referencing other dependents come
/// before the rows they reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderDependent {
    Payouts,
    Reviews,
    Bookings,
    Quotes,
    Inquiries,
    Favorites,
    TeamMembers,
    WeeklySchedules,
    Listings,
}

impl ProviderDependent {
    pub const ALL: [ProviderDependent; 9] = [
        ProviderDependent::Payouts,
        ProviderDependent::Reviews,
        ProviderDependent::Bookings,
        ProviderDependent::Quotes,
        ProviderDependent::Inquiries,
        ProviderDependent::Favorites,
        ProviderDependent::TeamMembers,
        ProviderDependent::WeeklySchedules,
        ProviderDependent::Listings,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            ProviderDependent::Payouts => "payouts",
            ProviderDependent::Reviews => "reviews",
            ProviderDependent::Bookings => "bookings",
            ProviderDependent::Quotes => "quotes",
            ProviderDependent::Inquiries => "inquiries",
            ProviderDependent::Favorites => "favorites",
            ProviderDependent::TeamMembers => "team_members",
            ProviderDependent::WeeklySchedules => "weekly_schedules",
            ProviderDependent::Listings => "listings",
        }
    }
}

impl fmt::Display for ProviderDependent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

/// Outcome of a provider cascade deletion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub provider_id: Uuid,
    pub deleted: Vec<(ProviderDependent, u64)>,
}

impl CascadeReport {
    pub fn total_rows(&self) -> u64 {
        self.deleted.iter().map(|(_, n)| n).sum()
    }
}

/// Response for the slug availability check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugAvailability {
    pub slug: String,
    pub available: bool,
}
