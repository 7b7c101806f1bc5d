//! Nearby provider recommendations.

use crate::error::{DomainError, DomainResult};
use crate::models::provider::SlugAvailability;
use crate::models::recommendation::{NearbyQuery, RecommendationParams};
use crate::models::ProviderSummary;
use crate::ports::ProviderStore;

/// Mean Earth radius in miles used by every distance computation,
/// including the SQL query in the provider repository.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Great-circle distance between two points, in miles.
pub fn haversine_miles(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * a.sqrt().min(1.0).asin()
}

/// Published providers near a point, nearest first.
pub async fn recommend_nearby(
    providers: &dyn ProviderStore,
    params: RecommendationParams,
) -> DomainResult<Vec<ProviderSummary>> {
    let query = NearbyQuery::try_from(params)?;
    let results = providers.find_nearby(&query).await?;

    tracing::debug!(
        lat = query.latitude,
        lng = query.longitude,
        radius = query.radius_miles,
        results = results.len(),
        "Nearby providers resolved"
    );
    Ok(results)
}

/// Whether a provider slug is still free.
pub async fn slug_available(
    providers: &dyn ProviderStore,
    slug: &str,
) -> DomainResult<SlugAvailability> {
    let slug = slug.trim().to_lowercase();
    shared::validation::validate_slug(&slug).map_err(|e| {
        DomainError::invalid_field(
            "slug",
            e.message
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Invalid slug".to_string()),
        )
    })?;

    let available = !providers.slug_exists(&slug).await?;
    Ok(SlugAvailability { slug, available })
}
