//! Public provider discovery routes.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::provider::SlugAvailability;
use domain::models::recommendation::RecommendationParams;
use domain::models::ProviderSummary;
use domain::services::recommendation;
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;

/// Published providers near a point, nearest first.
///
/// GET /api/v1/providers/recommendations?lat=&lng=&radius=&excludeId=&limit=
pub async fn recommendations(
    State(state): State<AppState>,
    Query(params): Query<RecommendationParams>,
) -> Result<Json<Vec<ProviderSummary>>, ApiError> {
    let providers =
        recommendation::recommend_nearby(state.stores.providers.as_ref(), params).await?;
    Ok(Json(providers))
}

#[derive(Debug, Deserialize)]
pub struct SlugQuery {
    #[serde(default)]
    pub slug: String,
}

/// GET /api/v1/providers/slug-available?slug=
pub async fn slug_available(
    State(state): State<AppState>,
    Query(query): Query<SlugQuery>,
) -> Result<Json<SlugAvailability>, ApiError> {
    let availability =
        recommendation::slug_available(state.stores.providers.as_ref(), &query.slug).await?;
    Ok(Json(availability))
}
