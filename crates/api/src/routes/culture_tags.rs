//! Public culture and tradition tags.

use axum::{extract::State, Json};
use domain::models::CultureTraditionTag;

use crate::app::AppState;
use crate::error::ApiError;

/// Active tags ordered by display order.
///
/// GET /api/v1/culture-tags
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<Vec<CultureTraditionTag>>, ApiError> {
    Ok(Json(state.admin.active_culture_tags().await?))
}
