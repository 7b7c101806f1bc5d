//! Direct listing checkout.

use axum::{extract::State, Json};
use domain::models::checkout::CheckoutResponse;
use domain::models::InitiateCheckoutRequest;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics;

/// Start a hosted checkout for one or more listings.
///
/// POST /api/v1/checkout/initiate
pub async fn initiate_checkout(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<InitiateCheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let checkout = state.engine.initiate_checkout(&caller, request).await?;
    metrics::record_checkout_session_created("listings");
    Ok(Json(checkout))
}
