//! Booking routes.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::checkout::CheckoutResponse;
use domain::models::Booking;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics;

/// GET /api/v1/bookings/:booking_id
pub async fn get_booking(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, ApiError> {
    Ok(Json(state.engine.get_booking(&caller, booking_id).await?))
}

/// New checkout session for a booking still awaiting payment.
///
/// POST /api/v1/bookings/:booking_id/checkout
pub async fn resume_checkout(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let checkout = state.engine.resume_checkout(&caller, booking_id).await?;
    metrics::record_checkout_session_created("quote");
    Ok(Json(checkout))
}
