//! Administration routes.
//!
//! Mounted behind `require_user_auth` and `require_admin`; the domain
//! services check the role again.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use domain::models::booking::{
    AdminCreateBookingRequest, BookingFilter, BookingPage, UpdateBookingStatusRequest,
};
use domain::models::culture_tag::{CreateCultureTagRequest, UpdateCultureTagRequest};
use domain::models::{Booking, CascadeReport, CultureTraditionTag};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// Delete a provider and everything that depends on it.
///
/// DELETE /api/v1/admin/providers/:provider_id
pub async fn delete_provider(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<CascadeReport>, ApiError> {
    let report = state.admin.delete_provider(&caller, provider_id).await?;
    Ok(Json(report))
}

/// GET /api/v1/admin/bookings?status=&providerId=&from=&to=&page=&perPage=
pub async fn list_bookings(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<BookingPage>, ApiError> {
    Ok(Json(state.admin.list_bookings(&caller, filter).await?))
}

/// POST /api/v1/admin/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<AdminCreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), ApiError> {
    let booking = state.admin.create_booking(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// PATCH /api/v1/admin/bookings/:booking_id/status
pub async fn set_booking_status(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(booking_id): Path<Uuid>,
    Json(request): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Booking>, ApiError> {
    let booking = state
        .admin
        .set_booking_status(&caller, booking_id, request)
        .await?;
    Ok(Json(booking))
}

/// DELETE /api/v1/admin/inquiries/:inquiry_id
pub async fn delete_inquiry(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(inquiry_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.admin.delete_inquiry(&caller, inquiry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/culture-tags
pub async fn list_culture_tags(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
) -> Result<Json<Vec<CultureTraditionTag>>, ApiError> {
    Ok(Json(state.admin.list_culture_tags(&caller).await?))
}

/// POST /api/v1/admin/culture-tags
pub async fn create_culture_tag(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<CreateCultureTagRequest>,
) -> Result<(StatusCode, Json<CultureTraditionTag>), ApiError> {
    let tag = state.admin.create_culture_tag(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// PATCH /api/v1/admin/culture-tags/:tag_id
pub async fn update_culture_tag(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(tag_id): Path<Uuid>,
    Json(request): Json<UpdateCultureTagRequest>,
) -> Result<Json<CultureTraditionTag>, ApiError> {
    Ok(Json(
        state
            .admin
            .update_culture_tag(&caller, tag_id, request)
            .await?,
    ))
}
