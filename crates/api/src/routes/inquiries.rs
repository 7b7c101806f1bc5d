//! Inquiry thread routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::inquiry::{AppendMessageRequest, CreateInquiryRequest};
use domain::models::Inquiry;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;

/// Open an inquiry with a vendor.
///
/// POST /api/v1/inquiries
pub async fn create_inquiry(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<CreateInquiryRequest>,
) -> Result<(StatusCode, Json<Inquiry>), ApiError> {
    let inquiry = state.engine.create_inquiry(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(inquiry)))
}

/// GET /api/v1/inquiries/:inquiry_id
pub async fn get_inquiry(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(inquiry_id): Path<Uuid>,
) -> Result<Json<Inquiry>, ApiError> {
    Ok(Json(state.engine.get_inquiry(&caller, inquiry_id).await?))
}

/// Append a message to the thread.
///
/// POST /api/v1/inquiries/:inquiry_id/messages
pub async fn append_message(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(inquiry_id): Path<Uuid>,
    Json(request): Json<AppendMessageRequest>,
) -> Result<Json<Inquiry>, ApiError> {
    let inquiry = state
        .engine
        .append_message(&caller, inquiry_id, request)
        .await?;
    Ok(Json(inquiry))
}
