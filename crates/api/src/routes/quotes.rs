//! Quote routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::quote::{
    AcceptQuoteRequest, AcceptedQuote, CreateQuoteRequest, DeclineQuoteRequest,
};
use domain::models::Quote;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics;

/// Draft a quote for one of the caller's providers.
///
/// POST /api/v1/quotes
pub async fn create_quote(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Json(request): Json<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<Quote>), ApiError> {
    let quote = state.engine.create_quote(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(quote)))
}

/// GET /api/v1/quotes/:quote_id
pub async fn get_quote(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(quote_id): Path<Uuid>,
) -> Result<Json<Quote>, ApiError> {
    Ok(Json(state.engine.get_quote(&caller, quote_id).await?))
}

/// POST /api/v1/quotes/:quote_id/send
pub async fn send_quote(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(quote_id): Path<Uuid>,
) -> Result<Json<Quote>, ApiError> {
    Ok(Json(state.engine.send_quote(&caller, quote_id).await?))
}

/// Decline a sent quote. The body is optional.
///
/// POST /api/v1/quotes/:quote_id/decline
pub async fn decline_quote(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(quote_id): Path<Uuid>,
    request: Option<Json<DeclineQuoteRequest>>,
) -> Result<Json<Quote>, ApiError> {
    let request = request
        .map(|Json(r)| r)
        .unwrap_or(DeclineQuoteRequest { reason: None });

    let quote = state
        .engine
        .decline_quote(&caller, quote_id, request)
        .await?;
    metrics::record_quote_declined();
    Ok(Json(quote))
}

/// Accept a sent quote, creating a booking and a checkout session.
///
/// POST /api/v1/quotes/:quote_id/accept
pub async fn accept_quote(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
    Path(quote_id): Path<Uuid>,
    request: Option<Json<AcceptQuoteRequest>>,
) -> Result<Json<AcceptedQuote>, ApiError> {
    let request = request
        .map(|Json(r)| r)
        .unwrap_or(AcceptQuoteRequest { event_date: None });

    let accepted = state
        .engine
        .accept_quote(&caller, quote_id, request)
        .await?;
    metrics::record_quote_accepted();
    metrics::record_checkout_session_created("quote");
    Ok(Json(accepted))
}
