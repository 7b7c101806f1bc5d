//! Payment processor webhook.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use domain::services::PaymentOutcome;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics;
use crate::services::stripe::{self, WebhookEvent, SIGNATURE_HEADER};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

fn ack() -> Json<WebhookAck> {
    Json(WebhookAck { received: true })
}

/// Receives checkout events. Anything that passes signature checks is
/// acknowledged with 200, including events that change nothing.
///
/// POST /api/v1/payments/webhook
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let payments = &state.config.payments;

    if payments.webhook_secret.is_empty() && payments.provider == "mock" {
        warn!("Webhook secret not configured, accepting unsigned event from mock provider");
    } else {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        stripe::verify_signature(
            signature,
            &body,
            &payments.webhook_secret,
            payments.webhook_tolerance_secs,
            chrono::Utc::now().timestamp(),
        )
        .map_err(|e| {
            warn!(error = %e, "Webhook signature rejected");
            metrics::record_webhook_event("rejected");
            ApiError::BadRequest(e.to_string())
        })?;
    }

    let event = stripe::parse_event(&body).map_err(|e| {
        metrics::record_webhook_event("rejected");
        ApiError::BadRequest(e.to_string())
    })?;

    let completed = match event {
        WebhookEvent::CheckoutCompleted(completed) => completed,
        WebhookEvent::Other(event_type) => {
            debug!(event_type = %event_type, "Ignoring webhook event");
            metrics::record_webhook_event("ignored");
            return Ok(ack());
        }
    };

    let session_id = completed.session_id.clone();
    match state.engine.confirm_checkout(completed).await? {
        PaymentOutcome::Confirmed(_) => {
            metrics::record_webhook_event("confirmed");
            metrics::record_booking_confirmed();
        }
        PaymentOutcome::AlreadyProcessed(booking) => {
            metrics::record_webhook_event("duplicate");
            info!(booking_id = %booking.id, session_id = %session_id, "Duplicate payment event");
        }
        PaymentOutcome::Ignored(reason) => {
            metrics::record_webhook_event("ignored");
            info!(session_id = %session_id, reason = %reason, "Payment event ignored");
        }
    }

    Ok(ack())
}
