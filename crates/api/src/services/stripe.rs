//! Stripe hosted checkout client and webhook verification.

use async_trait::async_trait;
use domain::services::payment::{
    CheckoutCompleted, CheckoutSession, CheckoutSessionRequest, PaymentError, PaymentGateway,
};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PaymentsConfig;

/// Event type carrying a finished checkout.
pub const CHECKOUT_COMPLETED_EVENT: &str = "checkout.session.completed";

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Stripe API client for creating checkout sessions.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: String,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(config: &PaymentsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

/// Flattens a session request into Stripe's bracketed form encoding.
fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    if let Some(email) = &request.customer_email {
        form.push(("customer_email".to_string(), email.clone()));
    }

    for (i, item) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{}]", i);
        form.push((
            format!("{}[price_data][currency]", prefix),
            request.currency.to_lowercase(),
        ));
        form.push((
            format!("{}[price_data][product_data][name]", prefix),
            item.name.clone(),
        ));
        form.push((
            format!("{}[price_data][unit_amount]", prefix),
            item.unit_amount.to_string(),
        ));
        form.push((format!("{}[quantity]", prefix), item.quantity.to_string()));
    }

    for (key, value) in &request.metadata {
        form.push((format!("metadata[{}]", key), value.clone()));
    }

    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base);
        debug!(line_items = request.line_items.len(), "Creating Stripe checkout session");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&session_form(&request))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentError::Unavailable(format!(
                        "Request timeout after {}s",
                        self.timeout_secs
                    ))
                } else {
                    PaymentError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| format!("HTTP {}", status));
            warn!(status = %status, error = %message, "Stripe rejected checkout session");
            return Err(if status.is_server_error() {
                PaymentError::Unavailable(message)
            } else {
                PaymentError::Rejected(message)
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Unavailable(format!("Invalid response: {}", e)))?;
        let url = session
            .url
            .ok_or_else(|| PaymentError::Unavailable("Session has no checkout URL".into()))?;

        info!(session_id = %session.id, "Stripe checkout session created");
        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }
}

/// Webhook verification and parsing failures. All map to HTTP 400.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Missing signature header")]
    MissingSignature,

    #[error("Malformed signature header")]
    MalformedSignature,

    #[error("Signature timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("Signature mismatch")]
    SignatureMismatch,

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

/// Verifies a `t=<ts>,v1=<hex>[,v1=<hex>...]` signature header against the
/// raw body. Any matching `v1` entry is accepted.
pub fn verify_signature(
    header: Option<&str>,
    payload: &[u8],
    secret: &str,
    tolerance_secs: i64,
    now_unix: i64,
) -> Result<(), WebhookError> {
    let header = header.ok_or(WebhookError::MissingSignature)?;

    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }
    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(WebhookError::TimestampOutOfTolerance);
    }

    let mut signed = format!("{}.", timestamp).into_bytes();
    signed.extend_from_slice(payload);

    if signatures
        .iter()
        .any(|sig| shared::crypto::verify_hmac_sha256(secret, &signed, sig))
    {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Deserialize)]
struct WebhookObject {
    id: Option<String>,
    payment_status: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

/// A verified webhook event.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    CheckoutCompleted(CheckoutCompleted),
    /// Any other event type; acknowledged and ignored.
    Other(String),
}

/// Parses a verified webhook body.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, WebhookError> {
    let envelope: WebhookEnvelope = serde_json::from_slice(payload)
        .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    if envelope.event_type != CHECKOUT_COMPLETED_EVENT {
        return Ok(WebhookEvent::Other(envelope.event_type));
    }

    let object = envelope.data.object;
    let session_id = object
        .id
        .ok_or_else(|| WebhookError::InvalidPayload("missing session id".into()))?;

    Ok(WebhookEvent::CheckoutCompleted(CheckoutCompleted {
        session_id,
        payment_status: object.payment_status.unwrap_or_default(),
        metadata: object.metadata,
    }))
}
