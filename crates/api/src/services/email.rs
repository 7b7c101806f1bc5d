//! Email delivery for marketplace notifications.
//!
//! Supports two providers:
//! - `console`: Logs emails (development)
//! - `sendgrid`: Uses the SendGrid v3 API

use async_trait::async_trait;
use domain::services::{Notification, NotificationResult, NotificationSender};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::EmailConfig;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Errors that can occur during email operations.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Email message to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub body_text: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    config: Arc<EmailConfig>,
    client: reqwest::Client,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            config: Arc::new(config),
            client,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send an email message.
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        match self.config.provider.as_str() {
            "console" => {
                self.send_console(&message);
                Ok(())
            }
            "sendgrid" => self.send_sendgrid(&message).await,
            provider => {
                error!(provider = %provider, "Unknown email provider");
                Err(EmailError::NotConfigured)
            }
        }
    }

    /// Renders a notification into a message.
    pub fn render(&self, notification: &Notification) -> EmailMessage {
        let base_url = self.config.base_url.trim_end_matches('/');

        let (to_name, subject, body) = match notification {
            Notification::NewMessage {
                to_name,
                inquiry_id,
                from_name,
                preview,
                ..
            } => (
                to_name,
                format!("New message from {}", from_name),
                format!(
                    "{from} wrote:\n\n{preview}\n\nReply here: {base}/inquiries/{id}",
                    from = from_name,
                    preview = preview,
                    base = base_url,
                    id = inquiry_id
                ),
            ),
            Notification::QuoteSent {
                to_name,
                quote_id,
                business_name,
                total_price,
                ..
            } => (
                to_name,
                format!("{} sent you a quote", business_name),
                format!(
                    "{business} sent you a quote for {total}.\n\nReview it here: {base}/quotes/{id}",
                    business = business_name,
                    total = total_price,
                    base = base_url,
                    id = quote_id
                ),
            ),
            Notification::QuoteDeclined {
                to_name,
                quote_id,
                reason,
                ..
            } => (
                to_name,
                "Your quote was declined".to_string(),
                format!(
                    "Your quote {id} was declined.{reason}",
                    id = quote_id,
                    reason = reason
                        .as_deref()
                        .map(|r| format!("\n\nReason: {}", r))
                        .unwrap_or_default()
                ),
            ),
            Notification::QuoteAccepted {
                to_name,
                quote_id,
                booking_id,
                ..
            } => (
                to_name,
                "Your quote was accepted".to_string(),
                format!(
                    "Your quote {quote} was accepted. Booking {booking} is awaiting payment.\n\n{base}/bookings/{booking}",
                    quote = quote_id,
                    booking = booking_id,
                    base = base_url
                ),
            ),
            Notification::BookingConfirmed {
                to_name,
                booking_id,
                event_date,
                ..
            } => (
                to_name,
                "Booking confirmed".to_string(),
                format!(
                    "Payment received. Your booking for {date} is confirmed.\n\n{base}/bookings/{id}",
                    date = event_date,
                    base = base_url,
                    id = booking_id
                ),
            ),
            Notification::PasswordReset { to_name, token, .. } => (
                to_name,
                "Reset your password".to_string(),
                format!(
                    "We received a request to reset your password. Use the link below within 30 minutes:\n\n{base}/reset-password?token={token}\n\nIf you didn't request this, you can ignore this email.",
                    base = base_url,
                    token = token
                ),
            ),
            Notification::EmailVerification { to_name, token, .. } => (
                to_name,
                "Verify your email address".to_string(),
                format!(
                    "Please verify your email address within 24 hours:\n\n{base}/verify-email?token={token}",
                    base = base_url,
                    token = token
                ),
            ),
        };

        EmailMessage {
            to: notification.recipient().to_string(),
            to_name: Some(to_name.clone()),
            subject,
            body_text: format!("Hi {},\n\n{}\n\nThe Event Marketplace Team", to_name, body),
        }
    }

    /// Console provider - logs email instead of sending it.
    fn send_console(&self, message: &EmailMessage) {
        info!(
            to = %message.to,
            to_name = ?message.to_name,
            subject = %message.subject,
            from = %self.config.sender_email,
            "Email (console provider)"
        );
        debug!(body_text = %message.body_text, "Email body");
    }

    /// SendGrid provider - sends via SendGrid API.
    async fn send_sendgrid(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if self.config.sendgrid_api_key.is_empty() {
            return Err(EmailError::NotConfigured);
        }

        let mut recipient = serde_json::json!({ "email": message.to });
        if let Some(name) = &message.to_name {
            recipient["name"] = serde_json::json!(name);
        }

        let body = serde_json::json!({
            "personalizations": [{ "to": [recipient] }],
            "from": {
                "email": self.config.sender_email,
                "name": self.config.sender_name
            },
            "subject": message.subject,
            "content": [{
                "type": "text/plain",
                "value": message.body_text
            }]
        });

        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(&self.config.sendgrid_api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::SendFailed(format!("SendGrid request failed: {}", e)))?;

        if response.status().is_success() {
            info!(to = %message.to, subject = %message.subject, "Email sent via SendGrid");
            Ok(())
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, error = %error_body, "SendGrid API error");
            Err(EmailError::ProviderError(format!(
                "SendGrid returned {}: {}",
                status, error_body
            )))
        }
    }
}

#[async_trait]
impl NotificationSender for EmailService {
    async fn send(&self, notification: &Notification) -> NotificationResult {
        if !self.is_enabled() {
            debug!(kind = notification.kind(), "Email service disabled, skipping send");
            return NotificationResult::Skipped;
        }

        match EmailService::send(self, self.render(notification)).await {
            Ok(()) => NotificationResult::Sent,
            Err(e) => NotificationResult::Failed(e.to_string()),
        }
    }
}
