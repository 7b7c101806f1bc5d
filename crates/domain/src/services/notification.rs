//! Notification sender abstraction.
//!
//! Notifications are best effort: callers dispatch them in the background
//! and a failed delivery is logged, never surfaced to the request.

use std::future::Future;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::DomainResult;

/// A message to deliver to one recipient.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    NewMessage {
        to_email: String,
        to_name: String,
        inquiry_id: Uuid,
        from_name: String,
        preview: String,
    },
    QuoteSent {
        to_email: String,
        to_name: String,
        quote_id: Uuid,
        business_name: String,
        total_price: Decimal,
    },
    QuoteDeclined {
        to_email: String,
        to_name: String,
        quote_id: Uuid,
        reason: Option<String>,
    },
    QuoteAccepted {
        to_email: String,
        to_name: String,
        quote_id: Uuid,
        booking_id: Uuid,
    },
    BookingConfirmed {
        to_email: String,
        to_name: String,
        booking_id: Uuid,
        event_date: NaiveDate,
    },
    PasswordReset {
        to_email: String,
        to_name: String,
        token: String,
    },
    EmailVerification {
        to_email: String,
        to_name: String,
        token: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::NewMessage { to_email, .. }
            | Notification::QuoteSent { to_email, .. }
            | Notification::QuoteDeclined { to_email, .. }
            | Notification::QuoteAccepted { to_email, .. }
            | Notification::BookingConfirmed { to_email, .. }
            | Notification::PasswordReset { to_email, .. }
            | Notification::EmailVerification { to_email, .. } => to_email,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::NewMessage { .. } => "new_message",
            Notification::QuoteSent { .. } => "quote_sent",
            Notification::QuoteDeclined { .. } => "quote_declined",
            Notification::QuoteAccepted { .. } => "quote_accepted",
            Notification::BookingConfirmed { .. } => "booking_confirmed",
            Notification::PasswordReset { .. } => "password_reset",
            Notification::EmailVerification { .. } => "email_verification",
        }
    }
}

/// Result of a notification send attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationResult {
    Sent,
    /// Delivery is disabled by configuration.
    Skipped,
    Failed(String),
}

#[async_trait::async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, notification: &Notification) -> NotificationResult;
}

/// Resolves and delivers notifications on a background task.
///
/// `build` typically looks up recipients; errors there are logged the same
/// way delivery failures are.
pub fn dispatch<F>(sender: Arc<dyn NotificationSender>, build: F)
where
    F: Future<Output = DomainResult<Vec<Notification>>> + Send + 'static,
{
    tokio::spawn(async move {
        let notifications = match build.await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to prepare notification");
                return;
            }
        };

        for notification in notifications {
            match sender.send(&notification).await {
                NotificationResult::Sent => {
                    tracing::debug!(kind = notification.kind(), "Notification sent");
                }
                NotificationResult::Skipped => {
                    tracing::debug!(kind = notification.kind(), "Notification skipped");
                }
                NotificationResult::Failed(reason) => {
                    tracing::warn!(
                        kind = notification.kind(),
                        error = %reason,
                        "Notification delivery failed"
                    );
                }
            }
        }
    });
}

/// Mock sender for development and testing.
///
/// Records every notification it is asked to send.
#[derive(Debug, Clone, Default)]
pub struct MockNotificationSender {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Notifications recorded so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send(&self, notification: &Notification) -> NotificationResult {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }

        if self.simulate_failure {
            tracing::warn!(
                kind = notification.kind(),
                to = %notification.recipient(),
                "Mock notification sender simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            kind = notification.kind(),
            to = %notification.recipient(),
            "Mock: Would send notification"
        );
        NotificationResult::Sent
    }
}
