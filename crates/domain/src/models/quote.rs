//! Quote domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::booking::{Booking, NewBooking};

/// Quote status. ACCEPTED and DECLINED are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Declined,
}

impl QuoteStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuoteStatus::Accepted | QuoteStatus::Declined)
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteStatus::Draft => write!(f, "DRAFT"),
            QuoteStatus::Sent => write!(f, "SENT"),
            QuoteStatus::Accepted => write!(f, "ACCEPTED"),
            QuoteStatus::Declined => write!(f, "DECLINED"),
        }
    }
}

/// Actions that move a quote between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteAction {
    Send,
    Accept,
    Decline,
}

impl fmt::Display for QuoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteAction::Send => write!(f, "send"),
            QuoteAction::Accept => write!(f, "accept"),
            QuoteAction::Decline => write!(f, "decline"),
        }
    }
}

/// A vendor's priced offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub inquiry_id: Option<Uuid>,
    pub client_user_id: Option<Uuid>,
    pub total_price: Decimal,
    pub notes: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub status: QuoteStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Data required to insert a quote.
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub provider_id: Uuid,
    pub inquiry_id: Option<Uuid>,
    pub client_user_id: Option<Uuid>,
    pub total_price: Decimal,
    pub notes: Option<String>,
    pub event_date: Option<NaiveDate>,
}

/// Conditional SENT -> DECLINED update.
#[derive(Debug, Clone)]
pub struct QuoteDecline {
    pub quote_id: Uuid,
    pub notes: Option<String>,
    pub responded_at: DateTime<Utc>,
}

/// Conditional SENT -> ACCEPTED update together with the booking it creates.
#[derive(Debug, Clone)]
pub struct QuoteAcceptance {
    pub quote_id: Uuid,
    pub responded_at: DateTime<Utc>,
    pub booking: NewBooking,
}

fn validate_positive_price(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_positive() && !price.is_zero() {
        Ok(())
    } else {
        let mut err = ValidationError::new("price_positive");
        err.message = Some("Total price must be greater than zero".into());
        Err(err)
    }
}

/// Request payload for creating a quote.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    pub provider_id: Uuid,

    pub inquiry_id: Option<Uuid>,

    #[validate(custom(function = "validate_positive_price"))]
    pub total_price: Decimal,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,

    pub event_date: Option<NaiveDate>,
}

/// Request payload for declining a quote.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeclineQuoteRequest {
    #[validate(length(max = 2000, message = "Reason must be at most 2000 characters"))]
    pub reason: Option<String>,
}

/// Request payload for accepting a quote.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptQuoteRequest {
    pub event_date: Option<NaiveDate>,
}

/// Response for an accepted quote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedQuote {
    pub quote: Quote,
    pub booking: Booking,
    pub checkout_url: String,
    pub session_id: String,
}

/// Appends a decline reason to existing notes, one per line.
pub fn append_reason(notes: Option<&str>, reason: Option<&str>) -> Option<String> {
    let reason = reason.map(str::trim).filter(|r| !r.is_empty());
    match (notes, reason) {
        (Some(n), Some(r)) if !n.is_empty() => Some(format!("{}\n{}", n, r)),
        (_, Some(r)) => Some(r.to_string()),
        (n, None) => n.map(str::to_string),
    }
}
