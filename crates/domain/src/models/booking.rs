//! Booking domain models and the admin booking filter.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Booking status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::PendingPayment => write!(f, "PENDING_PAYMENT"),
            BookingStatus::Confirmed => write!(f, "CONFIRMED"),
            BookingStatus::Completed => write!(f, "COMPLETED"),
            BookingStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A confirmed or pending engagement between a client and a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub client_user_id: Option<Uuid>,
    pub quote_id: Option<Uuid>,
    pub event_date: NaiveDate,
    pub status: BookingStatus,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_session_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub listing_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to insert a booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub provider_id: Uuid,
    pub client_user_id: Option<Uuid>,
    pub quote_id: Option<Uuid>,
    pub event_date: NaiveDate,
    pub status: BookingStatus,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_session_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub listing_ids: Vec<Uuid>,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

fn validate_date_range(filter: &BookingFilter) -> Result<(), ValidationError> {
    match (filter.from, filter.to) {
        (Some(from), Some(to)) if from > to => {
            let mut err = ValidationError::new("date_range");
            err.message = Some("'from' must not be after 'to'".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Typed filter for the admin booking listing.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_date_range"))]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub provider_id: Option<Uuid>,
    /// Inclusive lower bound on the event date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the event date.
    pub to: Option<NaiveDate>,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: u32,
    #[serde(default = "default_per_page")]
    #[validate(range(min = 1, max = 100, message = "perPage must be between 1 and 100"))]
    pub per_page: u32,
}

impl Default for BookingFilter {
    fn default() -> Self {
        Self {
            status: None,
            provider_id: None,
            from: None,
            to: None,
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl BookingFilter {
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    /// Whether a booking passes the status/provider/date predicates.
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map_or(true, |s| booking.status == s)
            && self.provider_id.map_or(true, |p| booking.provider_id == p)
            && self.from.map_or(true, |d| booking.event_date >= d)
            && self.to.map_or(true, |d| booking.event_date <= d)
    }
}

/// One page of bookings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPage {
    pub bookings: Vec<Booking>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

/// Request payload for the admin direct booking creation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdminCreateBookingRequest {
    pub provider_id: Uuid,
    pub client_user_id: Option<Uuid>,
    pub event_date: NaiveDate,
    pub status: Option<BookingStatus>,
    pub total_amount: Decimal,
    #[validate(custom(function = "shared::validation::validate_currency"))]
    pub currency: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Contact name must be 1-200 characters"))]
    pub contact_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub listing_ids: Vec<Uuid>,
}

/// Request payload for an admin status override.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}
