//! Checkout request and response models.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_non_negative(price: &Decimal) -> Result<(), ValidationError> {
    if price.is_sign_negative() && !price.is_zero() {
        let mut err = ValidationError::new("price_non_negative");
        err.message = Some("Price must not be negative".into());
        Err(err)
    } else {
        Ok(())
    }
}

fn validate_not_past(date: &NaiveDate) -> Result<(), ValidationError> {
    if *date < Utc::now().date_naive() {
        let mut err = ValidationError::new("date_in_past");
        err.message = Some("Event date must not be in the past".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Most listings one checkout may carry. Their ids travel comma-joined in a
/// single payment metadata value, which is capped at 500 characters.
pub const MAX_CHECKOUT_LISTINGS: usize = 13;

/// A listing the client wants to pay for.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutListingItem {
    pub id: Uuid,

    #[validate(
        length(min = 1, max = 200, message = "Headline must be 1-200 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub headline: String,

    #[validate(custom(function = "validate_non_negative"))]
    pub price: Decimal,
}

/// Contact details for the event.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[validate(
        length(min = 1, max = 200, message = "Name must be 1-200 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(max = 40, message = "Phone must be at most 40 characters"))]
    pub phone: Option<String>,
}

/// Request payload for paying for listings directly.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCheckoutRequest {
    pub provider_id: Uuid,

    #[validate(
        length(min = 1, max = 13, message = "Between 1 and 13 listings are required"),
        nested
    )]
    pub listings: Vec<CheckoutListingItem>,

    #[validate(custom(function = "validate_not_past"))]
    pub event_date: NaiveDate,

    #[validate(nested)]
    pub contact: ContactInfo,
}

/// Redirect target for a created checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}
