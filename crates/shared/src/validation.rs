//! Common validation utilities for `validator` custom rules.

use validator::ValidationError;

lazy_static::lazy_static! {
    static ref SLUG_REGEX: regex::Regex =
        regex::Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
    static ref CURRENCY_REGEX: regex::Regex = regex::Regex::new(r"^[a-z]{3}$").unwrap();
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates that a string is not empty after trimming whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates a URL slug: lower-case alphanumerics separated by single dashes.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.len() <= 80 && SLUG_REGEX.is_match(slug) {
        Ok(())
    } else {
        let mut err = ValidationError::new("slug_format");
        err.message =
            Some("Slug must be lower-case letters, digits and single dashes".into());
        Err(err)
    }
}

/// Validates a lower-case ISO-4217 currency code such as `usd`.
pub fn validate_currency(code: &str) -> Result<(), ValidationError> {
    if CURRENCY_REGEX.is_match(code) {
        Ok(())
    } else {
        let mut err = ValidationError::new("currency_format");
        err.message = Some("Currency must be a three-letter lower-case code".into());
        Err(err)
    }
}
