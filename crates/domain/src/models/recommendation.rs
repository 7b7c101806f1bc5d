//! Recommendation query parameters.

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{DomainError, FieldError};

/// Default search radius in miles.
pub const DEFAULT_RADIUS_MILES: f64 = 25.0;
/// Default number of results.
pub const DEFAULT_LIMIT: i64 = 4;
/// Upper bound on the number of results.
pub const MAX_LIMIT: i64 = 50;

/// Raw query string parameters, parsed leniently so bad input yields
/// field errors instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationParams {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius: Option<String>,
    pub exclude_id: Option<String>,
    pub limit: Option<String>,
}

/// A validated nearby-provider query.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_miles: f64,
    pub exclude_provider_id: Option<Uuid>,
    pub limit: i64,
}

impl NearbyQuery {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_miles: DEFAULT_RADIUS_MILES,
            exclude_provider_id: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn parse_number(
    field: &str,
    raw: Option<&str>,
    range: std::ops::RangeInclusive<f64>,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        errors.push(FieldError::new(field, "Required"));
        return None;
    };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && range.contains(&v) => Some(v),
        Ok(_) => {
            errors.push(FieldError::new(
                field,
                format!("Must be between {} and {}", range.start(), range.end()),
            ));
            None
        }
        Err(_) => {
            errors.push(FieldError::new(field, "Must be a number"));
            None
        }
    }
}

impl TryFrom<RecommendationParams> for NearbyQuery {
    type Error = DomainError;

    fn try_from(params: RecommendationParams) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();

        let latitude = parse_number("lat", params.lat.as_deref(), -90.0..=90.0, &mut errors);
        let longitude = parse_number("lng", params.lng.as_deref(), -180.0..=180.0, &mut errors);

        let radius_miles = match params.radius.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_RADIUS_MILES,
            Some(raw) => match raw.parse::<f64>() {
                Ok(r) if r.is_finite() && r > 0.0 => r,
                _ => {
                    errors.push(FieldError::new("radius", "Must be a number greater than 0"));
                    DEFAULT_RADIUS_MILES
                }
            },
        };

        let exclude_provider_id = match params.exclude_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.push(FieldError::new("excludeId", "Must be a UUID"));
                    None
                }
            },
        };

        let limit = match params.limit.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_LIMIT,
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) => n.clamp(1, MAX_LIMIT),
                Err(_) => {
                    errors.push(FieldError::new("limit", "Must be an integer"));
                    DEFAULT_LIMIT
                }
            },
        };

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) if errors.is_empty() => Ok(NearbyQuery {
                latitude,
                longitude,
                radius_miles,
                exclude_provider_id,
                limit,
            }),
            _ => Err(DomainError::Validation(errors)),
        }
    }
}
