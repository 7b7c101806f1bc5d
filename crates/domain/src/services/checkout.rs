//! Checkout initiation and the metadata carried through the payment processor.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;
use validator::Validate;

use super::lifecycle::LifecycleEngine;
use super::payment::{CheckoutSessionRequest, LineItem};
use super::policy;
use crate::error::{DomainError, DomainResult, FieldError};
use crate::models::checkout::{CheckoutResponse, InitiateCheckoutRequest};
use crate::models::{AuthContext, UserRole};

/// Currencies whose smallest unit is the major unit.
pub const ZERO_DECIMAL_CURRENCIES: [&str; 16] = [
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

pub fn is_zero_decimal(currency: &str) -> bool {
    ZERO_DECIMAL_CURRENCIES.contains(&currency.to_lowercase().as_str())
}

/// Converts an amount to the currency's minor units, rounding half away
/// from zero.
pub fn to_minor_units(amount: Decimal, currency: &str) -> DomainResult<i64> {
    let scaled = if is_zero_decimal(currency) {
        amount
    } else {
        amount * Decimal::ONE_HUNDRED
    };
    scaled
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| DomainError::invalid_field("price", "Amount is out of range"))
}

/// Contact details copied into the session metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSnapshot {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// What a checkout session pays for. Serialized into the session metadata
/// and read back from the completion event.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutMetadata {
    /// Listings paid for directly; the booking is created on payment.
    Listings {
        provider_id: Uuid,
        client_user_id: Option<Uuid>,
        event_date: NaiveDate,
        contact: ContactSnapshot,
        listing_ids: Vec<Uuid>,
        total: Decimal,
        currency: String,
    },
    /// An accepted quote; the booking already exists.
    Quote {
        booking_id: Uuid,
        quote_id: Option<Uuid>,
        provider_id: Uuid,
    },
}

impl CheckoutMetadata {
    pub fn kind(&self) -> &'static str {
        match self {
            CheckoutMetadata::Listings { .. } => "listings",
            CheckoutMetadata::Quote { .. } => "quote",
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("kind".to_string(), self.kind().to_string());
        match self {
            CheckoutMetadata::Listings {
                provider_id,
                client_user_id,
                event_date,
                contact,
                listing_ids,
                total,
                currency,
            } => {
                map.insert("provider_id".into(), provider_id.to_string());
                if let Some(client) = client_user_id {
                    map.insert("client_user_id".into(), client.to_string());
                }
                map.insert("event_date".into(), event_date.to_string());
                map.insert("contact_name".into(), contact.name.clone());
                map.insert("contact_email".into(), contact.email.clone());
                map.insert(
                    "contact_phone".into(),
                    contact.phone.clone().unwrap_or_default(),
                );
                map.insert(
                    "listing_ids".into(),
                    listing_ids
                        .iter()
                        .map(Uuid::to_string)
                        .collect::<Vec<_>>()
                        .join(","),
                );
                map.insert("total".into(), total.to_string());
                map.insert("currency".into(), currency.clone());
            }
            CheckoutMetadata::Quote {
                booking_id,
                quote_id,
                provider_id,
            } => {
                map.insert("booking_id".into(), booking_id.to_string());
                if let Some(quote) = quote_id {
                    map.insert("quote_id".into(), quote.to_string());
                }
                map.insert("provider_id".into(), provider_id.to_string());
            }
        }
        map
    }

    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, String> {
        let get = |key: &str| {
            map.get(key)
                .map(String::as_str)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| format!("missing metadata field '{}'", key))
        };
        let uuid = |key: &str| {
            get(key).and_then(|v| {
                Uuid::parse_str(v).map_err(|_| format!("invalid metadata field '{}'", key))
            })
        };
        let optional_uuid = |key: &str| match map.get(key).filter(|v| !v.is_empty()) {
            Some(v) => Uuid::parse_str(v)
                .map(Some)
                .map_err(|_| format!("invalid metadata field '{}'", key)),
            None => Ok(None),
        };

        match get("kind")? {
            "quote" => Ok(CheckoutMetadata::Quote {
                booking_id: uuid("booking_id")?,
                quote_id: optional_uuid("quote_id")?,
                provider_id: uuid("provider_id")?,
            }),
            "listings" => {
                let listing_ids = get("listing_ids")?
                    .split(',')
                    .map(|s| Uuid::parse_str(s.trim()))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| "invalid metadata field 'listing_ids'".to_string())?;
                Ok(CheckoutMetadata::Listings {
                    provider_id: uuid("provider_id")?,
                    client_user_id: optional_uuid("client_user_id")?,
                    event_date: get("event_date")?
                        .parse()
                        .map_err(|_| "invalid metadata field 'event_date'".to_string())?,
                    contact: ContactSnapshot {
                        name: get("contact_name")?.to_string(),
                        email: get("contact_email")?.to_string(),
                        phone: map
                            .get("contact_phone")
                            .filter(|v| !v.is_empty())
                            .cloned(),
                    },
                    listing_ids,
                    total: get("total")?
                        .parse()
                        .map_err(|_| "invalid metadata field 'total'".to_string())?,
                    currency: get("currency")?.to_string(),
                })
            }
            other => Err(format!("unknown checkout kind '{}'", other)),
        }
    }
}

impl LifecycleEngine {
    /// Starts a hosted checkout for listings paid directly by a client.
    pub async fn initiate_checkout(
        &self,
        caller: &AuthContext,
        request: InitiateCheckoutRequest,
    ) -> DomainResult<CheckoutResponse> {
        policy::require_role(caller, UserRole::Client)?;
        request.validate()?;

        let provider = self
            .stores
            .providers
            .find_provider(request.provider_id)
            .await?
            .filter(|p| p.is_published)
            .ok_or(DomainError::NotFound("Provider"))?;

        let ids: Vec<Uuid> = request.listings.iter().map(|l| l.id).collect();
        let stored = self
            .stores
            .providers
            .find_listings(provider.id, &ids)
            .await?;

        let mut errors = Vec::new();
        let mut line_items = Vec::with_capacity(request.listings.len());
        let mut total = Decimal::ZERO;

        // Stored prices are charged; a stale client price is a field error
        for (index, item) in request.listings.iter().enumerate() {
            let Some(listing) = stored.iter().find(|l| l.id == item.id && l.is_active) else {
                errors.push(FieldError::new(
                    format!("listings[{}].id", index),
                    "Listing does not belong to this provider",
                ));
                continue;
            };
            if listing.price != item.price {
                errors.push(FieldError::new(
                    format!("listings[{}].price", index),
                    format!("Price does not match the current price of {}", listing.price),
                ));
                continue;
            }
            total += listing.price;
            line_items.push(LineItem {
                name: listing.headline.clone(),
                unit_amount: to_minor_units(listing.price, &provider.currency)?,
                quantity: 1,
            });
        }

        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        // Everything needed to create the booking once payment lands
        let metadata = CheckoutMetadata::Listings {
            provider_id: provider.id,
            client_user_id: Some(caller.user_id),
            event_date: request.event_date,
            contact: ContactSnapshot {
                name: request.contact.name.trim().to_string(),
                email: request.contact.email.trim().to_string(),
                phone: request
                    .contact
                    .phone
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string),
            },
            listing_ids: ids,
            total,
            currency: provider.currency.clone(),
        };

        let session = self
            .create_session(CheckoutSessionRequest {
                currency: provider.currency.clone(),
                line_items,
                success_url: self.urls.success_url.clone(),
                cancel_url: self.urls.cancel_url.clone(),
                customer_email: Some(request.contact.email.trim().to_string()),
                metadata: metadata.to_map(),
            })
            .await?;

        tracing::info!(
            provider_id = %provider.id,
            session_id = %session.id,
            total = %total,
            "Checkout session created for listings"
        );

        Ok(CheckoutResponse {
            url: session.url,
            session_id: session.id,
        })
    }
}
