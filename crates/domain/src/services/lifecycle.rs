//! Inquiry → quote → booking → payment lifecycle.
//!
//! [`LifecycleEngine`] owns the quote state machine, booking creation on
//! acceptance and payment confirmation. Messaging and checkout initiation
//! are implemented on the same engine in their own modules.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::checkout::{to_minor_units, CheckoutMetadata};
use super::notification::{dispatch, Notification, NotificationSender};
use super::payment::{
    CheckoutCompleted, CheckoutSession, CheckoutSessionRequest, LineItem, PaymentGateway,
};
use super::policy;
use crate::error::{DomainError, DomainResult};
use crate::models::checkout::CheckoutResponse;
use crate::models::quote::{
    append_reason, AcceptQuoteRequest, AcceptedQuote, CreateQuoteRequest, DeclineQuoteRequest,
};
use crate::models::{
    AuthContext, Booking, BookingStatus, InquiryStatus, NewBooking, NewQuote, Provider, Quote,
    QuoteAcceptance, QuoteAction, QuoteDecline, QuoteStatus,
};
use crate::ports::Stores;

/// Redirect targets after the hosted checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

/// Validates a quote state transition.
pub fn quote_transition(current: QuoteStatus, action: QuoteAction) -> DomainResult<QuoteStatus> {
    match (current, action) {
        (QuoteStatus::Draft, QuoteAction::Send) => Ok(QuoteStatus::Sent),
        (QuoteStatus::Sent, QuoteAction::Accept) => Ok(QuoteStatus::Accepted),
        (QuoteStatus::Sent, QuoteAction::Decline) => Ok(QuoteStatus::Declined),
        (QuoteStatus::Draft, _) => Err(DomainError::InvalidState(
            "Quote has not been sent yet".to_string(),
        )),
        (QuoteStatus::Sent, QuoteAction::Send) => Err(DomainError::InvalidState(
            "Quote has already been sent".to_string(),
        )),
        (terminal, _) => Err(DomainError::InvalidState(format!(
            "Quote has already been {}",
            terminal.to_string().to_lowercase()
        ))),
    }
}

/// Result of processing a checkout completion.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    /// A booking was confirmed (or created confirmed) by this event.
    Confirmed(Booking),
    /// The event was seen before; nothing changed.
    AlreadyProcessed(Booking),
    /// The event does not concern a payable booking.
    Ignored(String),
}

pub struct LifecycleEngine {
    pub(crate) stores: Stores,
    pub(crate) payments: Arc<dyn PaymentGateway>,
    pub(crate) notifier: Arc<dyn NotificationSender>,
    pub(crate) urls: CheckoutUrls,
}

impl LifecycleEngine {
    pub fn new(
        stores: Stores,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationSender>,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            stores,
            payments,
            notifier,
            urls,
        }
    }

    pub(crate) async fn load_provider(&self, id: Uuid) -> DomainResult<Provider> {
        self.stores
            .providers
            .find_provider(id)
            .await?
            .ok_or(DomainError::NotFound("Provider"))
    }

    async fn load_quote(&self, id: Uuid) -> DomainResult<Quote> {
        self.stores
            .quotes
            .find_quote(id)
            .await?
            .ok_or(DomainError::NotFound("Quote"))
    }

    pub(crate) async fn create_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> DomainResult<CheckoutSession> {
        self.payments
            .create_checkout_session(request)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Checkout session creation failed");
                DomainError::Upstream(e.to_string())
            })
    }

    /// Creates a DRAFT quote for a provider the caller manages.
    pub async fn create_quote(
        &self,
        caller: &AuthContext,
        request: CreateQuoteRequest,
    ) -> DomainResult<Quote> {
        request.validate()?;

        let provider = self.load_provider(request.provider_id).await?;
        if !policy::can_manage_provider(caller, &provider) {
            return Err(DomainError::Forbidden);
        }

        let client_user_id = match request.inquiry_id {
            Some(inquiry_id) => {
                let inquiry = self
                    .stores
                    .inquiries
                    .find_inquiry(inquiry_id)
                    .await?
                    .ok_or(DomainError::NotFound("Inquiry"))?;
                if inquiry.provider_id != provider.id {
                    return Err(DomainError::invalid_field(
                        "inquiryId",
                        "Inquiry belongs to another provider",
                    ));
                }
                if inquiry.status != InquiryStatus::Open {
                    return Err(DomainError::InvalidState(format!(
                        "Inquiry is {}",
                        inquiry.status.to_string().to_lowercase()
                    )));
                }
                Some(inquiry.from_user_id)
            }
            None => None,
        };

        let quote = self
            .stores
            .quotes
            .create_quote(NewQuote {
                provider_id: provider.id,
                inquiry_id: request.inquiry_id,
                client_user_id,
                total_price: request.total_price,
                notes: request
                    .notes
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
                event_date: request.event_date,
            })
            .await?;

        tracing::info!(
            quote_id = %quote.id,
            provider_id = %provider.id,
            "Quote created"
        );
        Ok(quote)
    }

    /// DRAFT -> SENT.
    pub async fn send_quote(&self, caller: &AuthContext, quote_id: Uuid) -> DomainResult<Quote> {
        let quote = self.load_quote(quote_id).await?;
        let provider = self.load_provider(quote.provider_id).await?;
        if !policy::can_manage_provider(caller, &provider) {
            return Err(DomainError::Forbidden);
        }
        quote_transition(quote.status, QuoteAction::Send)?;

        let sent = self
            .stores
            .quotes
            .mark_quote_sent(quote_id)
            .await?
            .ok_or_else(|| DomainError::InvalidState("Quote is no longer a draft".to_string()))?;

        tracing::info!(quote_id = %sent.id, "Quote sent");

        if let Some(client_id) = sent.client_user_id {
            let stores = self.stores.clone();
            let (quote_id, total_price) = (sent.id, sent.total_price);
            let business_name = provider.business_name.clone();
            dispatch(self.notifier.clone(), async move {
                let client = stores.users.find_user(client_id).await?;
                Ok(client
                    .map(|c| Notification::QuoteSent {
                        to_email: c.email,
                        to_name: c.display_name,
                        quote_id,
                        business_name,
                        total_price,
                    })
                    .into_iter()
                    .collect())
            });
        }

        Ok(sent)
    }

    /// Reads a quote. Drafts are invisible to everyone but the provider side.
    pub async fn get_quote(&self, caller: &AuthContext, quote_id: Uuid) -> DomainResult<Quote> {
        let quote = self.load_quote(quote_id).await?;
        let provider = self.load_provider(quote.provider_id).await?;

        if policy::can_manage_provider(caller, &provider) {
            return Ok(quote);
        }
        if quote.client_user_id == Some(caller.user_id) {
            return match quote.status {
                QuoteStatus::Draft => Err(DomainError::NotFound("Quote")),
                _ => Ok(quote),
            };
        }
        Err(DomainError::Forbidden)
    }

    /// SENT -> DECLINED. The linked inquiry is declined with it.
    pub async fn decline_quote(
        &self,
        caller: &AuthContext,
        quote_id: Uuid,
        request: DeclineQuoteRequest,
    ) -> DomainResult<Quote> {
        request.validate()?;

        let quote = self.load_quote(quote_id).await?;
        if !policy::can_respond_to_quote(caller, &quote) {
            return Err(DomainError::Forbidden);
        }
        quote_transition(quote.status, QuoteAction::Decline)?;

        let declined = self
            .stores
            .quotes
            .decline_quote(QuoteDecline {
                quote_id,
                notes: append_reason(quote.notes.as_deref(), request.reason.as_deref()),
                responded_at: Utc::now(),
            })
            .await?
            .ok_or_else(|| {
                DomainError::InvalidState("Quote is no longer awaiting a response".to_string())
            })?;

        tracing::info!(
            quote_id = %declined.id,
            declined_by = %caller.user_id,
            "Quote declined"
        );

        let stores = self.stores.clone();
        let provider_id = declined.provider_id;
        let reason = request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        dispatch(self.notifier.clone(), async move {
            let Some(provider) = stores.providers.find_provider(provider_id).await? else {
                return Ok(vec![]);
            };
            let owner = stores.users.find_user(provider.owner_user_id).await?;
            Ok(owner
                .map(|o| Notification::QuoteDeclined {
                    to_email: o.email,
                    to_name: provider.business_name,
                    quote_id,
                    reason,
                })
                .into_iter()
                .collect())
        });

        Ok(declined)
    }

    /// SENT -> ACCEPTED, creating a booking awaiting payment and a checkout
    /// session for it.
    ///
    /// The booking survives a gateway failure; the client can retry with
    /// [`LifecycleEngine::resume_checkout`].
    pub async fn accept_quote(
        &self,
        caller: &AuthContext,
        quote_id: Uuid,
        request: AcceptQuoteRequest,
    ) -> DomainResult<AcceptedQuote> {
        let quote = self.load_quote(quote_id).await?;
        if !policy::can_respond_to_quote(caller, &quote) {
            return Err(DomainError::Forbidden);
        }
        quote_transition(quote.status, QuoteAction::Accept)?;

        let provider = self.load_provider(quote.provider_id).await?;

        // Request date first, then the quote's, then the inquiry's
        let inquiry = match quote.inquiry_id {
            Some(id) => self.stores.inquiries.find_inquiry(id).await?,
            None => None,
        };
        let event_date = request
            .event_date
            .or(quote.event_date)
            .or(inquiry.as_ref().and_then(|i| i.event_date))
            .ok_or_else(|| DomainError::invalid_field("eventDate", "Event date is required"))?;

        let client_user_id = quote.client_user_id.unwrap_or(caller.user_id);
        let client = self.stores.users.find_user(client_user_id).await?;

        // Status change and booking insert commit together; a concurrent
        // decline makes this return None
        let (accepted, booking) = self
            .stores
            .quotes
            .accept_quote(QuoteAcceptance {
                quote_id,
                responded_at: Utc::now(),
                booking: NewBooking {
                    provider_id: provider.id,
                    client_user_id: Some(client_user_id),
                    quote_id: Some(quote_id),
                    event_date,
                    status: BookingStatus::PendingPayment,
                    total_amount: quote.total_price,
                    currency: provider.currency.clone(),
                    payment_session_id: None,
                    paid_at: None,
                    contact_name: client.as_ref().map(|c| c.display_name.clone()),
                    contact_email: client.as_ref().map(|c| c.email.clone()),
                    contact_phone: None,
                    listing_ids: vec![],
                },
            })
            .await?
            .ok_or_else(|| {
                DomainError::InvalidState("Quote is no longer awaiting a response".to_string())
            })?;

        tracing::info!(
            quote_id = %accepted.id,
            booking_id = %booking.id,
            "Quote accepted, booking awaiting payment"
        );

        let stores = self.stores.clone();
        let booking_id = booking.id;
        let (owner_id, business_name) = (provider.owner_user_id, provider.business_name.clone());
        dispatch(self.notifier.clone(), async move {
            let owner = stores.users.find_user(owner_id).await?;
            Ok(owner
                .map(|o| Notification::QuoteAccepted {
                    to_email: o.email,
                    to_name: business_name,
                    quote_id,
                    booking_id,
                })
                .into_iter()
                .collect())
        });

        // Gateway errors surface here, after the acceptance is committed
        let (booking, session) = self.open_booking_checkout(&booking, &provider).await?;

        Ok(AcceptedQuote {
            quote: accepted,
            booking,
            checkout_url: session.url,
            session_id: session.id,
        })
    }

    /// Creates a fresh checkout session for a booking still awaiting payment.
    pub async fn resume_checkout(
        &self,
        caller: &AuthContext,
        booking_id: Uuid,
    ) -> DomainResult<CheckoutResponse> {
        let booking = self
            .stores
            .bookings
            .find_booking(booking_id)
            .await?
            .ok_or(DomainError::NotFound("Booking"))?;
        if booking.client_user_id != Some(caller.user_id) {
            return Err(DomainError::Forbidden);
        }
        if booking.status != BookingStatus::PendingPayment {
            return Err(DomainError::InvalidState(
                "Booking is not awaiting payment".to_string(),
            ));
        }

        let provider = self.load_provider(booking.provider_id).await?;
        let (_, session) = self.open_booking_checkout(&booking, &provider).await?;

        Ok(CheckoutResponse {
            url: session.url,
            session_id: session.id,
        })
    }

    async fn open_booking_checkout(
        &self,
        booking: &Booking,
        provider: &Provider,
    ) -> DomainResult<(Booking, CheckoutSession)> {
        let metadata = CheckoutMetadata::Quote {
            booking_id: booking.id,
            quote_id: booking.quote_id,
            provider_id: provider.id,
        };

        let session = self
            .create_session(CheckoutSessionRequest {
                currency: booking.currency.clone(),
                line_items: vec![LineItem {
                    name: format!("{} booking on {}", provider.business_name, booking.event_date),
                    unit_amount: to_minor_units(booking.total_amount, &booking.currency)?,
                    quantity: 1,
                }],
                success_url: self.urls.success_url.clone(),
                cancel_url: self.urls.cancel_url.clone(),
                customer_email: booking.contact_email.clone(),
                metadata: metadata.to_map(),
            })
            .await?;

        let updated = self
            .stores
            .bookings
            .attach_payment_session(booking.id, &session.id)
            .await?
            .ok_or_else(|| {
                DomainError::InvalidState("Booking is not awaiting payment".to_string())
            })?;

        tracing::info!(
            booking_id = %booking.id,
            session_id = %session.id,
            "Checkout session attached to booking"
        );
        Ok((updated, session))
    }

    /// Reads a booking visible to its client and the provider side.
    pub async fn get_booking(&self, caller: &AuthContext, booking_id: Uuid) -> DomainResult<Booking> {
        let booking = self
            .stores
            .bookings
            .find_booking(booking_id)
            .await?
            .ok_or(DomainError::NotFound("Booking"))?;
        let provider = self.load_provider(booking.provider_id).await?;
        if !policy::can_view_booking(caller, &booking, &provider) {
            return Err(DomainError::Forbidden);
        }
        Ok(booking)
    }

    /// Applies a completed checkout. Safe to call repeatedly for the same
    /// session.
    pub async fn confirm_checkout(&self, event: CheckoutCompleted) -> DomainResult<PaymentOutcome> {
        if !event.is_paid() {
            return Ok(PaymentOutcome::Ignored(format!(
                "payment status is {}",
                event.payment_status
            )));
        }

        let metadata = match CheckoutMetadata::from_map(&event.metadata) {
            Ok(m) => m,
            Err(reason) => {
                tracing::warn!(session_id = %event.session_id, %reason, "Unusable checkout metadata");
                return Ok(PaymentOutcome::Ignored(reason));
            }
        };

        let now = Utc::now();
        let outcome = match metadata {
            // The booking exists; only PENDING_PAYMENT rows flip to CONFIRMED
            CheckoutMetadata::Quote { booking_id, .. } => {
                match self
                    .stores
                    .bookings
                    .confirm_booking_payment(booking_id, &event.session_id, now)
                    .await?
                {
                    Some(booking) => PaymentOutcome::Confirmed(booking),
                    None => match self.stores.bookings.find_booking(booking_id).await? {
                        Some(b) if b.status != BookingStatus::PendingPayment => {
                            PaymentOutcome::AlreadyProcessed(b)
                        }
                        Some(_) => PaymentOutcome::Ignored("booking not confirmable".to_string()),
                        None => PaymentOutcome::Ignored("booking no longer exists".to_string()),
                    },
                }
            }
            CheckoutMetadata::Listings {
                provider_id,
                client_user_id,
                event_date,
                contact,
                listing_ids,
                total,
                currency,
            } => {
                // Unique payment_session_id keeps redelivered events to one row
                let (booking, created) = self
                    .stores
                    .bookings
                    .materialize_paid_booking(NewBooking {
                        provider_id,
                        client_user_id,
                        quote_id: None,
                        event_date,
                        status: BookingStatus::Confirmed,
                        total_amount: total,
                        currency,
                        payment_session_id: Some(event.session_id.clone()),
                        paid_at: Some(now),
                        contact_name: Some(contact.name),
                        contact_email: Some(contact.email),
                        contact_phone: contact.phone,
                        listing_ids,
                    })
                    .await?;
                if created {
                    PaymentOutcome::Confirmed(booking)
                } else {
                    PaymentOutcome::AlreadyProcessed(booking)
                }
            }
        };

        // Duplicates and ignored events notify nobody
        if let PaymentOutcome::Confirmed(booking) = &outcome {
            tracing::info!(
                booking_id = %booking.id,
                session_id = %event.session_id,
                "Booking confirmed by payment"
            );
            self.notify_booking_confirmed(booking.clone());
        }

        Ok(outcome)
    }

    fn notify_booking_confirmed(&self, booking: Booking) {
        let stores = self.stores.clone();
        dispatch(self.notifier.clone(), async move {
            let mut out = Vec::new();
            let client_email = match booking.client_user_id {
                Some(id) => stores.users.find_user(id).await?.map(|u| (u.email, u.display_name)),
                None => None,
            };
            if let Some((to_email, to_name)) = client_email.or_else(|| {
                booking
                    .contact_email
                    .clone()
                    .map(|e| (e, booking.contact_name.clone().unwrap_or_default()))
            }) {
                out.push(Notification::BookingConfirmed {
                    to_email,
                    to_name,
                    booking_id: booking.id,
                    event_date: booking.event_date,
                });
            }
            if let Some(provider) = stores.providers.find_provider(booking.provider_id).await? {
                if let Some(owner) = stores.users.find_user(provider.owner_user_id).await? {
                    out.push(Notification::BookingConfirmed {
                        to_email: owner.email,
                        to_name: provider.business_name,
                        booking_id: booking.id,
                        event_date: booking.event_date,
                    });
                }
            }
            Ok(out)
        });
    }
}
