//! Persistence ports.
//!
//! Each trait is implemented by the PostgreSQL repositories in the
//! `persistence` crate and by [`crate::memory::InMemoryStore`]. Methods
//! documented as conditional must apply their change only when the stated
//! precondition still holds at write time, and report `None` otherwise.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::culture_tag::{CreateCultureTagRequest, UpdateCultureTagRequest};
use crate::models::{
    Booking, BookingFilter, BookingStatus, CascadeReport, CultureTraditionTag, Inquiry, Listing,
    NearbyQuery, NewBooking, NewInquiry, NewMessage, NewQuote, NewUser, Provider, ProviderSummary,
    Quote, QuoteAcceptance, QuoteDecline, SingleUseToken, TokenPurpose, User,
};

/// Errors raised by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; `Conflict` when the email is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Looks up by normalized (lower-case) email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
}

#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn find_provider(&self, id: Uuid) -> StoreResult<Option<Provider>>;

    async fn find_provider_by_owner(&self, owner_user_id: Uuid) -> StoreResult<Option<Provider>>;

    async fn slug_exists(&self, slug: &str) -> StoreResult<bool>;

    /// Returns the provider's listings among `ids`. Unknown ids and ids of
    /// other providers are left out.
    async fn find_listings(&self, provider_id: Uuid, ids: &[Uuid]) -> StoreResult<Vec<Listing>>;

    /// Published providers with coordinates within the radius, nearest first.
    async fn find_nearby(&self, query: &NearbyQuery) -> StoreResult<Vec<ProviderSummary>>;

    /// Deletes the provider and every dependent row atomically.
    /// `None` when the provider does not exist.
    async fn delete_provider_cascade(&self, id: Uuid) -> StoreResult<Option<CascadeReport>>;
}

#[async_trait]
pub trait InquiryStore: Send + Sync {
    /// Creates an OPEN inquiry holding its first message.
    async fn create_inquiry(&self, inquiry: NewInquiry) -> StoreResult<Inquiry>;

    /// Loads an inquiry with its messages in sequence order.
    async fn find_inquiry(&self, id: Uuid) -> StoreResult<Option<Inquiry>>;

    /// Appends a message with the next sequence number. Concurrent appends
    /// are serialized; `None` when the inquiry does not exist.
    async fn append_message(
        &self,
        inquiry_id: Uuid,
        message: NewMessage,
    ) -> StoreResult<Option<Inquiry>>;

    async fn delete_inquiry(&self, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    async fn create_quote(&self, quote: NewQuote) -> StoreResult<Quote>;

    async fn find_quote(&self, id: Uuid) -> StoreResult<Option<Quote>>;

    /// Conditional DRAFT -> SENT.
    async fn mark_quote_sent(&self, id: Uuid) -> StoreResult<Option<Quote>>;

    /// Conditional SENT -> DECLINED; the linked inquiry becomes DECLINED in
    /// the same transaction.
    async fn decline_quote(&self, decline: QuoteDecline) -> StoreResult<Option<Quote>>;

    /// Conditional SENT -> ACCEPTED; the linked inquiry becomes CONVERTED and
    /// the booking is inserted in the same transaction.
    async fn accept_quote(&self, acceptance: QuoteAcceptance)
        -> StoreResult<Option<(Quote, Booking)>>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking>;

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Conditional on PENDING_PAYMENT: records the latest checkout session.
    async fn attach_payment_session(
        &self,
        booking_id: Uuid,
        session_id: &str,
    ) -> StoreResult<Option<Booking>>;

    /// Conditional PENDING_PAYMENT -> CONFIRMED.
    async fn confirm_booking_payment(
        &self,
        booking_id: Uuid,
        session_id: &str,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>>;

    /// Inserts unless a booking already carries the same payment session id.
    /// Returns the stored booking and whether it was created now.
    async fn materialize_paid_booking(&self, booking: NewBooking) -> StoreResult<(Booking, bool)>;

    /// One page of bookings matching the filter, newest event first, plus
    /// the total match count.
    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<(Vec<Booking>, i64)>;

    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> StoreResult<Option<Booking>>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_token(
        &self,
        purpose: TokenPurpose,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<SingleUseToken>;

    async fn find_token(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
    ) -> StoreResult<Option<SingleUseToken>>;

    /// Marks an unused reset token used and stores the new password hash,
    /// both or neither. `false` when the token was already used.
    async fn consume_password_reset(
        &self,
        token: &SingleUseToken,
        new_password_hash: &str,
        used_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Marks an unused verification token used and flags the email verified,
    /// both or neither. `false` when the token was already used.
    async fn consume_email_verification(
        &self,
        token: &SingleUseToken,
        used_at: DateTime<Utc>,
    ) -> StoreResult<bool>;
}

#[async_trait]
pub trait CultureTagStore: Send + Sync {
    /// Tags ordered by display order, then name.
    async fn list_tags(&self, active_only: bool) -> StoreResult<Vec<CultureTraditionTag>>;

    async fn create_tag(&self, tag: &CreateCultureTagRequest) -> StoreResult<CultureTraditionTag>;

    async fn update_tag(
        &self,
        id: Uuid,
        update: &UpdateCultureTagRequest,
    ) -> StoreResult<Option<CultureTraditionTag>>;
}

/// The full set of stores a service needs.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub providers: Arc<dyn ProviderStore>,
    pub inquiries: Arc<dyn InquiryStore>,
    pub quotes: Arc<dyn QuoteStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub culture_tags: Arc<dyn CultureTagStore>,
}

impl Stores {
    /// Uses a single object for every store.
    pub fn from_single<S>(store: Arc<S>) -> Self
    where
        S: UserStore
            + ProviderStore
            + InquiryStore
            + QuoteStore
            + BookingStore
            + TokenStore
            + CultureTagStore
            + 'static,
    {
        Self {
            users: store.clone(),
            providers: store.clone(),
            inquiries: store.clone(),
            quotes: store.clone(),
            bookings: store.clone(),
            tokens: store.clone(),
            culture_tags: store,
        }
    }
}
