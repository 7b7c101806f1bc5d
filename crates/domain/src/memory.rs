//! In-memory implementation of every persistence port.
//!
//! Used by unit tests, router tests and local runs without PostgreSQL. All
//! state sits behind one `RwLock`, so each port method is atomic the same
//! way a single database transaction is.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::culture_tag::{CreateCultureTagRequest, UpdateCultureTagRequest};
use crate::models::{
    Booking, BookingFilter, BookingStatus, CascadeReport, CultureTraditionTag, Inquiry,
    InquiryStatus, Listing, Message, NearbyQuery, NewBooking, NewInquiry, NewMessage, NewQuote,
    NewUser, Provider, ProviderDependent, ProviderSummary, Quote, QuoteAcceptance, QuoteDecline,
    QuoteStatus, SingleUseToken, TokenPurpose, User,
};
use crate::ports::{
    BookingStore, CultureTagStore, InquiryStore, ProviderStore, QuoteStore, StoreError,
    StoreResult, TokenStore, UserStore,
};
use crate::services::recommendation::haversine_miles;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    providers: HashMap<Uuid, Provider>,
    listings: HashMap<Uuid, Listing>,
    inquiries: HashMap<Uuid, Inquiry>,
    quotes: HashMap<Uuid, Quote>,
    bookings: HashMap<Uuid, Booking>,
    tokens: HashMap<Uuid, (TokenPurpose, SingleUseToken)>,
    tags: HashMap<Uuid, CultureTraditionTag>,
    /// Provider-owned rows this service never reads (reviews, payouts...).
    dependents: Vec<(ProviderDependent, Uuid)>,
}

impl MemoryState {
    fn delete_dependents(&mut self, kind: ProviderDependent, provider_id: Uuid) -> u64 {
        fn retain_count<T>(map: &mut HashMap<Uuid, T>, keep: impl Fn(&T) -> bool) -> u64 {
            let before = map.len();
            map.retain(|_, v| keep(v));
            (before - map.len()) as u64
        }

        let before = self.dependents.len();
        self.dependents
            .retain(|(k, p)| !(*k == kind && *p == provider_id));
        let generic = (before - self.dependents.len()) as u64;

        generic
            + match kind {
                ProviderDependent::Bookings => {
                    retain_count(&mut self.bookings, |b| b.provider_id != provider_id)
                }
                ProviderDependent::Quotes => {
                    retain_count(&mut self.quotes, |q| q.provider_id != provider_id)
                }
                ProviderDependent::Inquiries => {
                    retain_count(&mut self.inquiries, |i| i.provider_id != provider_id)
                }
                ProviderDependent::Listings => {
                    retain_count(&mut self.listings, |l| l.provider_id != provider_id)
                }
                _ => 0,
            }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
    cascade_failure: Mutex<Option<ProviderDependent>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    pub async fn insert_provider(&self, provider: Provider) {
        self.state.write().await.providers.insert(provider.id, provider);
    }

    pub async fn insert_listing(&self, listing: Listing) {
        self.state.write().await.listings.insert(listing.id, listing);
    }

    /// Adds an opaque provider-owned row, e.g. a review or a payout.
    pub async fn insert_dependent(&self, kind: ProviderDependent, provider_id: Uuid) {
        self.state
            .write()
            .await
            .dependents
            .push((kind, provider_id));
    }

    /// Number of rows of any kind still referencing the provider.
    pub async fn rows_for_provider(&self, provider_id: Uuid) -> usize {
        let state = self.state.read().await;
        state.dependents.iter().filter(|(_, p)| *p == provider_id).count()
            + state.bookings.values().filter(|b| b.provider_id == provider_id).count()
            + state.quotes.values().filter(|q| q.provider_id == provider_id).count()
            + state.inquiries.values().filter(|i| i.provider_id == provider_id).count()
            + state.listings.values().filter(|l| l.provider_id == provider_id).count()
    }

    /// Makes the next cascade deletions fail when they reach `kind`.
    pub fn fail_cascade_on(&self, kind: Option<ProviderDependent>) {
        if let Ok(mut guard) = self.cascade_failure.lock() {
            *guard = kind;
        }
    }
}

fn message_from(seq: i32, message: NewMessage, at: DateTime<Utc>) -> Message {
    Message {
        seq,
        sender_role: message.sender_role,
        sender_name: message.sender_name,
        sender_id: message.sender_id,
        text: message.text,
        created_at: at,
    }
}

fn booking_from(new: NewBooking, at: DateTime<Utc>) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        provider_id: new.provider_id,
        client_user_id: new.client_user_id,
        quote_id: new.quote_id,
        event_date: new.event_date,
        status: new.status,
        total_amount: new.total_amount,
        currency: new.currency,
        payment_session_id: new.payment_session_id,
        paid_at: new.paid_at,
        contact_name: new.contact_name,
        contact_email: new.contact_email,
        contact_phone: new.contact_phone,
        listing_ids: new.listing_ids,
        created_at: at,
        updated_at: at,
    }
}

fn session_taken(state: &MemoryState, session_id: &str, except: Option<Uuid>) -> bool {
    state.bookings.values().any(|b| {
        Some(b.id) != except && b.payment_session_id.as_deref() == Some(session_id)
    })
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("email".to_string()));
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            display_name: user.display_name,
            password_hash: user.password_hash,
            role: user.role,
            email_verified: false,
            is_active: true,
            created_at: Utc::now(),
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl ProviderStore for InMemoryStore {
    async fn find_provider(&self, id: Uuid) -> StoreResult<Option<Provider>> {
        Ok(self.state.read().await.providers.get(&id).cloned())
    }

    async fn find_provider_by_owner(&self, owner_user_id: Uuid) -> StoreResult<Option<Provider>> {
        Ok(self
            .state
            .read()
            .await
            .providers
            .values()
            .find(|p| p.owner_user_id == owner_user_id)
            .cloned())
    }

    async fn slug_exists(&self, slug: &str) -> StoreResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .providers
            .values()
            .any(|p| p.slug == slug))
    }

    async fn find_listings(&self, provider_id: Uuid, ids: &[Uuid]) -> StoreResult<Vec<Listing>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.listings.get(id))
            .filter(|l| l.provider_id == provider_id)
            .cloned()
            .collect())
    }

    async fn find_nearby(&self, query: &NearbyQuery) -> StoreResult<Vec<ProviderSummary>> {
        let state = self.state.read().await;
        let mut found: Vec<ProviderSummary> = state
            .providers
            .values()
            .filter(|p| p.is_published && Some(p.id) != query.exclude_provider_id)
            .filter_map(|p| {
                let (lat, lng) = (p.latitude?, p.longitude?);
                let distance = haversine_miles(query.latitude, query.longitude, lat, lng);
                (distance < query.radius_miles).then(|| ProviderSummary::from_provider(p, distance))
            })
            .collect();

        found.sort_by(|a, b| a.distance_miles.total_cmp(&b.distance_miles));
        found.truncate(usize::try_from(query.limit).unwrap_or(0));
        Ok(found)
    }

    async fn delete_provider_cascade(&self, id: Uuid) -> StoreResult<Option<CascadeReport>> {
        let fail_on = self.cascade_failure.lock().ok().and_then(|guard| *guard);

        let mut state = self.state.write().await;
        if !state.providers.contains_key(&id) {
            return Ok(None);
        }

        // Work on a copy so a failure part-way leaves nothing changed.
        let mut next = state.clone();
        let mut deleted = Vec::with_capacity(ProviderDependent::ALL.len());
        for kind in ProviderDependent::ALL {
            if fail_on == Some(kind) {
                return Err(StoreError::Backend(format!("failed to delete {}", kind)));
            }
            deleted.push((kind, next.delete_dependents(kind, id)));
        }
        next.providers.remove(&id);
        *state = next;

        Ok(Some(CascadeReport {
            provider_id: id,
            deleted,
        }))
    }
}

#[async_trait]
impl InquiryStore for InMemoryStore {
    async fn create_inquiry(&self, inquiry: NewInquiry) -> StoreResult<Inquiry> {
        let now = Utc::now();
        let created = Inquiry {
            id: Uuid::new_v4(),
            from_user_id: inquiry.from_user_id,
            from_name: inquiry.from_name,
            provider_id: inquiry.provider_id,
            event_date: inquiry.event_date,
            status: InquiryStatus::Open,
            messages: vec![message_from(1, inquiry.first_message, now)],
            created_at: now,
            updated_at: now,
        };
        self.state
            .write()
            .await
            .inquiries
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_inquiry(&self, id: Uuid) -> StoreResult<Option<Inquiry>> {
        Ok(self.state.read().await.inquiries.get(&id).cloned())
    }

    async fn append_message(
        &self,
        inquiry_id: Uuid,
        message: NewMessage,
    ) -> StoreResult<Option<Inquiry>> {
        let mut state = self.state.write().await;
        let Some(inquiry) = state.inquiries.get_mut(&inquiry_id) else {
            return Ok(None);
        };
        let now = Utc::now();
        let seq = inquiry.messages.len() as i32 + 1;
        inquiry.messages.push(message_from(seq, message, now));
        inquiry.updated_at = now;
        Ok(Some(inquiry.clone()))
    }

    async fn delete_inquiry(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().await.inquiries.remove(&id).is_some())
    }
}

#[async_trait]
impl QuoteStore for InMemoryStore {
    async fn create_quote(&self, quote: NewQuote) -> StoreResult<Quote> {
        let created = Quote {
            id: Uuid::new_v4(),
            provider_id: quote.provider_id,
            inquiry_id: quote.inquiry_id,
            client_user_id: quote.client_user_id,
            total_price: quote.total_price,
            notes: quote.notes,
            event_date: quote.event_date,
            status: QuoteStatus::Draft,
            responded_at: None,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .quotes
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_quote(&self, id: Uuid) -> StoreResult<Option<Quote>> {
        Ok(self.state.read().await.quotes.get(&id).cloned())
    }

    async fn mark_quote_sent(&self, id: Uuid) -> StoreResult<Option<Quote>> {
        let mut state = self.state.write().await;
        Ok(state
            .quotes
            .get_mut(&id)
            .filter(|q| q.status == QuoteStatus::Draft)
            .map(|q| {
                q.status = QuoteStatus::Sent;
                q.clone()
            }))
    }

    async fn decline_quote(&self, decline: QuoteDecline) -> StoreResult<Option<Quote>> {
        let mut state = self.state.write().await;
        let Some(quote) = state
            .quotes
            .get_mut(&decline.quote_id)
            .filter(|q| q.status == QuoteStatus::Sent)
        else {
            return Ok(None);
        };
        quote.status = QuoteStatus::Declined;
        quote.responded_at = Some(decline.responded_at);
        quote.notes = decline.notes;
        let declined = quote.clone();

        if let Some(inquiry) = declined
            .inquiry_id
            .and_then(|id| state.inquiries.get_mut(&id))
        {
            inquiry.status = InquiryStatus::Declined;
            inquiry.updated_at = decline.responded_at;
        }
        Ok(Some(declined))
    }

    async fn accept_quote(
        &self,
        acceptance: QuoteAcceptance,
    ) -> StoreResult<Option<(Quote, Booking)>> {
        let mut state = self.state.write().await;
        let Some(quote) = state
            .quotes
            .get_mut(&acceptance.quote_id)
            .filter(|q| q.status == QuoteStatus::Sent)
        else {
            return Ok(None);
        };
        quote.status = QuoteStatus::Accepted;
        quote.responded_at = Some(acceptance.responded_at);
        let accepted = quote.clone();

        if let Some(inquiry) = accepted
            .inquiry_id
            .and_then(|id| state.inquiries.get_mut(&id))
        {
            inquiry.status = InquiryStatus::Converted;
            inquiry.updated_at = acceptance.responded_at;
        }

        let booking = booking_from(acceptance.booking, acceptance.responded_at);
        state.bookings.insert(booking.id, booking.clone());
        Ok(Some((accepted, booking)))
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn create_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let mut state = self.state.write().await;
        if let Some(session) = booking.payment_session_id.as_deref() {
            if session_taken(&state, session, None) {
                return Err(StoreError::Conflict("payment_session_id".to_string()));
            }
        }
        let created = booking_from(booking, Utc::now());
        state.bookings.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.state.read().await.bookings.get(&id).cloned())
    }

    async fn attach_payment_session(
        &self,
        booking_id: Uuid,
        session_id: &str,
    ) -> StoreResult<Option<Booking>> {
        let mut state = self.state.write().await;
        if session_taken(&state, session_id, Some(booking_id)) {
            return Err(StoreError::Conflict("payment_session_id".to_string()));
        }
        Ok(state
            .bookings
            .get_mut(&booking_id)
            .filter(|b| b.status == BookingStatus::PendingPayment)
            .map(|b| {
                b.payment_session_id = Some(session_id.to_string());
                b.updated_at = Utc::now();
                b.clone()
            }))
    }

    async fn confirm_booking_payment(
        &self,
        booking_id: Uuid,
        session_id: &str,
        paid_at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let mut state = self.state.write().await;
        if session_taken(&state, session_id, Some(booking_id)) {
            return Err(StoreError::Conflict("payment_session_id".to_string()));
        }
        Ok(state
            .bookings
            .get_mut(&booking_id)
            .filter(|b| b.status == BookingStatus::PendingPayment)
            .map(|b| {
                b.status = BookingStatus::Confirmed;
                b.payment_session_id = Some(session_id.to_string());
                b.paid_at = Some(paid_at);
                b.updated_at = paid_at;
                b.clone()
            }))
    }

    async fn materialize_paid_booking(&self, booking: NewBooking) -> StoreResult<(Booking, bool)> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.bookings.values().find(|b| {
            b.payment_session_id.is_some() && b.payment_session_id == booking.payment_session_id
        }) {
            return Ok((existing.clone(), false));
        }
        let created = booking_from(booking, Utc::now());
        state.bookings.insert(created.id, created.clone());
        Ok((created, true))
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> StoreResult<(Vec<Booking>, i64)> {
        let state = self.state.read().await;
        let mut matching: Vec<&Booking> =
            state.bookings.values().filter(|b| filter.matches(b)).collect();
        matching.sort_by(|a, b| {
            b.event_date
                .cmp(&a.event_date)
                .then(b.created_at.cmp(&a.created_at))
        });

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.limit()).unwrap_or(0))
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn set_booking_status(
        &self,
        id: Uuid,
        status: BookingStatus,
    ) -> StoreResult<Option<Booking>> {
        let mut state = self.state.write().await;
        Ok(state.bookings.get_mut(&id).map(|b| {
            b.status = status;
            b.updated_at = Utc::now();
            b.clone()
        }))
    }
}

#[async_trait]
impl TokenStore for InMemoryStore {
    async fn insert_token(
        &self,
        purpose: TokenPurpose,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<SingleUseToken> {
        let token = SingleUseToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            used_at: None,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .tokens
            .insert(token.id, (purpose, token.clone()));
        Ok(token)
    }

    async fn find_token(
        &self,
        purpose: TokenPurpose,
        token_hash: &str,
    ) -> StoreResult<Option<SingleUseToken>> {
        Ok(self
            .state
            .read()
            .await
            .tokens
            .values()
            .find(|(p, t)| *p == purpose && t.token_hash == token_hash)
            .map(|(_, t)| t.clone()))
    }

    async fn consume_password_reset(
        &self,
        token: &SingleUseToken,
        new_password_hash: &str,
        used_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let unused = matches!(
            state.tokens.get(&token.id),
            Some((TokenPurpose::PasswordReset, t)) if t.used_at.is_none()
        );
        if !unused {
            return Ok(false);
        }
        if !state.users.contains_key(&token.user_id) {
            return Err(StoreError::NotFound);
        }

        if let Some((_, t)) = state.tokens.get_mut(&token.id) {
            t.used_at = Some(used_at);
        }
        if let Some(user) = state.users.get_mut(&token.user_id) {
            user.password_hash = new_password_hash.to_string();
        }
        Ok(true)
    }

    async fn consume_email_verification(
        &self,
        token: &SingleUseToken,
        used_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let unused = matches!(
            state.tokens.get(&token.id),
            Some((TokenPurpose::EmailVerification, t)) if t.used_at.is_none()
        );
        if !unused {
            return Ok(false);
        }
        if !state.users.contains_key(&token.user_id) {
            return Err(StoreError::NotFound);
        }

        if let Some((_, t)) = state.tokens.get_mut(&token.id) {
            t.used_at = Some(used_at);
        }
        if let Some(user) = state.users.get_mut(&token.user_id) {
            user.email_verified = true;
        }
        Ok(true)
    }
}

#[async_trait]
impl CultureTagStore for InMemoryStore {
    async fn list_tags(&self, active_only: bool) -> StoreResult<Vec<CultureTraditionTag>> {
        let state = self.state.read().await;
        let mut tags: Vec<_> = state
            .tags
            .values()
            .filter(|t| !active_only || t.is_active)
            .cloned()
            .collect();
        tags.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(tags)
    }

    async fn create_tag(&self, tag: &CreateCultureTagRequest) -> StoreResult<CultureTraditionTag> {
        let mut state = self.state.write().await;
        if state.tags.values().any(|t| t.slug == tag.slug) {
            return Err(StoreError::Conflict("slug".to_string()));
        }
        let created = CultureTraditionTag {
            id: Uuid::new_v4(),
            name: tag.name.trim().to_string(),
            slug: tag.slug.clone(),
            display_order: tag.display_order,
            is_active: tag.is_active,
            created_at: Utc::now(),
        };
        state.tags.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_tag(
        &self,
        id: Uuid,
        update: &UpdateCultureTagRequest,
    ) -> StoreResult<Option<CultureTraditionTag>> {
        let mut state = self.state.write().await;
        Ok(state.tags.get_mut(&id).map(|tag| {
            if let Some(name) = &update.name {
                tag.name = name.trim().to_string();
            }
            if let Some(order) = update.display_order {
                tag.display_order = order;
            }
            if let Some(active) = update.is_active {
                tag.is_active = active;
            }
            tag.clone()
        }))
    }
}
