//! Fixtures shared by the unit tests of this crate.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::memory::InMemoryStore;
use crate::models::{AuthContext, Listing, Provider, User, UserRole};
use crate::ports::Stores;
use crate::services::{
    AccountService, AdminService, CheckoutUrls, LifecycleEngine, MockNotificationSender,
    MockPaymentGateway,
};

pub fn user(role: UserRole, name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: format!("{}-{}@example.com", name.to_lowercase(), Uuid::new_v4().simple()),
        display_name: name.to_string(),
        password_hash: String::new(),
        role,
        email_verified: false,
        is_active: true,
        created_at: Utc::now(),
    }
}

pub fn provider(owner: &User, lat: Option<f64>, lng: Option<f64>) -> Provider {
    let id = Uuid::new_v4();
    Provider {
        id,
        owner_user_id: owner.id,
        business_name: format!("{} Events", owner.display_name),
        slug: format!("vendor-{}", id.simple()),
        latitude: lat,
        longitude: lng,
        is_published: true,
        is_verified: true,
        categories: vec!["catering".to_string()],
        average_rating: 4.5,
        review_count: 12,
        price_from: None,
        currency: "usd".to_string(),
        created_at: Utc::now(),
    }
}

pub fn listing(provider: &Provider, headline: &str, price: Decimal) -> Listing {
    Listing {
        id: Uuid::new_v4(),
        provider_id: provider.id,
        headline: headline.to_string(),
        price,
        is_active: true,
    }
}

pub fn ctx(user: &User) -> AuthContext {
    AuthContext::new(user.id, user.role)
}

/// Lets background notification tasks run to completion.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub notifier: MockNotificationSender,
    pub payments: MockPaymentGateway,
    pub engine: LifecycleEngine,
    pub accounts: AccountService,
    pub admin: AdminService,
    pub client: User,
    pub vendor: User,
    pub admin_user: User,
    pub provider: Provider,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_gateway(MockPaymentGateway::new()).await
    }

    pub async fn with_gateway(payments: MockPaymentGateway) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let stores = Stores::from_single(store.clone());
        let notifier = MockNotificationSender::new();

        let client = user(UserRole::Client, "Ana");
        let vendor = user(UserRole::Professional, "Bruno");
        let admin_user = user(UserRole::Administrator, "Carla");
        let provider = provider(&vendor, Some(40.0), Some(-74.0));
        store.insert_user(client.clone()).await;
        store.insert_user(vendor.clone()).await;
        store.insert_user(admin_user.clone()).await;
        store.insert_provider(provider.clone()).await;

        let engine = LifecycleEngine::new(
            stores.clone(),
            Arc::new(payments.clone()),
            Arc::new(notifier.clone()),
            CheckoutUrls {
                success_url: "https://app.local/success?session_id={CHECKOUT_SESSION_ID}"
                    .to_string(),
                cancel_url: "https://app.local/cancel".to_string(),
            },
        );
        let accounts = AccountService::new(stores.clone(), Arc::new(notifier.clone()), true);
        let admin = AdminService::new(stores);

        Self {
            store,
            notifier,
            payments,
            engine,
            accounts,
            admin,
            client,
            vendor,
            admin_user,
            provider,
        }
    }
}
