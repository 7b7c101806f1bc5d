use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use domain::ports::Stores;
use domain::services::{
    AccountService, AdminService, CheckoutUrls, LifecycleEngine, MockPaymentGateway,
    NotificationSender, PaymentGateway,
};
use shared::jwt::JwtConfig;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_admin, require_user_auth,
    security_headers_middleware, trace_id, AuthRateLimiters,
};
use crate::routes::{
    admin, auth, bookings, checkout, culture_tags, health, inquiries, payments, providers, quotes,
};
use crate::services::{EmailService, StripeGateway};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub stores: Stores,
    pub engine: Arc<LifecycleEngine>,
    pub accounts: Arc<AccountService>,
    pub admin: Arc<AdminService>,
    pub rate_limits: AuthRateLimiters,
}

/// Builds the application against PostgreSQL with the configured email and
/// payment providers.
pub fn create_app(config: Config, pool: PgPool) -> anyhow::Result<Router> {
    let stores = persistence::postgres_stores(pool.clone());

    let payments: Arc<dyn PaymentGateway> = match config.payments.provider.as_str() {
        "stripe" => Arc::new(
            StripeGateway::new(&config.payments).context("Failed to build Stripe client")?,
        ),
        _ => {
            tracing::warn!("Using mock payment gateway; checkout sessions are not real");
            Arc::new(MockPaymentGateway::new())
        }
    };
    let notifier: Arc<dyn NotificationSender> =
        Arc::new(EmailService::new(config.email.clone()));

    create_app_with(config, pool, stores, payments, notifier)
}

/// Builds the application from explicit collaborators.
pub fn create_app_with(
    config: Config,
    pool: PgPool,
    stores: Stores,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationSender>,
) -> anyhow::Result<Router> {
    let config = Arc::new(config);
    let jwt = Arc::new(
        config
            .jwt
            .signing_config()
            .context("Failed to load JWT signing keys")?,
    );

    let engine = Arc::new(LifecycleEngine::new(
        stores.clone(),
        payments,
        notifier.clone(),
        CheckoutUrls {
            success_url: config.payments.success_url.clone(),
            cancel_url: config.payments.cancel_url.clone(),
        },
    ));
    let accounts = Arc::new(AccountService::new(
        stores.clone(),
        notifier,
        config.auth.expose_tokens,
    ));
    let admin_service = Arc::new(AdminService::new(stores.clone()));

    let state = AppState {
        pool,
        config: config.clone(),
        jwt,
        stores,
        engine,
        accounts,
        admin: admin_service,
        rate_limits: AuthRateLimiters::from_config(&config.security),
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/forgot-password", post(auth::forgot_password))
        .route("/api/v1/auth/reset-password", post(auth::reset_password))
        .route("/api/v1/auth/verify-email", post(auth::verify_email))
        .route(
            "/api/v1/providers/recommendations",
            get(providers::recommendations),
        )
        .route(
            "/api/v1/providers/slug-available",
            get(providers::slug_available),
        )
        .route("/api/v1/culture-tags", get(culture_tags::list_active))
        // Authenticated by signature, not by session
        .route("/api/v1/payments/webhook", post(payments::payment_webhook));

    // Session routes (require a valid access token)
    let session_routes = Router::new()
        .route(
            "/api/v1/auth/request-verification",
            post(auth::request_verification),
        )
        .route("/api/v1/inquiries", post(inquiries::create_inquiry))
        .route("/api/v1/inquiries/:inquiry_id", get(inquiries::get_inquiry))
        .route(
            "/api/v1/inquiries/:inquiry_id/messages",
            post(inquiries::append_message),
        )
        .route("/api/v1/quotes", post(quotes::create_quote))
        .route("/api/v1/quotes/:quote_id", get(quotes::get_quote))
        .route("/api/v1/quotes/:quote_id/send", post(quotes::send_quote))
        .route(
            "/api/v1/quotes/:quote_id/decline",
            post(quotes::decline_quote),
        )
        .route("/api/v1/quotes/:quote_id/accept", post(quotes::accept_quote))
        .route("/api/v1/bookings/:booking_id", get(bookings::get_booking))
        .route(
            "/api/v1/bookings/:booking_id/checkout",
            post(bookings::resume_checkout),
        )
        .route("/api/v1/checkout/initiate", post(checkout::initiate_checkout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // Admin routes (require an ADMINISTRATOR session)
    // Middleware order: user auth runs first, then the role check
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/providers/:provider_id",
            delete(admin::delete_provider),
        )
        .route(
            "/api/v1/admin/bookings",
            get(admin::list_bookings).post(admin::create_booking),
        )
        .route(
            "/api/v1/admin/bookings/:booking_id/status",
            patch(admin::set_booking_status),
        )
        .route(
            "/api/v1/admin/inquiries/:inquiry_id",
            delete(admin::delete_inquiry),
        )
        .route(
            "/api/v1/admin/culture-tags",
            get(admin::list_culture_tags).post(admin::create_culture_tag),
        )
        .route(
            "/api/v1/admin/culture-tags/:tag_id",
            patch(admin::update_culture_tag),
        )
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    let router = Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware)) // Prometheus metrics
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id)) // Request ID and logging
        .layer(cors)
        .with_state(state);

    Ok(router)
}
