//! Rate limiting for the public authentication endpoints.
//!
//! Each protected action gets its own [`RateLimiterState`], a keyed governor
//! limiter with one bucket per identifier (normalized email, else client IP).
//! Requests over quota are rejected with 429 and `Retry-After`.

use axum::{
    extract::ConnectInfo,
    http::{header, Extensions, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter as GovRateLimiter,
};
use serde_json::json;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use crate::config::SecurityConfig;
use crate::error::ApiError;

/// Keyed limiter holding one bucket per identifier.
type KeyedRateLimiter = GovRateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Checks between two sweeps of idle identifiers.
const PRUNE_EVERY: u64 = 1024;

/// Per-identifier limits for one action.
pub struct RateLimiterState {
    limiter: KeyedRateLimiter,
    limit_per_hour: NonZeroU32,
    checks: AtomicU64,
}

impl RateLimiterState {
    /// Creates a state allowing `limit_per_hour` attempts per identifier.
    /// `None` when the limit is 0 (disabled).
    pub fn per_hour(limit_per_hour: u32) -> Option<Self> {
        NonZeroU32::new(limit_per_hour).map(|limit_per_hour| Self {
            limiter: GovRateLimiter::keyed(Quota::per_hour(limit_per_hour)),
            limit_per_hour,
            checks: AtomicU64::new(0),
        })
    }

    /// Check if an attempt for the given identifier should be allowed.
    /// Returns Ok(()) if allowed, or Err with retry_after seconds if rate limited.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PRUNE_EVERY == PRUNE_EVERY - 1 {
            self.prune();
        }

        match self.limiter.check_key(&key.to_string()) {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait_time = not_until.wait_time_from(DefaultClock::default().now());
                // Return retry after in seconds, minimum 1 second
                Err(wait_time.as_secs().max(1))
            }
        }
    }

    /// Drops identifiers whose bucket has fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of identifiers currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("limit_per_hour", &self.limit_per_hour)
            .field("tracked_keys", &self.tracked_keys())
            .finish()
    }
}

/// The limited authentication actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
}

/// Limiters for every authentication action, shared through `AppState`.
#[derive(Debug, Clone, Default)]
pub struct AuthRateLimiters {
    login: Option<Arc<RateLimiterState>>,
    register: Option<Arc<RateLimiterState>>,
    forgot_password: Option<Arc<RateLimiterState>>,
    reset_password: Option<Arc<RateLimiterState>>,
}

impl AuthRateLimiters {
    pub fn from_config(security: &SecurityConfig) -> Self {
        let build = |limit| RateLimiterState::per_hour(limit).map(Arc::new);
        Self {
            login: build(security.login_rate_limit_per_hour),
            register: build(security.register_rate_limit_per_hour),
            forgot_password: build(security.forgot_password_rate_limit_per_hour),
            reset_password: build(security.reset_password_rate_limit_per_hour),
        }
    }

    /// Counts one attempt of `action` for `key`.
    pub fn check(&self, action: AuthAction, key: &str) -> Result<(), ApiError> {
        let limiter = match action {
            AuthAction::Login => &self.login,
            AuthAction::Register => &self.register,
            AuthAction::ForgotPassword => &self.forgot_password,
            AuthAction::ResetPassword => &self.reset_password,
        };

        match limiter {
            Some(limiter) => limiter.check(key).map_err(|retry_after| {
                tracing::warn!(action = ?action, retry_after, "Rate limit exceeded");
                metrics::counter!("auth_rate_limited_total", "action" => format!("{:?}", action))
                    .increment(1);
                ApiError::RateLimited(retry_after)
            }),
            None => Ok(()),
        }
    }
}

/// Client address used as a rate limit key.
///
/// The socket peer is authoritative. `X-Forwarded-For` is consulted only
/// when the peer is a trusted proxy, and then the right-most hop that is not
/// itself a trusted proxy wins. Without a peer address every request shares
/// the `"unknown"` key.
pub fn client_ip(
    headers: &HeaderMap,
    extensions: &Extensions,
    trusted_proxies: &[IpAddr],
) -> String {
    let Some(peer) = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
    else {
        return "unknown".to_string();
    };

    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    // Walk the chain from the proxy nearest to us outwards
    headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map_while(|hop| hop.parse::<IpAddr>().ok())
        .find(|hop| !trusted_proxies.contains(hop))
        .unwrap_or(peer)
        .to_string()
}

/// Create a rate limited response with proper headers and body.
pub fn rate_limited_response(retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limit_exceeded",
        "message": "Too many attempts. Please try again later.",
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_limit_disables() {
        assert!(RateLimiterState::per_hour(0).is_none());
        assert!(RateLimiterState::per_hour(5).is_some());
    }

    #[test]
    fn test_rate_limiter_exhaustion() {
        let state = RateLimiterState::per_hour(1).unwrap();

        assert!(state.check("ana@example.com").is_ok());

        let result = state.check("ana@example.com");
        assert!(result.is_err());
        // Retry-after should be at least 1 second
        assert!(result.unwrap_err() >= 1);
    }

    #[test]
    fn test_rate_limiter_different_keys_independent() {
        let state = RateLimiterState::per_hour(1).unwrap();

        assert!(state.check("a@example.com").is_ok());
        assert!(state.check("b@example.com").is_ok());
        assert!(state.check("10.0.0.1").is_ok());

        assert!(state.check("a@example.com").is_err());
        assert!(state.check("b@example.com").is_err());
    }

    #[test]
    fn test_rate_limiter_allows_up_to_quota() {
        let state = RateLimiterState::per_hour(5).unwrap();
        for i in 0..5 {
            assert!(state.check("key").is_ok(), "Attempt {} should be allowed", i);
        }
        assert!(state.check("key").is_err());
    }

    #[test]
    fn test_keys_are_tracked_and_pruned() {
        let state = RateLimiterState::per_hour(10).unwrap();
        for i in 0..50 {
            assert!(state.check(&format!("user{}@example.com", i)).is_ok());
        }
        assert_eq!(state.tracked_keys(), 50);

        // Buckets with spent tokens are still recent and must survive
        state.prune();
        assert_eq!(state.tracked_keys(), 50);
        assert!(state.check("user0@example.com").is_ok());
    }

    #[test]
    fn test_periodic_prune_keeps_limits() {
        let state = RateLimiterState::per_hour(1).unwrap();
        assert!(state.check("victim@example.com").is_ok());

        // Enough distinct keys to trigger at least one sweep
        for i in 0..(PRUNE_EVERY * 2) {
            let _ = state.check(&format!("10.0.{}.{}", i / 256, i % 256));
        }

        assert!(state.check("victim@example.com").is_err());
    }

    #[test]
    fn test_auth_limiters_per_action() {
        let security = SecurityConfig {
            login_rate_limit_per_hour: 1,
            forgot_password_rate_limit_per_hour: 0,
            ..SecurityConfig::default()
        };
        let limiters = AuthRateLimiters::from_config(&security);

        assert!(limiters.check(AuthAction::Login, "ana@example.com").is_ok());
        assert!(matches!(
            limiters.check(AuthAction::Login, "ana@example.com"),
            Err(ApiError::RateLimited(secs)) if secs >= 1
        ));
        // Separate action, separate budget
        assert!(limiters.check(AuthAction::Register, "ana@example.com").is_ok());
        // Disabled action never limits
        for _ in 0..20 {
            assert!(limiters
                .check(AuthAction::ForgotPassword, "ana@example.com")
                .is_ok());
        }
    }

    fn peer(ip: [u8; 4]) -> Extensions {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from((ip, 4000))));
        extensions
    }

    #[test]
    fn test_client_ip_ignores_forwarded_header_from_untrusted_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7".parse().unwrap());

        assert_eq!(client_ip(&headers, &peer([198, 51, 100, 4]), &[]), "198.51.100.4");
        assert_eq!(client_ip(&HeaderMap::new(), &peer([127, 0, 0, 1]), &[]), "127.0.0.1");
        assert_eq!(client_ip(&headers, &Extensions::new(), &[]), "unknown");
    }

    #[test]
    fn test_client_ip_behind_trusted_proxies() {
        let proxies: Vec<IpAddr> = vec!["10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap()];
        let mut headers = HeaderMap::new();
        // Client-supplied spoof, real client, then the inner proxy
        headers.insert(
            "x-forwarded-for",
            "1.2.3.4, 203.0.113.7, 10.0.0.2".parse().unwrap(),
        );

        assert_eq!(client_ip(&headers, &peer([10, 0, 0, 1]), &proxies), "203.0.113.7");
        assert_eq!(client_ip(&HeaderMap::new(), &peer([10, 0, 0, 1]), &proxies), "10.0.0.1");

        let mut garbage = HeaderMap::new();
        garbage.insert("x-forwarded-for", "not-an-ip".parse().unwrap());
        assert_eq!(client_ip(&garbage, &peer([10, 0, 0, 1]), &proxies), "10.0.0.1");
    }

    #[test]
    fn test_rate_limited_response_format() {
        let response = rate_limited_response(60);
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "60");
    }
}
