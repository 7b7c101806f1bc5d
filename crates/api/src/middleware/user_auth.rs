//! User JWT authentication middleware.
//!
//! Validates the Bearer token and stores the caller's [`AuthContext`] in
//! request extensions for the handlers behind it.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::{AuthContext, UserRole};
use shared::jwt::{extract_user_id, JwtConfig, JwtError};

use crate::app::AppState;
use crate::error::ApiError;

/// Returns the Bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))
}

/// Validates an access token and builds the caller's context.
pub fn authenticate(jwt: &JwtConfig, token: &str) -> Result<AuthContext, ApiError> {
    let claims = jwt.validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        match e {
            JwtError::TokenExpired => ApiError::Unauthorized("Token has expired".to_string()),
            _ => ApiError::Unauthorized("Invalid or expired token".to_string()),
        }
    })?;

    let user_id = extract_user_id(&claims)
        .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;
    let role: UserRole = claims
        .role
        .parse()
        .map_err(|_| ApiError::Unauthorized("Invalid role in token".to_string()))?;

    Ok(AuthContext::new(user_id, role))
}

/// Middleware that requires a valid access token.
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth = match bearer_token(req.headers()).and_then(|t| authenticate(&state.jwt, t)) {
        Ok(auth) => auth,
        Err(err) => return err.into_response(),
    };

    req.extensions_mut().insert(auth);
    next.run(req).await
}

/// Middleware for admin-only routes. Must run after [`require_user_auth`].
pub async fn require_admin(req: Request<Body>, next: Next) -> Response {
    match req.extensions().get::<AuthContext>() {
        Some(auth) if auth.is_admin() => next.run(req).await,
        Some(auth) => {
            tracing::warn!(user_id = %auth.user_id, role = %auth.role, "Admin route denied");
            ApiError::Forbidden("Administrator role required".to_string()).into_response()
        }
        None => ApiError::Unauthorized("Authentication required".to_string()).into_response(),
    }
}
