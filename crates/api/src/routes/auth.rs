//! Account routes: registration, login, password reset and email verification.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::token::{
    ForgotPasswordRequest, ResetPasswordRequest, TokenIssuedResponse, VerifyEmailRequest,
};
use domain::models::user::{normalize_email, LoginRequest, RegisterRequest, UserProfile};
use domain::models::User;
use serde::Serialize;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ClientIp, UserAuth};
use crate::middleware::AuthAction;

/// Access token plus the caller's profile.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn issue_session(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let (access_token, _jti) = state
        .jwt
        .generate_access_token(user.id, user.role.as_str())
        .map_err(|e| ApiError::Internal(format!("Failed to issue access token: {}", e)))?;

    Ok(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry_secs,
        user: UserProfile::from(user),
    })
}

/// Register a new CLIENT or PROFESSIONAL account.
///
/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    state.rate_limits.check(AuthAction::Register, &ip)?;

    let user = state.accounts.register(request).await?;

    Ok((StatusCode::CREATED, Json(issue_session(&state, user)?)))
}

/// Exchange credentials for an access token.
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    state
        .rate_limits
        .check(AuthAction::Login, &normalize_email(&request.email))?;

    let user = state.accounts.authenticate(request).await?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(issue_session(&state, user)?))
}

/// Start a password reset. The response does not reveal whether the email
/// belongs to an account.
///
/// POST /api/v1/auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<TokenIssuedResponse>, ApiError> {
    let email = normalize_email(&request.email);
    let key = if email.is_empty() { ip } else { email };
    state.rate_limits.check(AuthAction::ForgotPassword, &key)?;

    let token = state.accounts.forgot_password(&request.email).await?;

    Ok(Json(TokenIssuedResponse {
        message: "If an account exists for this email, a reset link has been sent".to_string(),
        token,
    }))
}

/// Complete a password reset with a single-use token.
///
/// POST /api/v1/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.rate_limits.check(AuthAction::ResetPassword, &ip)?;

    state.accounts.reset_password(request).await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset".to_string(),
    }))
}

/// Mail a fresh verification link to the caller.
///
/// POST /api/v1/auth/request-verification
pub async fn request_verification(
    State(state): State<AppState>,
    UserAuth(caller): UserAuth,
) -> Result<Json<TokenIssuedResponse>, ApiError> {
    let token = state.accounts.request_email_verification(&caller).await?;

    Ok(Json(TokenIssuedResponse {
        message: "Verification email sent".to_string(),
        token,
    }))
}

/// POST /api/v1/auth/verify-email
pub async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.accounts.verify_email(request).await?;

    Ok(Json(MessageResponse {
        message: "Email verified".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_serialization() {
        let response = AuthResponse {
            access_token: "abc".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            user: UserProfile {
                id: uuid::Uuid::nil(),
                email: "ana@example.com".to_string(),
                display_name: "Ana".to_string(),
                role: domain::models::UserRole::Client,
                email_verified: false,
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["accessToken"], "abc");
        assert_eq!(json["tokenType"], "Bearer");
        assert_eq!(json["expiresIn"], 3600);
        assert_eq!(json["user"]["role"], "CLIENT");
        assert_eq!(json["user"]["emailVerified"], false);
    }
}
