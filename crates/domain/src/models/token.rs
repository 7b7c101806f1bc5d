//! Single-use account tokens (password reset, email verification).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// What a single-use token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenPurpose {
    PasswordReset,
    EmailVerification,
}

impl TokenPurpose {
    /// Time a freshly issued token stays valid.
    pub fn lifetime(&self) -> Duration {
        match self {
            TokenPurpose::PasswordReset => Duration::minutes(30),
            TokenPurpose::EmailVerification => Duration::hours(24),
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenPurpose::PasswordReset => write!(f, "password_reset"),
            TokenPurpose::EmailVerification => write!(f, "email_verification"),
        }
    }
}

/// A stored token. Only the SHA-256 hash of the secret is persisted.
#[derive(Debug, Clone)]
pub struct SingleUseToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SingleUseToken {
    pub fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Request payload for forgot password.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Request payload for reset password.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    pub new_password: String,
}

/// Request payload for email verification.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,
}

/// Generic acknowledgement. `token` is only set when development token
/// echo is enabled.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenIssuedResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifetimes() {
        assert_eq!(TokenPurpose::PasswordReset.lifetime(), Duration::minutes(30));
        assert_eq!(TokenPurpose::EmailVerification.lifetime(), Duration::hours(24));
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc::now();
        let token = SingleUseToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "h".into(),
            expires_at: now,
            used_at: None,
            created_at: now,
        };
        assert!(!token.is_expired_at(now));
        assert!(token.is_expired_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_response_omits_token_by_default() {
        let resp = TokenIssuedResponse {
            message: "ok".into(),
            token: None,
        };
        assert_eq!(serde_json::to_string(&resp).unwrap(), r#"{"message":"ok"}"#);
    }
}
