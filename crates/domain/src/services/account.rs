//! Account registration, credential checks and single-use token flows.
//!
//! Password reset and email verification share one pattern: a 256-bit
//! random token is mailed to the user, only its SHA-256 hash is stored, and
//! consuming it is a single conditional write that also applies its effect.

use std::sync::Arc;

use chrono::Utc;
use shared::crypto::{generate_secure_token, sha256_hex};
use shared::password::{check_password_policy, hash_password, verify_password};
use validator::Validate;

use super::notification::{dispatch, Notification, NotificationSender};
use crate::error::{DomainError, DomainResult};
use crate::models::token::{ResetPasswordRequest, VerifyEmailRequest};
use crate::models::user::{normalize_email, LoginRequest, RegisterRequest};
use crate::models::{AuthContext, NewUser, SingleUseToken, TokenPurpose, User};
use crate::ports::{StoreError, Stores};

pub struct AccountService {
    stores: Stores,
    notifier: Arc<dyn NotificationSender>,
    /// Echo issued tokens back to the caller. Development only.
    expose_tokens: bool,
}

impl AccountService {
    pub fn new(stores: Stores, notifier: Arc<dyn NotificationSender>, expose_tokens: bool) -> Self {
        Self {
            stores,
            notifier,
            expose_tokens,
        }
    }

    fn hash_new_password(password: &str) -> DomainResult<String> {
        check_password_policy(password)
            .map_err(|msg| DomainError::invalid_field("password", msg))?;
        hash_password(password).map_err(|e| DomainError::Internal(e.to_string()))
    }

    /// Creates a CLIENT or PROFESSIONAL account and mails a verification token.
    pub async fn register(&self, request: RegisterRequest) -> DomainResult<User> {
        request.validate()?;
        if !request.role.is_self_assignable() {
            return Err(DomainError::invalid_field(
                "role",
                "Role must be CLIENT or PROFESSIONAL",
            ));
        }
        let password_hash = Self::hash_new_password(&request.password)?;

        let user = self
            .stores
            .users
            .create_user(NewUser {
                email: normalize_email(&request.email),
                display_name: request.display_name.trim().to_string(),
                password_hash,
                role: request.role,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    DomainError::Conflict("Email already registered".to_string())
                }
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");

        self.issue_token(&user, TokenPurpose::EmailVerification).await?;
        Ok(user)
    }

    /// Checks credentials. Unknown emails, inactive accounts and wrong
    /// passwords are indistinguishable to the caller.
    pub async fn authenticate(&self, request: LoginRequest) -> DomainResult<User> {
        request.validate()?;

        let user = self
            .stores
            .users
            .find_user_by_email(&normalize_email(&request.email))
            .await?
            .filter(|u| u.is_active)
            .ok_or(DomainError::Unauthorized)?;

        let valid = verify_password(&request.password, &user.password_hash).map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "Stored password hash is unusable");
            DomainError::Unauthorized
        })?;
        if !valid {
            return Err(DomainError::Unauthorized);
        }
        Ok(user)
    }

    /// Issues a password reset token. Unknown or inactive emails succeed
    /// silently so the endpoint cannot be used to enumerate accounts.
    ///
    /// Returns the raw token only when token echo is enabled.
    pub async fn forgot_password(&self, email: &str) -> DomainResult<Option<String>> {
        let user = self
            .stores
            .users
            .find_user_by_email(&normalize_email(email))
            .await?
            .filter(|u| u.is_active);

        match user {
            Some(user) => self.issue_token(&user, TokenPurpose::PasswordReset).await,
            None => {
                tracing::info!("Password reset requested for unknown email");
                Ok(None)
            }
        }
    }

    pub async fn reset_password(&self, request: ResetPasswordRequest) -> DomainResult<()> {
        request.validate()?;
        let password_hash = Self::hash_new_password(&request.new_password)?;

        let token = self
            .usable_token(TokenPurpose::PasswordReset, &request.token)
            .await?;

        let consumed = self
            .stores
            .tokens
            .consume_password_reset(&token, &password_hash, Utc::now())
            .await?;
        if !consumed {
            return Err(DomainError::InvalidToken);
        }

        tracing::info!(user_id = %token.user_id, "Password reset completed");
        Ok(())
    }

    /// Mails a fresh verification token to the caller.
    pub async fn request_email_verification(
        &self,
        caller: &AuthContext,
    ) -> DomainResult<Option<String>> {
        let user = self
            .stores
            .users
            .find_user(caller.user_id)
            .await?
            .ok_or(DomainError::Unauthorized)?;
        if user.email_verified {
            return Err(DomainError::Conflict("Email already verified".to_string()));
        }
        self.issue_token(&user, TokenPurpose::EmailVerification).await
    }

    pub async fn verify_email(&self, request: VerifyEmailRequest) -> DomainResult<()> {
        request.validate()?;
        let token = self
            .usable_token(TokenPurpose::EmailVerification, &request.token)
            .await?;

        let consumed = self
            .stores
            .tokens
            .consume_email_verification(&token, Utc::now())
            .await?;
        if !consumed {
            return Err(DomainError::InvalidToken);
        }

        tracing::info!(user_id = %token.user_id, "Email verified");
        Ok(())
    }

    async fn usable_token(&self, purpose: TokenPurpose, raw: &str) -> DomainResult<SingleUseToken> {
        let token = self
            .stores
            .tokens
            .find_token(purpose, &sha256_hex(raw.trim()))
            .await?
            .ok_or(DomainError::InvalidToken)?;

        if token.is_used() {
            return Err(DomainError::InvalidToken);
        }
        if token.is_expired_at(Utc::now()) {
            return Err(DomainError::ExpiredToken);
        }
        Ok(token)
    }

    async fn issue_token(&self, user: &User, purpose: TokenPurpose) -> DomainResult<Option<String>> {
        let token = generate_secure_token();
        let expires_at = Utc::now() + purpose.lifetime();

        self.stores
            .tokens
            .insert_token(purpose, user.id, &sha256_hex(&token), expires_at)
            .await?;

        tracing::info!(user_id = %user.id, purpose = %purpose, "Single-use token issued");

        let (to_email, to_name, raw) = (user.email.clone(), user.display_name.clone(), token.clone());
        dispatch(self.notifier.clone(), async move {
            Ok(vec![match purpose {
                TokenPurpose::PasswordReset => Notification::PasswordReset {
                    to_email,
                    to_name,
                    token: raw,
                },
                TokenPurpose::EmailVerification => Notification::EmailVerification {
                    to_email,
                    to_name,
                    token: raw,
                },
            }])
        });

        Ok(self.expose_tokens.then_some(token))
    }
}
