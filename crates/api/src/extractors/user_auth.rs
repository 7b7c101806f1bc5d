//! User JWT authentication extractor.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use domain::models::AuthContext;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::user_auth::{authenticate, bearer_token};

/// The authenticated caller.
///
/// Uses the context stored by the auth middleware when present, otherwise
/// validates the Bearer token itself.
#[derive(Debug, Clone, Copy)]
pub struct UserAuth(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(auth) = parts.extensions.get::<AuthContext>() {
            return Ok(UserAuth(*auth));
        }

        let token = bearer_token(&parts.headers)?;
        let auth = authenticate(&state.jwt, token)?;
        parts.extensions.insert(auth);
        Ok(UserAuth(auth))
    }
}
