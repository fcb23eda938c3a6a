use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_cookies::Cookies;
use tracing::warn;
use uuid::Uuid;

use super::{cookies::session_token, jwt::JwtKeys};
use crate::{error::AppError, state::AppState, users::repo_types::PublicUser};

/// Caller resolved from the session cookie.
///
/// `user` is `None` when the token is valid but the account no longer exists;
/// handlers that need the record answer 404 in that case.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub user: Option<PublicUser>,
}

impl AuthUser {
    pub fn require_user(&self) -> Result<&PublicUser, AppError> {
        self.user
            .as_ref()
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(anyhow::anyhow!(msg)))?;

        let token = session_token(&cookies)
            .ok_or_else(|| AppError::auth("Not authorized, please login"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired session token");
            AppError::auth("Not authorized")
        })?;

        let user = state.users.find_public(claims.sub).await?;
        if user.is_none() {
            warn!(user_id = %claims.sub, "session token for missing user");
        }

        Ok(AuthUser {
            id: claims.sub,
            user,
        })
    }
}
