use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{auth::services::AuthService, error::ApiError};

/// Authenticated caller. Rejects with 401 unless a live bearer token is sent.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub token: String,
}

/// Caller id when a live bearer token is sent, `None` otherwise.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<i64>);

/// `Authorization: Bearer <token>`, scheme case-insensitive.
pub(crate) fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::Unauthorized("missing or malformed Authorization header".into()))?
            .to_owned();

        let auth = AuthService::from_ref(state);
        let user_id = auth.validate_token(&token).await?;
        Ok(AuthUser { user_id, token })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    AuthService: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeAuthUser(None));
        };
        let auth = AuthService::from_ref(state);
        match auth.validate_token(token).await {
            Ok(user_id) => Ok(MaybeAuthUser(Some(user_id))),
            Err(e) => {
                tracing::debug!(error = %e, "optional bearer ignored");
                Ok(MaybeAuthUser(None))
            }
        }
    }
}
