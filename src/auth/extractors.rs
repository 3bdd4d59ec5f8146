use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::debug;

use crate::error::AppError;
use crate::profile::repo_types::AccountId;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "session_id";

/// Resolves the caller's session, returning the account it belongs to.
///
/// The token is read from `Authorization: Bearer <token>` first, then from
/// the `session_id` cookie. Use `Option<AuthUser>` on routes where a session
/// is optional.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: AccountId,
    pub token: String,
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|auth| {
            auth.strip_prefix("Bearer ")
                .or_else(|| auth.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(Cookie::value)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AppError::Unauthenticated)?;
        match state.sessions.resolve(&token).await? {
            Some(account_id) => Ok(AuthUser { account_id, token }),
            None => {
                debug!("session token did not resolve");
                Err(AppError::Unauthenticated)
            }
        }
    }
}
