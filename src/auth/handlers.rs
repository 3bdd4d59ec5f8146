use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use tracing::{info, instrument};

use super::dto::{LoginRequest, SessionResponse};
use super::extractors::{AuthUser, SESSION_COOKIE};
use super::services;
use crate::error::AppError;
use crate::state::AppState;

pub fn session_routes() -> Router<AppState> {
    Router::new().route("/session", get(current).post(open).delete(close))
}

/// Cookie carrying `token`, living as long as the session row.
pub fn session_cookie(token: String, ttl_days: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::days(ttl_days))
        .build()
}

#[instrument(skip_all)]
pub async fn current(auth: Option<AuthUser>) -> Result<Json<SessionResponse>, AppError> {
    let auth = auth.ok_or(AppError::Unauthenticated)?;
    Ok(Json(SessionResponse { session_id: auth.token }))
}

#[instrument(skip_all)]
pub async fn open(
    State(state): State<AppState>,
    jar: CookieJar,
    auth: Option<AuthUser>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    // An already authenticated caller keeps their session.
    let token = match auth {
        Some(auth) => auth.token,
        None => {
            let Json(payload) = payload?;
            services::login(
                state.gateway.as_ref(),
                state.sessions.as_ref(),
                &payload.email,
                &payload.password,
            )
            .await?
            .token
        }
    };

    let jar = jar.add(session_cookie(token.clone(), state.config.session.ttl_days));
    Ok((jar, Json(SessionResponse { session_id: token })))
}

#[instrument(skip_all)]
pub async fn close(
    State(state): State<AppState>,
    jar: CookieJar,
    auth: Option<AuthUser>,
) -> impl IntoResponse {
    if let Some(auth) = auth {
        services::logout(state.sessions.as_ref(), &auth.token).await;
        info!(account_id = auth.account_id, "logged out");
    }
    jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"))
}
