use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, instrument};

use super::dto::{
    Availability, AvatarResponse, CheckQuery, ProfileForm, ProfileQuery, RegisterResponse,
};
use super::repo_types::Account;
use super::services::{self, AvatarUpload};
use crate::auth::extractors::AuthUser;
use crate::auth::handlers::session_cookie;
use crate::error::AppError;
use crate::state::AppState;

pub const AVATAR_FIELD: &str = "avatar";
pub const AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).post(create_profile).put(update_profile))
        .route("/profile/check", get(check))
}

pub fn avatar_routes() -> Router<AppState> {
    Router::new()
        .route("/profile/avatar", put(upload_avatar).delete(delete_avatar))
        .layer(DefaultBodyLimit::max(AVATAR_MAX_BYTES))
}

/// `?id=` or `?nickname=` for someone's public profile, nothing for your own.
/// Id `0` counts as not supplied.
#[instrument(skip(state, auth))]
pub async fn get_profile(
    State(state): State<AppState>,
    Query(q): Query<ProfileQuery>,
    auth: Option<AuthUser>,
) -> Result<Json<Account>, AppError> {
    let gw = state.gateway.as_ref();
    let id = q.id.filter(|id| *id != 0);
    let nickname = q.nickname.as_deref().filter(|n| !n.is_empty());
    let account = match (id, nickname) {
        (Some(id), _) => services::public_profile(gw, id).await?,
        (None, Some(nickname)) => services::profile_by_nickname(gw, nickname).await?,
        (None, None) => {
            let auth = auth.ok_or(AppError::Unauthenticated)?;
            services::own_profile(gw, auth.account_id).await?
        }
    };
    Ok(Json(account))
}

#[instrument(skip_all)]
pub async fn create_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<ProfileForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(form) = payload?;
    let registered =
        services::register(state.gateway.as_ref(), state.sessions.as_ref(), &form).await?;

    let cookie = session_cookie(registered.token.clone(), state.config.session.ttl_days);
    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(RegisterResponse {
            session_id: registered.token,
            profile: registered.account,
        }),
    ))
}

#[instrument(skip(state, auth, payload), fields(account_id = auth.account_id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<ProfileForm>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(form) = payload?;
    services::update_profile(state.gateway.as_ref(), auth.account_id, &form).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state, auth, mp), fields(account_id = auth.account_id))]
pub async fn upload_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
    mut mp: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = mp.next_field().await? {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field.bytes().await?;
        upload = Some(AvatarUpload { body, filename, content_type });
        break;
    }

    let upload = upload.filter(|u| !u.body.is_empty()).ok_or_else(|| {
        AppError::MalformedInput(format!("multipart field {AVATAR_FIELD:?} is required"))
    })?;
    info!(
        bytes = upload.body.len(),
        content_type = %upload.content_type,
        "avatar received"
    );

    let avatar = services::attach_avatar(
        state.gateway.as_ref(),
        state.storage.as_ref(),
        &state.config.avatar_dir,
        auth.account_id,
        upload,
    )
    .await?;
    Ok(Json(AvatarResponse { avatar }))
}

#[instrument(skip(state, auth), fields(account_id = auth.account_id))]
pub async fn delete_avatar(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<StatusCode, AppError> {
    services::detach_avatar(state.gateway.as_ref(), auth.account_id).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state))]
pub async fn check(
    State(state): State<AppState>,
    Query(q): Query<CheckQuery>,
) -> Result<Json<Availability>, AppError> {
    let taken = services::check_availability(
        state.gateway.as_ref(),
        q.nickname.as_deref(),
        q.email.as_deref(),
    )
    .await?;
    Ok(Json(Availability { taken }))
}
