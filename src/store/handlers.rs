use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{AllSkins, SkinQuery, SkinRequest};
use super::services;
use crate::auth::extractors::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

pub fn store_routes() -> Router<AppState> {
    Router::new().route("/profile/skin", get(get_skins).post(buy_skin).put(equip_skin))
}

/// One skin with `?id=`, the whole catalog otherwise.
#[instrument(skip(state))]
pub async fn get_skins(
    State(state): State<AppState>,
    Query(q): Query<SkinQuery>,
) -> Result<Response, AppError> {
    let gw = state.gateway.as_ref();
    Ok(match q.id {
        Some(id) => Json(services::get_skin(gw, id).await?).into_response(),
        None => Json(AllSkins { skins: services::list_skins(gw).await? }).into_response(),
    })
}

#[instrument(skip(state, auth, payload), fields(account_id = auth.account_id))]
pub async fn buy_skin(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<SkinRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(req) = payload?;
    services::purchase(state.gateway.as_ref(), auth.account_id, req.skin).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state, auth, payload), fields(account_id = auth.account_id))]
pub async fn equip_skin(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<SkinRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(req) = payload?;
    services::equip(state.gateway.as_ref(), auth.account_id, req.skin).await?;
    Ok(StatusCode::OK)
}
