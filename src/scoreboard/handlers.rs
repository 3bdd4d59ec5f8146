use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::services::{self, ScoreboardPage};
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u64>,
    #[serde(default)]
    pub page: u64,
}

pub fn scoreboard_routes() -> Router<AppState> {
    Router::new().route("/scoreboard", get(get_scoreboard))
}

#[instrument(skip(state))]
pub async fn get_scoreboard(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<ScoreboardPage>, AppError> {
    let page = services::page(state.gateway.as_ref(), q.limit, q.page).await?;
    Ok(Json(page))
}
