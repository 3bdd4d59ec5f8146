pub mod dto;
pub mod handlers;
pub mod repo_types;
pub mod services;
pub mod validation;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::profile_routes().merge(handlers::avatar_routes())
}
