pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod services;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    handlers::session_routes()
}
