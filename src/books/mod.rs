use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod lending;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::book_routes()
}
