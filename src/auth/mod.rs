use crate::state::AppState;
use axum::Router;

pub(crate) mod dto;
pub(crate) mod extractors;
pub mod handlers;
mod repo;
mod repo_types;
mod services;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
