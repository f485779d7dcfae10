use crate::state::AppState;
use axum::Router;

pub mod coerce;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod password;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::account_routes())
        .merge(handlers::health_routes())
}
