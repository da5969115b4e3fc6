use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/sinks", get(handlers::get_sinks))
        .route("/api/sinks/:id", get(handlers::get_sink))
        .route("/api/repos", get(handlers::get_repos))
        .route("/api/downloads", get(handlers::get_downloads))
        .route("/api/downloads/:sink/click", get(handlers::download_click))
        .route("/api/refresh", post(handlers::refresh))
        .with_state(state)
}
