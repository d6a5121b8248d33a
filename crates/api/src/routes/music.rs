//! Route definitions for the `/music` resource.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::music;
use crate::state::AppState;

/// Routes mounted at `/music`.
///
/// ```text
/// POST   /callback        -> receive_callback   (no body size limit)
/// GET    /status          -> task_status
/// POST   /generate        -> submit_generation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/callback",
            post(music::receive_callback).layer(DefaultBodyLimit::disable()),
        )
        .route("/status", get(music::task_status))
        .route("/generate", post(music::submit_generation))
}
