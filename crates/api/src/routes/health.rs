use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Number of tasks with a recorded completion.
    pub completed_tasks: usize,
    /// Number of tasks the background watcher is polling.
    pub watched_tasks: usize,
    /// Whether `POST /api/v1/lyrics` is available.
    pub lyrics_enabled: bool,
}

/// GET /health -- returns service health and registry counters.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        completed_tasks: state.store.len().await,
        watched_tasks: state.watcher.active_count().await,
        lyrics_enabled: state.lyrics.is_some(),
    })
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
