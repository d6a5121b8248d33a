pub mod health;
pub mod lyrics;
pub mod music;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /music/callback                                  provider callbacks (POST)
/// /music/status?taskId=...                         completion status (GET)
/// /music/generate                                  submit generation (POST)
///
/// /lyrics                                          lyric generation (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/music", music::router())
        .nest("/lyrics", lyrics::router())
}
