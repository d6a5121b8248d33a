use axum::routing::post;
use axum::Router;

use crate::handlers::lyrics;
use crate::state::AppState;

/// Routes mounted at `/lyrics`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(lyrics::generate_lyrics))
}
