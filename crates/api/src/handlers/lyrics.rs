use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use songbridge_provider::lyrics::Lyrics;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LyricsInput {
    /// Free-form description of the scene the song is about.
    pub scene: String,
}

/// POST /api/v1/lyrics
///
/// Write a song for the described scene. Returns 400 for a blank scene and
/// 503 when no lyric model is configured.
pub async fn generate_lyrics(
    State(state): State<AppState>,
    Json(input): Json<LyricsInput>,
) -> AppResult<Json<DataResponse<Lyrics>>> {
    if input.scene.trim().is_empty() {
        return Err(AppError::BadRequest("scene must not be empty".into()));
    }

    let lyrics_api = state
        .lyrics
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Lyric generation is not configured".into()))?;

    let lyrics = lyrics_api.generate(&input.scene).await?;

    Ok(Json(DataResponse { data: lyrics }))
}
