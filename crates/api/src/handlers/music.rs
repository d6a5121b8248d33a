//! Handlers for the `/music` resource: provider callbacks, completion
//! status and generation submission.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use songbridge_core::callback::{classify_bytes, CallbackEvent};
use songbridge_core::types::TaskId;
use songbridge_provider::GenerationRequest;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

/// POST /api/v1/music/callback
///
/// Receives every lifecycle event the provider emits for a task. Only a
/// completion event is recorded; anything else, including bodies that are
/// not JSON, is acknowledged with the same `{ "success": true }` so the
/// provider never retries. The route carries no body size limit, and a body
/// that cannot be read at all is acknowledged the same way.
pub async fn receive_callback(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Callback body could not be read");
            return Json(json!({ "success": true }));
        }
    };

    match classify_bytes(&body) {
        CallbackEvent::Completed { task_id, audio_url } => {
            tracing::info!(task_id = %task_id, audio_url = %audio_url, "Completion callback received");
            state.store.put(task_id.clone(), audio_url).await;
            state.watcher.stop(&task_id).await;
        }
        CallbackEvent::Ignored(reason) => {
            tracing::debug!(%reason, bytes = body.len(), "Callback ignored");
        }
    }

    Json(json!({ "success": true }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Query parameter naming the task on the status endpoint.
const TASK_ID_PARAM: &str = "taskId";

/// Body of the status endpoint.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Complete {
        #[serde(rename = "audioUrl")]
        audio_url: String,
    },
}

/// GET /api/v1/music/status?taskId=...
///
/// Reports `complete` with the audio URL once the task is recorded, and
/// `processing` for every id not (yet) recorded, including ids this server
/// has never seen.
///
/// The query is read as plain pairs and the first `taskId` wins, so
/// repeated or unrelated parameters never produce a non-JSON rejection.
pub async fn task_status(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Json<TaskStatus>> {
    let raw = params
        .into_iter()
        .find_map(|(key, value)| (key == TASK_ID_PARAM).then_some(value))
        .ok_or_else(|| AppError::BadRequest("taskId is required".into()))?;
    let task_id = TaskId::parse(raw)?;

    let status = match state.store.get(&task_id).await {
        Some(record) => TaskStatus::Complete {
            audio_url: record.audio_url,
        },
        None => TaskStatus::Processing,
    };

    Ok(Json(status))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateInput {
    pub prompt: String,
    pub style: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTask {
    pub task_id: TaskId,
}

/// POST /api/v1/music/generate
///
/// Submit a generation request to the provider with this server's callback
/// URL and start a background watch for the new task. Returns 201 with the
/// provider-assigned task id.
pub async fn submit_generation(
    State(state): State<AppState>,
    Json(input): Json<GenerateInput>,
) -> AppResult<impl IntoResponse> {
    let request = GenerationRequest {
        prompt: input.prompt,
        style: input.style,
        title: input.title,
    };

    let task_id = state
        .provider
        .submit_generation(&request, &state.config.callback_url())
        .await?;

    state.watcher.watch(task_id.clone()).await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmittedTask { task_id },
        }),
    ))
}
