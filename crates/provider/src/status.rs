//! Status sources: where a waiter asks "is task T done yet?".
//!
//! Two sources exist. [`ProviderStatusSource`] asks the generation provider
//! directly; [`BridgeStatusSource`] asks this system's own status endpoint,
//! which is fed by provider callbacks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use songbridge_core::envelope::first_string;
use songbridge_core::types::TaskId;

use crate::api::MusicProviderApi;

/// Path of this system's status endpoint, relative to the server base URL.
pub const BRIDGE_STATUS_PATH: &str = "/api/v1/music/status";

/// HTTP timeout for a single bridge status request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Places a finished provider record may carry the first track's audio URL.
const RECORD_AUDIO_URL_POINTERS: &[&str] = &[
    "/data/response/sunoData/0/audioUrl",
    "/data/response/data/0/audio_url",
    "/data/data/0/audio_url",
    "/data/audioUrl",
    "/data/audio_url",
];

const RECORD_STATUS_POINTERS: &[&str] = &["/data/status", "/status"];

const RECORD_ERROR_POINTERS: &[&str] = &["/data/errorMessage", "/data/error_message"];

/// Provider record status meaning every track is ready.
const RECORD_STATUS_SUCCESS: &str = "SUCCESS";

/// Provider record statuses after which no audio will ever appear.
const RECORD_FAILED_STATUSES: &[&str] = &[
    "CREATE_TASK_FAILED",
    "GENERATE_AUDIO_FAILED",
    "SENSITIVE_WORD_ERROR",
];

/// What a single status query observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    /// Not finished yet; ask again later.
    Processing,
    /// Finished with a playable URL.
    Complete { audio_url: String },
    /// The provider gave up on the task.
    Failed { reason: String },
}

/// A status query that failed at the transport or HTTP level.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The endpoint returned a non-success status code.
    #[error("Status endpoint returned {status}: {body}")]
    HttpStatus {
        status: u16,
        /// Raw response body (or provider message) for debugging.
        body: String,
    },

    /// The response was successful but not something we understand.
    #[error("Unrecognized status response: {0}")]
    InvalidBody(String),
}

/// Anything that can report the completion state of a task.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn query(&self, task_id: &TaskId) -> Result<StatusReport, StatusError>;
}

#[async_trait]
impl<S: StatusSource + ?Sized> StatusSource for Arc<S> {
    async fn query(&self, task_id: &TaskId) -> Result<StatusReport, StatusError> {
        (**self).query(task_id).await
    }
}

/// Queries the provider's record-info endpoint.
pub struct ProviderStatusSource {
    api: Arc<MusicProviderApi>,
}

impl ProviderStatusSource {
    pub fn new(api: Arc<MusicProviderApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl StatusSource for ProviderStatusSource {
    async fn query(&self, task_id: &TaskId) -> Result<StatusReport, StatusError> {
        let record = self.api.fetch_record(task_id).await?;
        Ok(interpret_provider_record(&record))
    }
}

/// Interpret a provider record-info body.
///
/// When the record carries a status, only `SUCCESS` counts as complete (the
/// first track can carry a URL while the rest are still rendering). Records
/// without any status are judged by the presence of an audio URL alone.
pub fn interpret_provider_record(record: &Value) -> StatusReport {
    let status = first_string(record, RECORD_STATUS_POINTERS);
    let audio_url = first_string(record, RECORD_AUDIO_URL_POINTERS);

    match (status.as_deref(), audio_url) {
        (Some(s), _) if RECORD_FAILED_STATUSES.contains(&s) => StatusReport::Failed {
            reason: first_string(record, RECORD_ERROR_POINTERS).unwrap_or_else(|| s.to_string()),
        },
        (Some(RECORD_STATUS_SUCCESS) | None, Some(audio_url)) => StatusReport::Complete { audio_url },
        _ => StatusReport::Processing,
    }
}

/// Queries this system's `GET /api/v1/music/status` endpoint.
///
/// The bridge server does not check credentials itself; a token is only
/// needed when it sits behind a gateway that does.
pub struct BridgeStatusSource {
    client: reqwest::Client,
    base_url: String,
    /// Sent as `Authorization: Bearer ...` when set.
    token: Option<String>,
}

/// Wire body of the bridge status endpoint.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum BridgeStatusBody {
    Processing,
    Complete {
        #[serde(rename = "audioUrl")]
        audio_url: String,
    },
}

impl BridgeStatusSource {
    /// * `base_url` - Server root, e.g. `http://localhost:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }
}

#[async_trait]
impl StatusSource for BridgeStatusSource {
    async fn query(&self, task_id: &TaskId) -> Result<StatusReport, StatusError> {
        let mut request = self
            .client
            .get(format!("{}{BRIDGE_STATUS_PATH}", self.base_url))
            .query(&[("taskId", task_id.as_str())])
            .timeout(REQUEST_TIMEOUT);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let body = parse_json_response(response).await?;

        match serde_json::from_value::<BridgeStatusBody>(body.clone()) {
            Ok(BridgeStatusBody::Processing) => Ok(StatusReport::Processing),
            Ok(BridgeStatusBody::Complete { audio_url }) if !audio_url.trim().is_empty() => {
                Ok(StatusReport::Complete { audio_url })
            }
            _ => Err(StatusError::InvalidBody(body.to_string())),
        }
    }
}

/// Check the status code and decode a JSON body.
pub(crate) async fn parse_json_response(response: reqwest::Response) -> Result<Value, StatusError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(StatusError::HttpStatus {
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|_| StatusError::InvalidBody(text))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn pending_record_is_processing() {
        let record = json!({ "code": 200, "data": { "taskId": "abc123", "status": "PENDING" } });
        assert_eq!(interpret_provider_record(&record), StatusReport::Processing);
    }

    #[test]
    fn first_success_is_still_processing() {
        let record = json!({
            "code": 200,
            "data": {
                "status": "FIRST_SUCCESS",
                "response": { "sunoData": [{ "audioUrl": "https://cdn/x.mp3" }] },
            },
        });
        assert_eq!(interpret_provider_record(&record), StatusReport::Processing);
    }

    #[test]
    fn success_record_is_complete() {
        let record = json!({
            "code": 200,
            "data": {
                "status": "SUCCESS",
                "response": { "sunoData": [{ "audioUrl": "https://cdn/x.mp3" }] },
            },
        });
        assert_eq!(
            interpret_provider_record(&record),
            StatusReport::Complete {
                audio_url: "https://cdn/x.mp3".into()
            }
        );
    }

    #[test]
    fn success_without_url_keeps_waiting() {
        let record = json!({ "data": { "status": "SUCCESS", "response": { "sunoData": [] } } });
        assert_eq!(interpret_provider_record(&record), StatusReport::Processing);
    }

    #[test]
    fn statusless_record_with_url_is_complete() {
        let record = json!({ "data": { "data": [{ "audio_url": "https://cdn/y.mp3" }] } });
        assert_eq!(
            interpret_provider_record(&record),
            StatusReport::Complete {
                audio_url: "https://cdn/y.mp3".into()
            }
        );
    }

    #[test]
    fn failed_record_carries_reason() {
        let record = json!({
            "data": { "status": "GENERATE_AUDIO_FAILED", "errorMessage": "model overloaded" },
        });
        assert_eq!(
            interpret_provider_record(&record),
            StatusReport::Failed {
                reason: "model overloaded".into()
            }
        );

        let record = json!({ "data": { "status": "SENSITIVE_WORD_ERROR" } });
        assert_eq!(
            interpret_provider_record(&record),
            StatusReport::Failed {
                reason: "SENSITIVE_WORD_ERROR".into()
            }
        );
    }
}
