//! REST client for the generation provider.
//!
//! Wraps the provider's HTTP API (generation submission and per-task
//! record lookup) using [`reqwest`].

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use songbridge_core::envelope::{first_verbatim, provider_message};
use songbridge_core::types::TaskId;

use crate::config::ProviderConfig;
use crate::status::StatusError;

/// Path of the generation endpoint, relative to the provider base URL.
pub const GENERATE_PATH: &str = "/api/v1/generate";

/// Path of the per-task record lookup, relative to the provider base URL.
pub const RECORD_INFO_PATH: &str = "/api/v1/generate/record-info";

/// Maximum prompt length (in characters) in description mode.
pub const PROMPT_LIMIT: usize = 400;

/// Maximum prompt length (in characters) in custom mode, where the prompt
/// carries the lyrics.
pub const CUSTOM_PROMPT_LIMIT: usize = 3000;

/// HTTP timeout for a single provider request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Places the provider has been seen to put the assigned task id, most
/// likely first.
const TASK_ID_POINTERS: &[&str] = &[
    "/data/taskId",
    "/data/task_id",
    "/data/id",
    "/taskId",
    "/task_id",
    "/id",
];

/// A user's generation request.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub style: Option<String>,
    pub title: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Wire body of `POST /api/v1/generate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeneratePayload<'a> {
    prompt: &'a str,
    custom_mode: bool,
    instrumental: bool,
    model: &'a str,
    #[serde(rename = "callBackUrl")]
    callback_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

/// Errors from submitting a generation request.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The prompt was rejected locally before any request was made.
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success HTTP status or envelope code.
    #[error("Provider rejected generation ({status}): {message}")]
    Rejected {
        status: u16,
        message: String,
    },

    /// The provider accepted the request but no task id could be located.
    #[error("No task id in provider response: {body}")]
    MissingTaskId {
        /// Raw response body for debugging.
        body: String,
    },
}

/// HTTP client for the generation provider.
pub struct MusicProviderApi {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl MusicProviderApi {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for sharing a connection pool with other clients).
    pub fn with_client(client: reqwest::Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Submit a generation request.
    ///
    /// `callback_url` is where the provider will push lifecycle events for
    /// the new task. Returns the provider-assigned task id.
    pub async fn submit_generation(
        &self,
        request: &GenerationRequest,
        callback_url: &str,
    ) -> Result<TaskId, SubmissionError> {
        let prompt = self.validate_prompt(&request.prompt)?;

        let payload = GeneratePayload {
            prompt,
            custom_mode: self.config.custom_mode,
            instrumental: self.config.instrumental,
            model: &self.config.model,
            callback_url,
            style: non_blank(request.style.as_deref()),
            title: non_blank(request.title.as_deref()),
        };

        let response = self
            .client
            .post(format!("{}{GENERATE_PATH}", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                message: body.as_ref().and_then(provider_message).unwrap_or(text),
            });
        }

        let body = body.ok_or_else(|| SubmissionError::MissingTaskId { body: text.clone() })?;

        if let Some(code) = envelope_error_code(&body) {
            return Err(SubmissionError::Rejected {
                status: code,
                message: provider_message(&body).unwrap_or_else(|| text.clone()),
            });
        }

        let task_id = extract_task_id(&body).ok_or(SubmissionError::MissingTaskId { body: text })?;

        tracing::info!(task_id = %task_id, model = %self.config.model, "Generation submitted");
        Ok(task_id)
    }

    /// Fetch the provider's raw record for a task.
    ///
    /// Sends `GET /api/v1/generate/record-info?taskId=...`.
    pub async fn fetch_record(&self, task_id: &TaskId) -> Result<Value, StatusError> {
        let response = self
            .client
            .get(format!("{}{RECORD_INFO_PATH}", self.config.base_url))
            .query(&[("taskId", task_id.as_str())])
            .bearer_auth(&self.config.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let body = crate::status::parse_json_response(response).await?;

        if let Some(code) = envelope_error_code(&body) {
            return Err(StatusError::HttpStatus {
                status: code,
                body: provider_message(&body).unwrap_or_else(|| body.to_string()),
            });
        }

        Ok(body)
    }

    // ---- private helpers ----

    fn validate_prompt<'a>(&self, prompt: &'a str) -> Result<&'a str, SubmissionError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SubmissionError::InvalidPrompt("prompt must not be empty".into()));
        }

        let limit = if self.config.custom_mode {
            CUSTOM_PROMPT_LIMIT
        } else {
            PROMPT_LIMIT
        };
        let length = prompt.chars().count();
        if length > limit {
            return Err(SubmissionError::InvalidPrompt(format!(
                "prompt is {length} characters, limit is {limit}"
            )));
        }

        Ok(prompt)
    }
}

/// Locate the provider-assigned task id in a submission response.
pub fn extract_task_id(body: &Value) -> Option<TaskId> {
    first_verbatim(body, TASK_ID_POINTERS).and_then(|raw| TaskId::parse(raw).ok())
}

/// The envelope `code`, when present and not 200.
///
/// The provider reports some failures (bad credentials, exhausted credits)
/// with HTTP 200 and an error code inside the body.
fn envelope_error_code(body: &Value) -> Option<u16> {
    body.get("code")
        .and_then(Value::as_u64)
        .filter(|code| *code != 200)
        .map(|code| u16::try_from(code).unwrap_or(u16::MAX))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
