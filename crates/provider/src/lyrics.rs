//! Lyric generation through an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use songbridge_core::config::{optional_var, var_or};
use songbridge_core::envelope::provider_message;

/// Default chat-completions endpoint.
pub const DEFAULT_LYRICS_URL: &str = "https://api.deepseek.com/v1/chat/completions";

pub const DEFAULT_LYRICS_MODEL: &str = "deepseek-chat";

const SYSTEM_PROMPT: &str = "你是一位精通中国乡村文化的作词家，请根据用户提供的乡村描述创作一首具有地方特色的歌曲。歌曲结构包含主歌、副歌和尾声。";

/// Language models can take a while on long songs.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct LyricsConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl LyricsConfig {
    /// Load lyric settings from the environment.
    ///
    /// Returns `None` when `LYRICS_API_KEY` is unset; lyric generation is
    /// then unavailable. `LYRICS_API_URL` and `LYRICS_MODEL` default to the
    /// DeepSeek endpoint and `deepseek-chat`.
    pub fn from_env() -> Option<Self> {
        let api_key = optional_var("LYRICS_API_KEY")?;
        Some(Self {
            api_url: var_or("LYRICS_API_URL", DEFAULT_LYRICS_URL),
            api_key,
            model: var_or("LYRICS_MODEL", DEFAULT_LYRICS_MODEL),
        })
    }

    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_LYRICS_MODEL.to_string(),
        }
    }
}

/// A generated song text with its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lyrics {
    pub title: String,
    pub lyrics: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LyricsError {
    #[error("Scene description must not be empty")]
    EmptyScene,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Lyrics endpoint returned {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Lyrics endpoint returned no content")]
    EmptyCompletion,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct LyricsApi {
    client: reqwest::Client,
    config: LyricsConfig,
}

impl LyricsApi {
    pub fn new(config: LyricsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_client(client: reqwest::Client, config: LyricsConfig) -> Self {
        Self { client, config }
    }

    /// Write a song about `scene` and derive its title.
    pub async fn generate(&self, scene: &str) -> Result<Lyrics, LyricsError> {
        let scene = scene.trim();
        if scene.is_empty() {
            return Err(LyricsError::EmptyScene);
        }

        let user_prompt = format!("请依据此创作音乐歌词歌名：{scene}");
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| provider_message(&body))
                .unwrap_or(text);
            return Err(LyricsError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        let lyrics = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LyricsError::EmptyCompletion)?;

        let title = extract_title(&lyrics, scene);
        tracing::info!(%title, chars = lyrics.chars().count(), "Lyrics generated");

        Ok(Lyrics { title, lyrics })
    }
}

/// The song title: the first line of the lyrics, unwrapped from `【…】`
/// when it is enclosed in them, or `{scene}之歌` when that line is blank.
pub fn extract_title(lyrics: &str, scene: &str) -> String {
    let first_line = lyrics.lines().next().unwrap_or_default().trim();

    let title = first_line
        .strip_prefix('【')
        .and_then(|rest| rest.strip_suffix('】'))
        .filter(|inner| !inner.is_empty())
        .unwrap_or(first_line);

    if title.is_empty() {
        format!("{scene}之歌")
    } else {
        title.to_string()
    }
}
