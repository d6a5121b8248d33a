use std::time::Duration;

use songbridge_core::callback::CALLBACK_PATH;
use songbridge_core::config::{parse_var, var_or, ConfigError};
use songbridge_provider::lyrics::LyricsConfig;
use songbridge_provider::poller::{PollConfig, DEFAULT_INTERVAL, DEFAULT_MAX_ATTEMPTS};
use songbridge_provider::ProviderConfig;

/// Server configuration loaded from environment variables.
///
/// Everything except the provider key has a default suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Externally reachable root of this server, used to build the callback
    /// URL handed to the provider.
    pub public_base_url: String,
    /// Budget for the server-side completion watcher.
    pub poll: PollConfig,
    pub provider: ProviderConfig,
    /// `None` disables `POST /api/v1/lyrics`.
    pub lyrics: Option<LyricsConfig>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `PUBLIC_BASE_URL`      | `http://localhost:3000`    |
    /// | `POLL_INTERVAL_MS`     | `5000`                     |
    /// | `POLL_MAX_ATTEMPTS`    | `18`                       |
    ///
    /// Provider settings come from [`ProviderConfig::from_env`] and lyric
    /// settings from [`LyricsConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = var_or("HOST", "0.0.0.0");
        let port: u16 = parse_var("PORT", 3000)?;

        let cors_origins: Vec<String> = var_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", 30)?;

        let public_base_url = var_or("PUBLIC_BASE_URL", &format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let interval_ms: u64 =
            parse_var("POLL_INTERVAL_MS", DEFAULT_INTERVAL.as_millis() as u64)?;
        let max_attempts: u32 = parse_var("POLL_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            public_base_url,
            poll: PollConfig::new(Duration::from_millis(interval_ms), max_attempts),
            provider: ProviderConfig::from_env()?,
            lyrics: LyricsConfig::from_env(),
        })
    }

    /// Full URL the provider should post completion events to.
    pub fn callback_url(&self) -> String {
        format!("{}{CALLBACK_PATH}", self.public_base_url)
    }
}
