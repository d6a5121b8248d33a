use songbridge_core::config::{parse_var, required_var, var_or, ConfigError};

/// Default provider API root.
pub const DEFAULT_BASE_URL: &str = "https://api.sunoapi.org";

/// Default model selector sent with every generation request.
pub const DEFAULT_MODEL: &str = "V3_5";

/// Connection and request settings for the generation provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API root, e.g. `https://api.sunoapi.org` (no trailing slash).
    pub base_url: String,
    /// Bearer token sent on every request.
    pub api_key: String,
    pub model: String,
    /// When set, `style` and `title` are honoured and the prompt is used
    /// as lyrics; otherwise the prompt is a free-form description.
    pub custom_mode: bool,
    pub instrumental: bool,
}

impl ProviderConfig {
    /// Load provider settings from the environment.
    ///
    /// | Env Var             | Default                    |
    /// |---------------------|----------------------------|
    /// | `SUNO_API_BASE_URL` | `https://api.sunoapi.org`  |
    /// | `SUNO_API_KEY`      | required                   |
    /// | `SUNO_MODEL`        | `V3_5`                     |
    /// | `SUNO_CUSTOM_MODE`  | `false`                    |
    /// | `SUNO_INSTRUMENTAL` | `false`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: var_or("SUNO_API_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: required_var("SUNO_API_KEY")?,
            model: var_or("SUNO_MODEL", DEFAULT_MODEL),
            custom_mode: parse_var("SUNO_CUSTOM_MODE", false)?,
            instrumental: parse_var("SUNO_INSTRUMENTAL", false)?,
        })
    }

    /// Settings pointing at `base_url` with defaults for everything else.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            custom_mode: false,
            instrumental: false,
        }
    }
}
