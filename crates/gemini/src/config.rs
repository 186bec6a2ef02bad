//! Connection settings for the Gemini generation endpoint.

/// Default REST endpoint root.
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";

/// Default image-capable model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";

/// Default transport timeout for one generation call, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Errors raised while loading [`GeminiConfig`].
#[derive(Debug, thiserror::Error)]
pub enum GeminiConfigError {
    #[error("Server misconfigured: GEMINI_API_KEY is missing")]
    MissingApiKey,

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Gemini client configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Endpoint root without a trailing slash.
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GeminiConfig {
    /// Config with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Point the client at another endpoint root (used by tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var               | Default                                      |
    /// |-----------------------|----------------------------------------------|
    /// | `GEMINI_API_KEY`      | required                                     |
    /// | `GEMINI_API_URL`      | `https://generativelanguage.googleapis.com`  |
    /// | `GEMINI_IMAGE_MODEL`  | `gemini-2.5-flash-image-preview`             |
    /// | `GEMINI_TIMEOUT_SECS` | `120`                                        |
    pub fn from_env() -> Result<Self, GeminiConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GeminiConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(GeminiConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);

        if let Some(url) = lookup("GEMINI_API_URL").filter(|v| !v.trim().is_empty()) {
            config = config.with_api_url(url.trim());
        }
        if let Some(model) = lookup("GEMINI_IMAGE_MODEL").filter(|v| !v.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = lookup("GEMINI_TIMEOUT_SECS") {
            config.timeout_secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| GeminiConfigError::InvalidValue {
                    var: "GEMINI_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
        }

        Ok(config)
    }

    /// Full URL of the `generateContent` endpoint for the configured model.
    pub fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        )
    }
}
