//! REST client for the Gemini `generateContent` endpoint.
//!
//! One call per request: no retries, caching or rate limiting. Transport
//! timeouts come from [`GeminiConfig::timeout_secs`].

use std::time::Duration;

use carmod_core::assets::AssetGenerationRequest;
use carmod_core::placement::GenerationRequest;

use crate::config::GeminiConfig;
use crate::messages::{
    parse_output, ErrorEnvelope, GenerateContentRequest, GenerateContentResponse, GeneratedAsset,
    GenerationOutput,
};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Errors from the generation service boundary.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// Transport failure or non-2xx status. `status` is absent when no
    /// response was received.
    #[error("Generation service error{}: {message}", status_suffix(.status))]
    Service { status: Option<u16>, message: String },

    /// The service answered without any image part. `finish_reason` is the
    /// candidate's stop reason when one was given (e.g. `SAFETY`).
    #[error("No image returned from model{}", reason_suffix(.finish_reason))]
    NoImageReturned {
        text: String,
        finish_reason: Option<String>,
    },

    /// The service answered 2xx with a body that could not be used.
    #[error("Malformed generation response: {0}")]
    MalformedResponse(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" (finish reason: {r})"))
        .unwrap_or_default()
}

impl From<reqwest::Error> for GeminiError {
    fn from(err: reqwest::Error) -> Self {
        GeminiError::Service {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// HTTP client for the Gemini image model.
pub struct GeminiApi {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiApi {
    /// Build a client with the configured transport timeout.
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Send an integration or prompt-edit request and return the edited image.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GeminiError> {
        tracing::info!(
            model = %self.config.model,
            overlays = request.overlays.len(),
            base_bytes = request.base.len(),
            "Dispatching image edit request",
        );

        let body = GenerateContentRequest::integration(request);
        let output = parse_output(self.send(&body).await?)?;

        tracing::debug!(
            image_bytes = output.image.len(),
            text_len = output.text.len(),
            "Image edit response received",
        );
        Ok(output)
    }

    /// Generate one transparent-background overlay asset.
    pub async fn generate_asset(
        &self,
        request: &AssetGenerationRequest,
    ) -> Result<GeneratedAsset, GeminiError> {
        tracing::info!(
            model = %self.config.model,
            category = %request.category,
            has_reference = request.reference.is_some(),
            "Dispatching asset generation request",
        );

        let body = GenerateContentRequest::asset(request);
        let asset = GeneratedAsset::from(parse_output(self.send(&body).await?)?);

        tracing::debug!(
            image_bytes = asset.image.len(),
            width = asset.size.map(|s| s.width),
            height = asset.size.map(|s| s.height),
            "Asset generation response received",
        );
        Ok(asset)
    }

    // ---- private helpers ----

    async fn send(
        &self,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let response = self
            .client
            .post(self.config.generate_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code. On failure the
    /// service's own error message is used when the body carries one.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, GeminiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .ok()
                .filter(|m| !m.is_empty())
                .unwrap_or(body);
            tracing::warn!(status = status.as_u16(), %message, "Generation service returned an error");
            return Err(GeminiError::Service {
                status: Some(status.as_u16()),
                message,
            });
        }
        Ok(response)
    }

    async fn parse_response(
        response: reqwest::Response,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| GeminiError::MalformedResponse(e.to_string()))
    }
}
