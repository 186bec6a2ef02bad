//! Seam between the studio and the generation service.

use async_trait::async_trait;

use carmod_core::placement::GenerationRequest;

use crate::api::{GeminiApi, GeminiError};
use crate::messages::GenerationOutput;

/// Anything that can turn a compiled request into one edited image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, GeminiError>;
}

#[async_trait]
impl ImageGenerator for GeminiApi {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationOutput, GeminiError> {
        GeminiApi::generate(self, request).await
    }
}
