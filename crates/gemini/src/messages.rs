//! Gemini `generateContent` wire types and response parsing.
//!
//! Requests carry one user turn whose parts are inline images and text.
//! Responses carry candidates whose parts may be text, inline image data,
//! or both. Keys are camelCase on the wire.

use serde::{Deserialize, Serialize};

use carmod_core::assets::AssetGenerationRequest;
use carmod_core::geometry::PixelSize;
use carmod_core::payload::{guess_mime, ImagePayload};
use carmod_core::placement::GenerationRequest;

use crate::api::GeminiError;

/// Response modality requested for image edits.
pub const MODALITY_IMAGE: &str = "IMAGE";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Body of a `generateContent` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// One conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A text or inline-data part. Unknown part kinds deserialize as empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn image(payload: &ImagePayload) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: payload.mime_type.clone(),
                data: payload.to_base64(),
            }),
        }
    }
}

/// Base64 image data with its mime type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

impl GenerateContentRequest {
    /// Overlay images first, then the base image, then the instruction.
    pub fn integration(request: &GenerationRequest) -> Self {
        let mut parts: Vec<Part> = request.overlays.iter().map(Part::image).collect();
        parts.push(Part::image(&request.base));
        parts.push(Part::text(request.instruction.clone()));

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec![MODALITY_IMAGE.to_string()],
            }),
        }
    }

    /// Instruction first, then the optional reference image.
    pub fn asset(request: &AssetGenerationRequest) -> Self {
        let mut parts = vec![Part::text(request.instruction())];
        if let Some(reference) = &request.reference {
            parts.push(Part::image(reference));
        }

        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Error envelope returned with non-2xx statuses. Only the message is
/// used; the HTTP status comes from the response itself.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// One edited image plus any advisory text the model returned.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    pub image: ImagePayload,
    pub text: String,
}

/// A generated overlay asset.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAsset {
    pub image: ImagePayload,
    /// Measured from the image header when decodable.
    pub size: Option<PixelSize>,
    pub text: String,
}

impl From<GenerationOutput> for GeneratedAsset {
    fn from(output: GenerationOutput) -> Self {
        let size = output.image.dimensions().ok();
        Self {
            image: output.image,
            size,
            text: output.text,
        }
    }
}

/// Extract the output image from the first candidate.
///
/// Text parts are concatenated; when several parts carry image data the
/// last one wins. A response without image data yields
/// [`GeminiError::NoImageReturned`] carrying the text.
pub fn parse_output(response: GenerateContentResponse) -> Result<GenerationOutput, GeminiError> {
    let (parts, finish_reason) = match response.candidates.into_iter().next() {
        Some(candidate) => (
            candidate.content.map(|c| c.parts).unwrap_or_default(),
            candidate.finish_reason,
        ),
        None => (Vec::new(), None),
    };

    let mut text = String::new();
    let mut image: Option<InlineData> = None;
    for part in parts {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(inline) = part.inline_data.filter(|d| !d.data.is_empty()) {
            image = Some(inline);
        }
    }

    let Some(inline) = image else {
        return Err(GeminiError::NoImageReturned {
            text,
            finish_reason,
        });
    };

    let mut payload = ImagePayload::from_base64("", &inline.data)
        .map_err(|e| GeminiError::MalformedResponse(e.to_string()))?;
    payload.mime_type = if inline.mime_type.is_empty() {
        guess_mime(&payload.bytes)
    } else {
        inline.mime_type
    };

    Ok(GenerationOutput {
        image: payload,
        text,
    })
}
