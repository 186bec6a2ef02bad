//! Binary image payloads exchanged with the blob store and the generation
//! service.
//!
//! A payload is raw bytes plus a declared mime type. Payloads travel as
//! `data:<mime>;base64,<data>` URLs or bare base64 strings at the edges.

use std::io::Cursor;
use std::sync::LazyLock;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use regex::Regex;

use crate::error::CoreError;
use crate::geometry::PixelSize;

/// Mime type assumed when none is declared or detectable.
pub const DEFAULT_MIME_TYPE: &str = "image/png";

/// Largest accepted base image (10 MiB).
pub const MAX_BASE_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Splits a `data:` URL into mime type and base64 body.
static DATA_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:(.*?);base64,(.*)$").expect("valid regex"));

/// Image bytes plus their mime type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Wrap bytes, sniffing the mime type from the content.
    pub fn sniffed(bytes: Vec<u8>) -> Self {
        let mime_type = guess_mime(&bytes);
        Self { mime_type, bytes }
    }

    /// Decode a base64 string with an explicit mime type.
    pub fn from_base64(mime_type: impl Into<String>, data: &str) -> Result<Self, CoreError> {
        let bytes = BASE64
            .decode(data.trim())
            .map_err(|e| CoreError::Transfer(format!("Invalid base64 image data: {e}")))?;
        Ok(Self::new(mime_type, bytes))
    }

    /// Parse a `data:` URL, or a bare base64 string (assumed PNG).
    pub fn from_data_url(value: &str) -> Result<Self, CoreError> {
        match DATA_URL_RE.captures(value) {
            Some(caps) => {
                let mime = caps
                    .get(1)
                    .map(|m| m.as_str())
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_MIME_TYPE);
                let data = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
                Self::from_base64(mime, data)
            }
            None => Self::from_base64(DEFAULT_MIME_TYPE, value),
        }
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Intrinsic pixel size, read from the image header only.
    pub fn dimensions(&self) -> Result<PixelSize, CoreError> {
        let reader = image::ImageReader::new(Cursor::new(&self.bytes))
            .with_guessed_format()
            .map_err(|e| CoreError::Transfer(format!("Unreadable image: {e}")))?;
        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| CoreError::Transfer(format!("Unreadable image header: {e}")))?;
        Ok(PixelSize::new(width, height))
    }
}

/// Best-effort mime type from magic bytes.
pub fn guess_mime(bytes: &[u8]) -> String {
    image::guess_format(bytes)
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|_| DEFAULT_MIME_TYPE.to_string())
}

/// Validate a base image payload before it is used for generation.
pub fn validate_base_image(payload: &ImagePayload) -> Result<(), CoreError> {
    if payload.is_empty() {
        return Err(CoreError::Validation("Base image is empty".to_string()));
    }
    if payload.len() > MAX_BASE_IMAGE_BYTES {
        return Err(CoreError::Validation(format!(
            "Image is too large ({} bytes, max {MAX_BASE_IMAGE_BYTES})",
            payload.len()
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn data_url_round_trip_keeps_mime_and_bytes() {
        let payload = ImagePayload::new("image/jpeg", vec![1, 2, 3, 4]);
        let parsed = ImagePayload::from_data_url(&payload.to_data_url()).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn bare_base64_is_treated_as_png() {
        let parsed = ImagePayload::from_data_url("AQID").unwrap();
        assert_eq!(parsed.mime_type, DEFAULT_MIME_TYPE);
        assert_eq!(parsed.bytes, vec![1, 2, 3]);
    }

    #[test]
    fn invalid_base64_is_a_transfer_error() {
        assert_matches!(
            ImagePayload::from_data_url("data:image/png;base64,@@@"),
            Err(CoreError::Transfer(_))
        );
    }

    #[test]
    fn dimensions_are_read_from_header() {
        let payload = ImagePayload::sniffed(test_images::png(40, 30));
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.dimensions().unwrap(), PixelSize::new(40, 30));
    }

    #[test]
    fn garbage_has_no_dimensions() {
        let payload = ImagePayload::new("image/png", b"not an image".to_vec());
        assert_matches!(payload.dimensions(), Err(CoreError::Transfer(_)));
        assert_eq!(guess_mime(b"not an image"), DEFAULT_MIME_TYPE);
    }

    #[test]
    fn base_image_size_limit() {
        assert!(validate_base_image(&ImagePayload::new("image/png", vec![0; 16])).is_ok());
        assert_matches!(
            validate_base_image(&ImagePayload::new("image/png", Vec::new())),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_base_image(&ImagePayload::new("image/png", vec![0; MAX_BASE_IMAGE_BYTES + 1])),
            Err(CoreError::Validation(_))
        );
    }
}
