//! Overlay image retrieval.
//!
//! Layers reference their overlay by URL. Before a request is compiled every
//! visible layer's image is fetched and measured; layers whose image cannot
//! be loaded are dropped from the request with a warning.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;

use carmod_core::error::CoreError;
use carmod_core::payload::{guess_mime, ImagePayload};
use carmod_core::placement::MeasuredImage;
use carmod_core::scene::OverlayLayer;
use carmod_core::types::LayerId;

/// Source of overlay image bytes.
#[async_trait]
pub trait BlobFetcher: Send + Sync {
    /// Fetch the image behind `url`. Failures are [`CoreError::Transfer`].
    async fn fetch(&self, url: &str) -> Result<ImagePayload, CoreError>;
}

/// Fetches overlays over HTTP(S); `data:` URLs are decoded in place.
#[derive(Clone, Default)]
pub struct HttpBlobFetcher {
    client: reqwest::Client,
}

impl HttpBlobFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobFetcher for HttpBlobFetcher {
    async fn fetch(&self, url: &str) -> Result<ImagePayload, CoreError> {
        if url.starts_with("data:") {
            return ImagePayload::from_data_url(url);
        }

        let transfer = |e: reqwest::Error| CoreError::Transfer(format!("GET {url}: {e}"));
        let response = self.client.get(url).send().await.map_err(transfer)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Transfer(format!(
                "GET {url} returned {}",
                status.as_u16()
            )));
        }

        let declared = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_string())
            .filter(|v| v.starts_with("image/"));
        let bytes = response.bytes().await.map_err(transfer)?.to_vec();
        if bytes.is_empty() {
            return Err(CoreError::Transfer(format!("GET {url} returned no data")));
        }

        let mime_type = declared.unwrap_or_else(|| guess_mime(&bytes));
        Ok(ImagePayload::new(mime_type, bytes))
    }
}

/// Fetch and measure every layer's overlay concurrently.
///
/// The result only holds layers whose image loaded and decoded.
pub async fn fetch_overlays(
    fetcher: &dyn BlobFetcher,
    layers: &[&OverlayLayer],
) -> HashMap<LayerId, MeasuredImage> {
    let loads = layers.iter().map(|layer| async move {
        let loaded = fetcher
            .fetch(&layer.source.url)
            .await
            .and_then(MeasuredImage::measure);
        (layer, loaded)
    });

    let mut measured = HashMap::with_capacity(layers.len());
    for (layer, loaded) in join_all(loads).await {
        match loaded {
            Ok(image) => {
                tracing::debug!(
                    layer_id = %layer.id,
                    bytes = image.payload.len(),
                    width = image.size.width,
                    height = image.size.height,
                    "Overlay loaded",
                );
                measured.insert(layer.id, image);
            }
            Err(e) => {
                tracing::warn!(
                    layer_id = %layer.id,
                    asset_id = %layer.source.asset_id,
                    error = %e,
                    "Skipping overlay that failed to load",
                );
            }
        }
    }
    measured
}
