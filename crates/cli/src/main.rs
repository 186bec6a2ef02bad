//! `carmod-integrate` -- bake placed overlays into a vehicle photo.
//!
//! ```text
//! carmod-integrate <scene.json> <output-image>
//! ```
//!
//! Reads a scene file (see [`scene_file`]), integrates every visible
//! overlay into the base image with one generation call, and writes the
//! reconciled result. With no visible overlays but a prompt, a plain
//! prompt edit is performed instead.
//!
//! # Environment variables
//!
//! | Variable              | Required | Default                                     |
//! |-----------------------|----------|---------------------------------------------|
//! | `GEMINI_API_KEY`      | yes      | --                                          |
//! | `GEMINI_API_URL`      | no       | `https://generativelanguage.googleapis.com` |
//! | `GEMINI_IMAGE_MODEL`  | no       | `gemini-2.5-flash-image-preview`            |
//! | `GEMINI_TIMEOUT_SECS` | no       | `120`                                       |

mod scene_file;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use async_trait::async_trait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carmod_core::error::CoreError;
use carmod_core::payload::ImagePayload;
use carmod_gemini::{GeminiApi, GeminiConfig};
use carmod_pipeline::{BlobFetcher, HttpBlobFetcher, Studio, StudioConfig};

use crate::scene_file::SceneFile;

/// Resolves overlay URLs: `http(s)` and `data:` go through
/// [`HttpBlobFetcher`], anything else is a path relative to the scene file.
struct SceneFetcher {
    http: HttpBlobFetcher,
    root: PathBuf,
}

#[async_trait]
impl BlobFetcher for SceneFetcher {
    async fn fetch(&self, url: &str) -> Result<ImagePayload, CoreError> {
        if url.starts_with("http://") || url.starts_with("https://") || url.starts_with("data:") {
            return self.http.fetch(url).await;
        }
        let path = self.root.join(url.trim_start_matches("file://"));
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CoreError::Transfer(format!("{}: {e}", path.display())))?;
        Ok(ImagePayload::sniffed(bytes))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carmod_cli=debug,carmod_pipeline=debug,carmod_gemini=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [scene_path, output_path] = args.as_slice() else {
        bail!("usage: carmod-integrate <scene.json> <output-image>");
    };
    let scene_path = Path::new(scene_path);
    let root = scene_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let scene_json = tokio::fs::read_to_string(scene_path)
        .await
        .with_context(|| format!("reading {}", scene_path.display()))?;
    let scene_file = SceneFile::parse(&scene_json)
        .with_context(|| format!("parsing {}", scene_path.display()))?;

    let config = GeminiConfig::from_env()?;
    tracing::info!(model = %config.model, api_url = %config.api_url, "Gemini client configured");
    let generator = GeminiApi::new(config)?;
    let fetcher = SceneFetcher {
        http: HttpBlobFetcher::new(),
        root: root.clone(),
    };

    let mut studio = Studio::new(StudioConfig {
        progressive: scene_file.progressive,
    });

    let base_path = scene_file.base_image_path(&root);
    let base_bytes = tokio::fs::read(&base_path)
        .await
        .with_context(|| format!("reading base image {}", base_path.display()))?;
    let base_size = studio.set_base_image(ImagePayload::sniffed(base_bytes))?;
    scene_file.populate(studio.scene_mut())?;

    tracing::info!(
        width = base_size.width,
        height = base_size.height,
        layers = studio.scene().len(),
        visible = studio.scene().visible_layers().len(),
        "Scene loaded",
    );

    let prompt = scene_file.prompt.as_deref().filter(|p| !p.trim().is_empty());
    let has_visible = !studio.scene().visible_layers().is_empty();
    let outcome = match (has_visible, prompt) {
        (true, _) => studio.integrate(&fetcher, &generator, prompt).await?,
        (false, Some(prompt)) => studio.prompt_edit(&fetcher, &generator, prompt).await?,
        (false, None) => bail!("scene has no visible overlays and no prompt"),
    };

    if !outcome.result.text.is_empty() {
        tracing::info!(text = %outcome.result.text, "Model commentary");
    }
    tokio::fs::write(output_path, &outcome.result.image.bytes)
        .await
        .with_context(|| format!("writing {output_path}"))?;

    tracing::info!(
        output = %output_path,
        bytes = outcome.result.image.len(),
        reconciled = outcome.result.reconciled,
        "Result written",
    );
    Ok(())
}
