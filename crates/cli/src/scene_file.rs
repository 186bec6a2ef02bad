//! Scene description file read by `carmod-integrate`.
//!
//! ```json
//! {
//!   "baseImage": "car.jpg",
//!   "prompt": "keep the chrome reflections",
//!   "progressive": true,
//!   "overlays": [
//!     { "assetId": "rim-01", "url": "parts/rim.png", "x": 0.31, "y": 0.72,
//!       "scale": 0.4, "rotation": 0, "z": 1, "hidden": false }
//!   ]
//! }
//! ```
//!
//! Relative paths resolve against the scene file's directory.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use carmod_core::error::CoreError;
use carmod_core::geometry::Point;
use carmod_core::scene::{LayerPatch, LayerSource, Scene, DEFAULT_LAYER_SCALE};

fn default_scale() -> f64 {
    DEFAULT_LAYER_SCALE
}

fn default_progressive() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFile {
    pub base_image: PathBuf,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default = "default_progressive")]
    pub progressive: bool,
    #[serde(default)]
    pub overlays: Vec<OverlayEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayEntry {
    #[serde(default)]
    pub asset_id: String,
    pub url: String,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub z: Option<i64>,
    #[serde(default)]
    pub hidden: bool,
}

impl SceneFile {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Base image path, resolved against `dir`.
    pub fn base_image_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.base_image)
    }

    /// Place every overlay entry into `scene`, in file order.
    pub fn populate(&self, scene: &mut Scene) -> Result<(), CoreError> {
        for entry in &self.overlays {
            let source = LayerSource::new(entry.asset_id.clone(), entry.url.clone());
            let id = scene.add_layer_scaled(source, Some(Point::new(entry.x, entry.y)), entry.scale)?;
            scene.update_layer(
                id,
                LayerPatch {
                    rotation_degrees: Some(entry.rotation),
                    z_order: entry.z,
                    hidden: Some(entry.hidden),
                    ..Default::default()
                },
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "baseImage": "car.jpg",
        "overlays": [
            { "assetId": "rim", "url": "rim.png", "x": 0.5, "y": 0.5, "scale": 0.5, "rotation": 15, "z": 4 },
            { "url": "https://blobs.test/wing.png", "x": 1.4, "y": 0.1, "hidden": true }
        ]
    }"#;

    #[test]
    fn defaults_are_filled_in() {
        let file = SceneFile::parse(SAMPLE).unwrap();
        assert!(file.progressive);
        assert_eq!(file.prompt, None);
        assert_eq!(file.overlays[1].scale, DEFAULT_LAYER_SCALE);
        assert_eq!(file.overlays[1].z, None);
        assert_eq!(
            file.base_image_path(Path::new("/scenes")),
            PathBuf::from("/scenes/car.jpg")
        );
    }

    #[test]
    fn populate_applies_transform_and_clamps() {
        let file = SceneFile::parse(SAMPLE).unwrap();
        let mut scene = Scene::new();
        file.populate(&mut scene).unwrap();

        let layers = scene.layers();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0].rotation_degrees, 15.0);
        assert_eq!(layers[0].z_order, 4);
        assert_eq!(layers[1].position, Point::new(1.0, 0.1));
        assert!(layers[1].hidden);
        assert_eq!(scene.visible_layers().len(), 1);
    }
}
