//! Placement compiler.
//!
//! Turns the visible layers of a [`Scene`] plus measured image sizes into a
//! resolution-independent [`PlacementDescriptor`], and bundles it with the
//! image payloads and instruction text into a [`GenerationRequest`].
//!
//! No I/O happens here: callers fetch and measure the images first. A layer
//! whose overlay could not be fetched or measured is simply left out.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geometry::{normalized_to_pixel, round_to, PixelSize};
use crate::instruction::integration_instruction;
use crate::payload::{validate_base_image, ImagePayload};
use crate::scene::{OverlayLayer, Scene};
use crate::types::LayerId;

/// Decimal places kept for normalized coordinates.
pub const NORMALIZED_DECIMALS: i32 = 4;

/// Decimal places kept for scale factors.
pub const SCALE_DECIMALS: i32 = 3;

// ---------------------------------------------------------------------------
// Descriptor types
// ---------------------------------------------------------------------------

/// Placement of one visible overlay, in both normalized and pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPlacement {
    /// Position of this overlay's image in the request's overlay list.
    pub index: usize,
    pub x_norm: f64,
    pub y_norm: f64,
    pub x_px: i64,
    pub y_px: i64,
    pub scale: f64,
    pub rotation_deg: i64,
    pub z: i64,
    pub overlay_natural_size: PixelSize,
    pub target_approx_pixel_size: PixelSize,
    #[serde(skip)]
    pub layer_id: Option<LayerId>,
}

/// Compiled placement of every visible, loadable overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementDescriptor {
    pub base_image: PixelSize,
    pub overlays: Vec<OverlayPlacement>,
}

impl PlacementDescriptor {
    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    /// Compact JSON form embedded in the instruction text.
    pub fn to_json(&self) -> String {
        // Serializing plain structs of numbers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// An image together with its measured intrinsic size.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredImage {
    pub payload: ImagePayload,
    pub size: PixelSize,
}

impl MeasuredImage {
    /// Measure a payload from its header.
    pub fn measure(payload: ImagePayload) -> Result<Self, CoreError> {
        let size = payload.dimensions()?;
        Ok(Self { payload, size })
    }
}

/// Everything the remote generation client needs for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub base: ImagePayload,
    /// Overlay images, in the order referenced by `OverlayPlacement::index`.
    pub overlays: Vec<ImagePayload>,
    pub instruction: String,
    pub placement: Option<PlacementDescriptor>,
}

// ---------------------------------------------------------------------------
// Compilation
// ---------------------------------------------------------------------------

fn place(index: usize, layer: &OverlayLayer, base: PixelSize, natural: PixelSize) -> OverlayPlacement {
    let pixel = normalized_to_pixel(layer.position, base);
    let target = |dim: u32| (f64::from(dim) * layer.scale).round().max(1.0) as u32;

    OverlayPlacement {
        index,
        x_norm: round_to(layer.position.x, NORMALIZED_DECIMALS),
        y_norm: round_to(layer.position.y, NORMALIZED_DECIMALS),
        x_px: pixel.x.round() as i64,
        y_px: pixel.y.round() as i64,
        scale: round_to(layer.scale, SCALE_DECIMALS),
        rotation_deg: layer.rotation_degrees.round() as i64,
        z: layer.z_order,
        overlay_natural_size: natural,
        target_approx_pixel_size: PixelSize::new(target(natural.width), target(natural.height)),
        layer_id: Some(layer.id),
    }
}

/// Compile the visible layers into a descriptor.
///
/// Layers are emitted in paint order (ascending z). Hidden layers and layers
/// with no entry in `natural_sizes` are skipped; `index` counts only the
/// emitted overlays.
pub fn compile_placement(
    scene: &Scene,
    base: PixelSize,
    natural_sizes: &HashMap<LayerId, PixelSize>,
) -> PlacementDescriptor {
    let overlays = scene
        .visible_layers()
        .into_iter()
        .filter_map(|layer| natural_sizes.get(&layer.id).map(|size| (layer, *size)))
        .enumerate()
        .map(|(index, (layer, natural))| place(index, layer, base, natural))
        .collect();

    PlacementDescriptor {
        base_image: base,
        overlays,
    }
}

/// Ensure the scene has something to integrate. Runs before any I/O.
pub fn validate_integration(scene: &Scene) -> Result<(), CoreError> {
    if scene.visible_layers().is_empty() {
        return Err(CoreError::Validation(
            "Place at least one visible overlay before integrating".to_string(),
        ));
    }
    Ok(())
}

/// Assemble the full integration request.
///
/// `overlays` holds the fetched, measured overlay images keyed by layer;
/// missing entries are layers whose transfer failed.
pub fn compile_request(
    scene: &Scene,
    base: &MeasuredImage,
    overlays: &HashMap<LayerId, MeasuredImage>,
    prompt: Option<&str>,
) -> Result<GenerationRequest, CoreError> {
    validate_integration(scene)?;
    validate_base_image(&base.payload)?;

    let sizes: HashMap<LayerId, PixelSize> =
        overlays.iter().map(|(id, img)| (*id, img.size)).collect();
    let descriptor = compile_placement(scene, base.size, &sizes);
    if descriptor.is_empty() {
        return Err(CoreError::Validation(
            "None of the placed overlays could be loaded".to_string(),
        ));
    }

    let payloads = descriptor
        .overlays
        .iter()
        .filter_map(|p| p.layer_id.and_then(|id| overlays.get(&id)))
        .map(|img| img.payload.clone())
        .collect::<Vec<_>>();

    let instruction = integration_instruction(Some(&descriptor), payloads.len(), prompt);
    Ok(GenerationRequest {
        base: base.payload.clone(),
        overlays: payloads,
        instruction,
        placement: Some(descriptor),
    })
}

/// Assemble a plain prompt edit of the base image (no overlays).
pub fn compile_prompt_request(base: &ImagePayload, prompt: &str) -> Result<GenerationRequest, CoreError> {
    if prompt.trim().is_empty() {
        return Err(CoreError::Validation("Please enter a prompt".to_string()));
    }
    validate_base_image(base)?;

    Ok(GenerationRequest {
        base: base.clone(),
        overlays: Vec::new(),
        instruction: integration_instruction(None, 0, Some(prompt)),
        placement: None,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
