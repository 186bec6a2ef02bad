//! Overlay scene model.
//!
//! A [`Scene`] is the ordered-by-insertion set of placed [`OverlayLayer`]s
//! plus at most one selected layer. Paint and interaction order is derived
//! by a stable sort on `z_order`, never from the storage order.
//!
//! Every mutation path clamps position into `[0, 1]²` and scale into
//! [`MIN_SCALE`, `MAX_SCALE`](crate::geometry::MAX_SCALE).

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geometry::{clamp_normalized, clamp_scale, Point};
use crate::types::LayerId;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Scale given to a layer created without an explicit scale.
pub const DEFAULT_LAYER_SCALE: f64 = 0.4;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What a layer shows: a reference to an external asset record and a URL the
/// overlay image can be fetched from. The layer never owns image bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSource {
    pub asset_id: String,
    pub url: String,
}

impl LayerSource {
    pub fn new(asset_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            url: url.into(),
        }
    }
}

/// One placed overlay instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayLayer {
    pub id: LayerId,
    pub source: LayerSource,
    /// Normalized center of the layer.
    pub position: Point,
    pub scale: f64,
    pub rotation_degrees: f64,
    pub z_order: i64,
    pub hidden: bool,
}

/// Partial update merged into a layer by [`Scene::update_layer`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerPatch {
    pub position: Option<Point>,
    pub scale: Option<f64>,
    pub rotation_degrees: Option<f64>,
    pub z_order: Option<i64>,
    pub hidden: Option<bool>,
}

impl LayerPatch {
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn scale(scale: f64) -> Self {
        Self {
            scale: Some(scale),
            ..Default::default()
        }
    }

    pub fn rotation(rotation_degrees: f64) -> Self {
        Self {
            rotation_degrees: Some(rotation_degrees),
            ..Default::default()
        }
    }
}

/// Direction for [`Scene::reorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderDirection {
    /// Swap with the neighbor directly above (paints later).
    Raise,
    /// Swap with the neighbor directly below (paints earlier).
    Lower,
}

/// The complete set of layers plus selection state for one editing session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    layers: Vec<OverlayLayer>,
    selected: Option<LayerId>,
}

// ---------------------------------------------------------------------------
// Scene operations
// ---------------------------------------------------------------------------

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Layers in insertion order.
    pub fn layers(&self) -> &[OverlayLayer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn get(&self, id: LayerId) -> Option<&OverlayLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn selected_id(&self) -> Option<LayerId> {
        self.selected
    }

    pub fn selected_layer(&self) -> Option<&OverlayLayer> {
        self.selected.and_then(|id| self.get(id))
    }

    /// The z-order a new top-most layer receives.
    pub fn next_z(&self) -> i64 {
        self.layers.iter().map(|l| l.z_order).max().unwrap_or(0) + 1
    }

    /// Place a new layer at `position` (default: canvas center) with the
    /// default scale, on top of every existing layer.
    pub fn add_layer(
        &mut self,
        source: LayerSource,
        position: Option<Point>,
    ) -> Result<LayerId, CoreError> {
        self.add_layer_scaled(source, position, DEFAULT_LAYER_SCALE)
    }

    /// Like [`add_layer`](Self::add_layer) with an explicit initial scale.
    pub fn add_layer_scaled(
        &mut self,
        source: LayerSource,
        position: Option<Point>,
        scale: f64,
    ) -> Result<LayerId, CoreError> {
        let id = uuid::Uuid::new_v4();
        let z_order = self.next_z();
        self.layers.push(OverlayLayer {
            id,
            source,
            position: clamp_normalized(position.unwrap_or(Point::CENTER)),
            scale: clamp_scale(scale),
            rotation_degrees: 0.0,
            z_order,
            hidden: false,
        });
        Ok(id)
    }

    /// Remove a layer, clearing the selection if it pointed at it.
    pub fn remove_layer(&mut self, id: LayerId) -> Result<OverlayLayer, CoreError> {
        let index = self.index_of(id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(self.layers.remove(index))
    }

    /// Select a layer, or clear the selection with `None`.
    pub fn set_selected(&mut self, id: Option<LayerId>) -> Result<(), CoreError> {
        if let Some(id) = id {
            self.index_of(id)?;
        }
        self.selected = id;
        Ok(())
    }

    /// Merge `patch` into a layer, clamping position and scale.
    pub fn update_layer(
        &mut self,
        id: LayerId,
        patch: LayerPatch,
    ) -> Result<&OverlayLayer, CoreError> {
        let index = self.index_of(id)?;
        let layer = &mut self.layers[index];

        if let Some(position) = patch.position {
            layer.position = clamp_normalized(position);
        }
        if let Some(scale) = patch.scale {
            layer.scale = clamp_scale(scale);
        }
        if let Some(rotation) = patch.rotation_degrees {
            if rotation.is_finite() {
                layer.rotation_degrees = rotation;
            }
        }
        if let Some(z) = patch.z_order {
            layer.z_order = z;
        }
        if let Some(hidden) = patch.hidden {
            layer.hidden = hidden;
        }

        Ok(&self.layers[index])
    }

    /// Swap z-order with the adjacent layer in z-sorted order.
    ///
    /// Returns `Ok(false)` when the layer is already at that end of the stack.
    pub fn reorder(&mut self, id: LayerId, direction: ReorderDirection) -> Result<bool, CoreError> {
        self.index_of(id)?;

        let sorted: Vec<usize> = self.z_sorted_indices();
        let Some(pos) = sorted.iter().position(|&i| self.layers[i].id == id) else {
            return Err(CoreError::LayerNotFound(id));
        };
        let neighbor = match direction {
            ReorderDirection::Raise => pos.checked_add(1).filter(|&n| n < sorted.len()),
            ReorderDirection::Lower => pos.checked_sub(1),
        };
        let Some(neighbor) = neighbor else {
            return Ok(false);
        };

        let (a, b) = (sorted[pos], sorted[neighbor]);
        let za = self.layers[a].z_order;
        self.layers[a].z_order = self.layers[b].z_order;
        self.layers[b].z_order = za;
        Ok(true)
    }

    /// Move a layer above every other layer.
    pub fn bring_to_front(&mut self, id: LayerId) -> Result<(), CoreError> {
        let index = self.index_of(id)?;
        let top = self
            .layers
            .iter()
            .filter(|l| l.id != id)
            .map(|l| l.z_order)
            .max();
        if let Some(top) = top {
            if self.layers[index].z_order <= top {
                self.layers[index].z_order = top + 1;
            }
        }
        Ok(())
    }

    /// Flip a layer's hidden flag, returning the new value.
    pub fn toggle_hidden(&mut self, id: LayerId) -> Result<bool, CoreError> {
        let index = self.index_of(id)?;
        let layer = &mut self.layers[index];
        layer.hidden = !layer.hidden;
        Ok(layer.hidden)
    }

    /// Remove every layer and the selection.
    pub fn clear(&mut self) {
        self.layers.clear();
        self.selected = None;
    }

    /// Layers in paint order: ascending z, ties broken by insertion order.
    pub fn layers_by_z(&self) -> Vec<&OverlayLayer> {
        self.z_sorted_indices()
            .into_iter()
            .map(|i| &self.layers[i])
            .collect()
    }

    /// Non-hidden layers in paint order.
    pub fn visible_layers(&self) -> Vec<&OverlayLayer> {
        self.layers_by_z().into_iter().filter(|l| !l.hidden).collect()
    }

    // ---- private helpers ----

    fn index_of(&self, id: LayerId) -> Result<usize, CoreError> {
        self.layers
            .iter()
            .position(|l| l.id == id)
            .ok_or(CoreError::LayerNotFound(id))
    }

    fn z_sorted_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.layers.len()).collect();
        // `sort_by_key` is stable, so equal z keeps insertion order.
        indices.sort_by_key(|&i| self.layers[i].z_order);
        indices
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
