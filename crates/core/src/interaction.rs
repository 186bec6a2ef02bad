//! Pointer, wheel and keyboard interaction with the overlay scene.
//!
//! [`InteractionController`] owns the canvas zoom and a single active
//! [`Gesture`]. Gestures are entered through the `begin_*` operations,
//! advanced with [`pointer_move`](InteractionController::pointer_move), and
//! always left through [`pointer_up`](InteractionController::pointer_up),
//! which commits whatever the last move applied. Losing pointer capture is
//! reported the same way as a pointer-up.
//!
//! The controller borrows the [`Scene`] per call; it never stores layer data
//! beyond the gesture baseline.

use crate::error::CoreError;
use crate::geometry::{
    compose_rotation, compose_scale, normalized_to_screen, pointer_distance_ratio, polar_around,
    screen_delta_to_normalized, screen_to_normalized, step_zoom, Point, Polar, Rect,
    DEFAULT_ZOOM,
};
use crate::scene::{LayerPatch, LayerSource, Scene, DEFAULT_LAYER_SCALE};
use crate::types::LayerId;

// ---------------------------------------------------------------------------
// Step sizes
// ---------------------------------------------------------------------------

/// Arrow-key nudge in normalized units.
pub const NUDGE_STEP: f64 = 0.005;

/// Arrow-key nudge with Shift held.
pub const NUDGE_STEP_COARSE: f64 = 0.02;

/// Scale change per wheel notch or `+`/`-` press.
pub const SCALE_STEP: f64 = 0.05;

/// Rotation per Shift+wheel notch, in degrees.
pub const WHEEL_ROTATION_STEP: f64 = 5.0;

/// Rotation per `r`/`R` press, in degrees.
pub const KEY_ROTATION_STEP: f64 = 15.0;

/// Zoom change per Ctrl+wheel notch.
pub const ZOOM_STEP: f64 = 0.1;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Modifier keys held during an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        ctrl: false,
    };
    pub const CTRL: Modifiers = Modifiers {
        shift: false,
        ctrl: true,
    };
}

/// Keys the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Plus,
    Minus,
    Rotate,
    Delete,
    Other,
}

impl Key {
    /// Map a DOM-style key name (`"ArrowLeft"`, `"+"`, `"r"`, ...).
    pub fn from_name(name: &str) -> Self {
        match name {
            "ArrowLeft" => Self::ArrowLeft,
            "ArrowRight" => Self::ArrowRight,
            "ArrowUp" => Self::ArrowUp,
            "ArrowDown" => Self::ArrowDown,
            "+" | "=" => Self::Plus,
            "-" => Self::Minus,
            "r" | "R" => Self::Rotate,
            "Delete" | "Backspace" => Self::Delete,
            _ => Self::Other,
        }
    }
}

/// Transform handles drawn around the selected layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// The knob above the layer.
    Rotate,
}

/// What an input event did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEffect {
    Ignored,
    LayerUpdated(LayerId),
    LayerRemoved(LayerId),
    ZoomChanged(f64),
}

// ---------------------------------------------------------------------------
// Gesture state
// ---------------------------------------------------------------------------

/// Baseline captured when a drag starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragBaseline {
    pub layer: LayerId,
    pub start_pointer: Point,
    pub start_position: Point,
}

/// Baseline captured when a resize or rotate starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformBaseline {
    pub layer: LayerId,
    /// Layer center in screen space at gesture start.
    pub center: Point,
    pub start_scale: f64,
    pub start_rotation: f64,
    pub start_pointer: Polar,
}

/// The single active pointer gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Gesture {
    #[default]
    None,
    Dragging(DragBaseline),
    Resizing(TransformBaseline),
    Rotating(TransformBaseline),
}

impl Gesture {
    /// The layer the gesture acts on, if any.
    pub fn layer(&self) -> Option<LayerId> {
        match self {
            Self::None => None,
            Self::Dragging(d) => Some(d.layer),
            Self::Resizing(t) | Self::Rotating(t) => Some(t.layer),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Gesture state machine plus canvas zoom.
#[derive(Debug, Clone)]
pub struct InteractionController {
    gesture: Gesture,
    zoom: f64,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self {
            gesture: Gesture::None,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::None
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Adjust zoom by `delta`, clamped to the zoom bounds.
    pub fn zoom_by(&mut self, delta: f64) -> f64 {
        self.zoom = step_zoom(self.zoom, delta);
        self.zoom
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = DEFAULT_ZOOM;
    }

    // ---- gesture entry ----

    /// Pointer-down on a layer's image: select it and start dragging.
    pub fn begin_drag(
        &mut self,
        scene: &mut Scene,
        layer: LayerId,
        pointer: Point,
    ) -> Result<(), CoreError> {
        self.ensure_idle()?;
        let start_position = scene
            .get(layer)
            .map(|l| l.position)
            .ok_or(CoreError::LayerNotFound(layer))?;
        scene.set_selected(Some(layer))?;

        self.gesture = Gesture::Dragging(DragBaseline {
            layer,
            start_pointer: pointer,
            start_position,
        });
        Ok(())
    }

    /// Pointer-down on a transform handle of the selected layer.
    ///
    /// Corner handles start a resize, the rotation knob starts a rotate.
    pub fn begin_transform(
        &mut self,
        scene: &Scene,
        canvas: &Rect,
        layer: LayerId,
        handle: Handle,
        pointer: Point,
    ) -> Result<(), CoreError> {
        self.ensure_idle()?;
        let current = scene.get(layer).ok_or(CoreError::LayerNotFound(layer))?;
        if scene.selected_id() != Some(layer) {
            return Err(CoreError::Validation(
                "Transform handles are only available on the selected layer".to_string(),
            ));
        }

        let center = normalized_to_screen(current.position, canvas, self.zoom);
        let baseline = TransformBaseline {
            layer,
            center,
            start_scale: current.scale,
            start_rotation: current.rotation_degrees,
            start_pointer: polar_around(center, pointer),
        };

        self.gesture = match handle {
            Handle::Rotate => Gesture::Rotating(baseline),
            Handle::TopLeft | Handle::TopRight | Handle::BottomLeft | Handle::BottomRight => {
                Gesture::Resizing(baseline)
            }
        };
        Ok(())
    }

    // ---- gesture progress / exit ----

    /// Advance the active gesture to the pointer's current position.
    ///
    /// If the gesture's layer has been removed in the meantime the gesture is
    /// dropped and the move is ignored.
    pub fn pointer_move(
        &mut self,
        scene: &mut Scene,
        canvas: &Rect,
        pointer: Point,
    ) -> Result<InputEffect, CoreError> {
        let Some(layer) = self.gesture.layer() else {
            return Ok(InputEffect::Ignored);
        };
        if !scene.contains(layer) {
            self.gesture = Gesture::None;
            return Ok(InputEffect::Ignored);
        }

        let patch = match self.gesture {
            Gesture::None => return Ok(InputEffect::Ignored),
            Gesture::Dragging(d) => {
                let delta =
                    screen_delta_to_normalized(pointer.offset_from(d.start_pointer), canvas, self.zoom);
                LayerPatch::position(Point::new(
                    d.start_position.x + delta.x,
                    d.start_position.y + delta.y,
                ))
            }
            Gesture::Resizing(t) => {
                let now = polar_around(t.center, pointer);
                let ratio = pointer_distance_ratio(now.distance, t.start_pointer.distance);
                LayerPatch::scale(compose_scale(ratio, t.start_scale))
            }
            Gesture::Rotating(t) => {
                let now = polar_around(t.center, pointer);
                LayerPatch::rotation(compose_rotation(
                    now.angle - t.start_pointer.angle,
                    t.start_rotation,
                ))
            }
        };

        scene.update_layer(layer, patch)?;
        Ok(InputEffect::LayerUpdated(layer))
    }

    /// Pointer-up or lost capture: end the gesture, keeping its last value.
    pub fn pointer_up(&mut self) -> Option<LayerId> {
        std::mem::take(&mut self.gesture).layer()
    }

    // ---- auxiliary channels ----

    /// Mouse wheel. Ctrl zooms the canvas; otherwise the selected layer is
    /// scaled, or rotated with Shift. Positive `delta_y` is a notch toward
    /// the user (shrink, rotate clockwise, zoom out).
    pub fn wheel(
        &mut self,
        scene: &mut Scene,
        delta_y: f64,
        modifiers: Modifiers,
    ) -> Result<InputEffect, CoreError> {
        if delta_y == 0.0 || delta_y.is_nan() {
            return Ok(InputEffect::Ignored);
        }
        let forward = delta_y > 0.0;

        if modifiers.ctrl {
            let delta = if forward { -ZOOM_STEP } else { ZOOM_STEP };
            return Ok(InputEffect::ZoomChanged(self.zoom_by(delta)));
        }

        let Some(layer) = scene.selected_layer().cloned() else {
            return Ok(InputEffect::Ignored);
        };

        let patch = if modifiers.shift {
            let delta = if forward {
                WHEEL_ROTATION_STEP
            } else {
                -WHEEL_ROTATION_STEP
            };
            LayerPatch::rotation(layer.rotation_degrees + delta)
        } else {
            let delta = if forward { -SCALE_STEP } else { SCALE_STEP };
            LayerPatch::scale(layer.scale + delta)
        };

        scene.update_layer(layer.id, patch)?;
        Ok(InputEffect::LayerUpdated(layer.id))
    }

    /// Keyboard shortcuts, active only while a layer is selected.
    pub fn key(
        &mut self,
        scene: &mut Scene,
        key: Key,
        modifiers: Modifiers,
    ) -> Result<InputEffect, CoreError> {
        let Some(layer) = scene.selected_layer().cloned() else {
            return Ok(InputEffect::Ignored);
        };

        let step = if modifiers.shift {
            NUDGE_STEP_COARSE
        } else {
            NUDGE_STEP
        };
        let nudge = |dx: f64, dy: f64| {
            LayerPatch::position(Point::new(layer.position.x + dx, layer.position.y + dy))
        };

        let patch = match key {
            Key::ArrowLeft => nudge(-step, 0.0),
            Key::ArrowRight => nudge(step, 0.0),
            Key::ArrowUp => nudge(0.0, -step),
            Key::ArrowDown => nudge(0.0, step),
            Key::Plus => LayerPatch::scale(layer.scale + SCALE_STEP),
            Key::Minus => LayerPatch::scale(layer.scale - SCALE_STEP),
            Key::Rotate => {
                let delta = if modifiers.shift {
                    -KEY_ROTATION_STEP
                } else {
                    KEY_ROTATION_STEP
                };
                LayerPatch::rotation(layer.rotation_degrees + delta)
            }
            Key::Delete => {
                scene.remove_layer(layer.id)?;
                scene.set_selected(None)?;
                if self.gesture.layer() == Some(layer.id) {
                    self.gesture = Gesture::None;
                }
                return Ok(InputEffect::LayerRemoved(layer.id));
            }
            Key::Other => return Ok(InputEffect::Ignored),
        };

        scene.update_layer(layer.id, patch)?;
        Ok(InputEffect::LayerUpdated(layer.id))
    }

    /// Drag-and-drop of an asset onto the canvas: place a new top-most layer
    /// at the drop point and select it.
    pub fn drop_asset(
        &mut self,
        scene: &mut Scene,
        canvas: &Rect,
        source: LayerSource,
        pointer: Point,
    ) -> Result<LayerId, CoreError> {
        let position = screen_to_normalized(pointer, canvas, self.zoom);
        let id = scene.add_layer_scaled(source, Some(position), DEFAULT_LAYER_SCALE)?;
        scene.set_selected(Some(id))?;
        Ok(id)
    }

    // ---- private helpers ----

    fn ensure_idle(&self) -> Result<(), CoreError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(CoreError::Validation(
                "Another gesture is already in progress".to_string(),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
