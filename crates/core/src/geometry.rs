//! Coordinate math shared by the scene, the interaction controller and the
//! placement compiler.
//!
//! Three spaces are involved:
//!
//! - **screen space**: pointer coordinates as delivered by the host, not
//!   affected by canvas zoom;
//! - **normalized space**: `[0, 1]²` relative to the canvas content box,
//!   origin top-left;
//! - **pixel space**: intrinsic pixels of the base image.
//!
//! The canvas content is scaled uniformly around its own center by the zoom
//! factor, so every screen/normalized conversion goes through that center.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Smallest scale a layer may have.
pub const MIN_SCALE: f64 = 0.1;

/// Largest scale a layer may have.
pub const MAX_SCALE: f64 = 3.0;

/// Smallest canvas zoom.
pub const MIN_ZOOM: f64 = 0.5;

/// Largest canvas zoom.
pub const MAX_ZOOM: f64 = 2.0;

/// Canvas zoom after a reset.
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Lower bound applied to any divisor derived from pointer distance.
pub const MIN_POINTER_DISTANCE: f64 = 1.0;

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

/// A 2D point or vector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Center of the normalized canvas.
    pub const CENTER: Point = Point::new(0.5, 0.5);

    /// Vector from `origin` to `self`.
    pub fn offset_from(self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Integer pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelSize {
    pub width: u32,
    pub height: u32,
}

impl PixelSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height; `None` for degenerate sizes.
    pub fn aspect_ratio(self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(f64::from(self.width) / f64::from(self.height))
        }
    }
}

/// An axis-aligned rectangle in screen space (the canvas bounding box).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

// ---------------------------------------------------------------------------
// Clamping
// ---------------------------------------------------------------------------

/// Clamp a single normalized coordinate into `[0, 1]`. NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Clamp both axes of a normalized position into `[0, 1]`.
pub fn clamp_normalized(point: Point) -> Point {
    Point::new(clamp_unit(point.x), clamp_unit(point.y))
}

/// Clamp a layer scale into [`MIN_SCALE`, `MAX_SCALE`]. NaN maps to the minimum.
pub fn clamp_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        MIN_SCALE
    } else {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }
}

/// Clamp a canvas zoom into [`MIN_ZOOM`, `MAX_ZOOM`]. NaN maps to the default.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        DEFAULT_ZOOM
    } else {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    }
}

/// Apply a zoom step, clamped and rounded to two decimals so repeated steps
/// do not accumulate float drift.
pub fn step_zoom(current: f64, delta: f64) -> f64 {
    round_to(clamp_zoom(current + delta), 2)
}

// ---------------------------------------------------------------------------
// Space conversions
// ---------------------------------------------------------------------------

/// Guard a canvas extent so it can be used as a divisor.
fn extent(length: f64, zoom: f64) -> f64 {
    (length * zoom).max(f64::EPSILON)
}

/// Map a screen-space pointer position into normalized canvas space.
///
/// `normalized = 0.5 + (pointer - canvas_center) / (canvas_size * zoom)`,
/// clamped into `[0, 1]` per axis.
pub fn screen_to_normalized(pointer: Point, canvas: &Rect, zoom: f64) -> Point {
    let zoom = clamp_zoom(zoom);
    let center = canvas.center();
    clamp_normalized(Point::new(
        0.5 + (pointer.x - center.x) / extent(canvas.width, zoom),
        0.5 + (pointer.y - center.y) / extent(canvas.height, zoom),
    ))
}

/// Inverse of [`screen_to_normalized`] (without clamping): where a normalized
/// position is drawn on screen at the given zoom.
pub fn normalized_to_screen(norm: Point, canvas: &Rect, zoom: f64) -> Point {
    let zoom = clamp_zoom(zoom);
    let center = canvas.center();
    Point::new(
        center.x + (norm.x - 0.5) * canvas.width * zoom,
        center.y + (norm.y - 0.5) * canvas.height * zoom,
    )
}

/// Convert a screen-space pointer delta into a normalized delta.
pub fn screen_delta_to_normalized(delta: Point, canvas: &Rect, zoom: f64) -> Point {
    let zoom = clamp_zoom(zoom);
    Point::new(
        delta.x / extent(canvas.width, zoom),
        delta.y / extent(canvas.height, zoom),
    )
}

/// Scale a normalized position by the image's pixel dimensions.
pub fn normalized_to_pixel(norm: Point, image: PixelSize) -> Point {
    Point::new(
        norm.x * f64::from(image.width),
        norm.y * f64::from(image.height),
    )
}

// ---------------------------------------------------------------------------
// Polar helpers for resize / rotate
// ---------------------------------------------------------------------------

/// Angle (radians, `atan2` convention) and distance of `pointer` around `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polar {
    pub angle: f64,
    pub distance: f64,
}

pub fn polar_around(center: Point, pointer: Point) -> Polar {
    let d = pointer.offset_from(center);
    Polar {
        angle: d.y.atan2(d.x),
        distance: d.x.hypot(d.y),
    }
}

/// Ratio of the current pointer distance to the starting distance. The
/// starting distance is floored at [`MIN_POINTER_DISTANCE`].
pub fn pointer_distance_ratio(current: f64, start: f64) -> f64 {
    current.max(0.0) / start.max(MIN_POINTER_DISTANCE)
}

/// Resize composition: `clamp(start_scale * ratio)`.
pub fn compose_scale(pointer_distance_ratio: f64, start_scale: f64) -> f64 {
    clamp_scale(start_scale * pointer_distance_ratio)
}

/// Rotate composition: start rotation plus the pointer's angular sweep
/// around the layer center, in degrees. Not wrapped.
pub fn compose_rotation(pointer_angle_delta: f64, start_rotation_degrees: f64) -> f64 {
    start_rotation_degrees + pointer_angle_delta.to_degrees()
}

// ---------------------------------------------------------------------------
// Rounding
// ---------------------------------------------------------------------------

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn canvas() -> Rect {
        Rect::new(100.0, 50.0, 800.0, 450.0)
    }

    // -- screen_to_normalized --

    #[test]
    fn canvas_center_maps_to_half() {
        let p = screen_to_normalized(canvas().center(), &canvas(), 1.0);
        assert!((p.x - 0.5).abs() < EPS);
        assert!((p.y - 0.5).abs() < EPS);
    }

    #[test]
    fn corners_map_to_unit_bounds_at_unit_zoom() {
        let c = canvas();
        let tl = screen_to_normalized(Point::new(c.left, c.top), &c, 1.0);
        let br = screen_to_normalized(Point::new(c.left + c.width, c.top + c.height), &c, 1.0);
        assert!(tl.x.abs() < EPS && tl.y.abs() < EPS);
        assert!((br.x - 1.0).abs() < EPS && (br.y - 1.0).abs() < EPS);
    }

    #[test]
    fn zoom_shrinks_the_normalized_offset() {
        let c = canvas();
        // 200px right of center at zoom 2 is a quarter of the zoomed width.
        let p = screen_to_normalized(Point::new(c.center().x + 200.0, c.center().y), &c, 2.0);
        assert!((p.x - 0.625).abs() < EPS);
    }

    #[test]
    fn far_pointers_are_clamped() {
        let c = canvas();
        for &(x, y) in &[(-1e9, -1e9), (1e9, 1e9), (-1e9, 1e9), (1e12, -3.0)] {
            let p = screen_to_normalized(Point::new(x, y), &c, 0.5);
            assert!((0.0..=1.0).contains(&p.x), "x out of range: {}", p.x);
            assert!((0.0..=1.0).contains(&p.y), "y out of range: {}", p.y);
        }
    }

    #[test]
    fn degenerate_canvas_does_not_produce_nan() {
        let c = Rect::new(0.0, 0.0, 0.0, 0.0);
        let p = screen_to_normalized(Point::new(10.0, -10.0), &c, 1.0);
        assert!(!p.x.is_nan() && !p.y.is_nan());
        assert_eq!(p, Point::new(1.0, 0.0));
    }

    #[test]
    fn normalized_to_screen_inverts_screen_to_normalized() {
        let c = canvas();
        for &zoom in &[0.5, 1.0, 1.3, 2.0] {
            let norm = Point::new(0.3, 0.8);
            let screen = normalized_to_screen(norm, &c, zoom);
            let back = screen_to_normalized(screen, &c, zoom);
            assert!((back.x - norm.x).abs() < EPS);
            assert!((back.y - norm.y).abs() < EPS);
        }
    }

    // -- normalized_to_pixel --

    #[test]
    fn pixel_conversion_multiplies() {
        let p = normalized_to_pixel(Point::new(0.5, 0.25), PixelSize::new(1920, 1080));
        assert_eq!(p, Point::new(960.0, 270.0));
    }

    // -- compose_scale / compose_rotation --

    #[test]
    fn composed_scale_stays_in_bounds() {
        for &ratio in &[0.0, 1e-6, 0.5, 1.0, 7.0, 1e9, f64::INFINITY] {
            let s = compose_scale(ratio, 0.4);
            assert!((MIN_SCALE..=MAX_SCALE).contains(&s), "ratio {ratio} gave {s}");
        }
    }

    #[test]
    fn zero_start_distance_is_guarded() {
        let ratio = pointer_distance_ratio(5.0, 0.0);
        assert_eq!(ratio, 5.0);
        assert!(pointer_distance_ratio(0.0, 0.0).is_finite());
    }

    #[test]
    fn rotation_accumulates_without_wrapping() {
        let r = compose_rotation(std::f64::consts::PI, 350.0);
        assert!((r - 530.0).abs() < EPS);
    }

    #[test]
    fn polar_measures_angle_and_distance() {
        let p = polar_around(Point::new(0.0, 0.0), Point::new(0.0, 3.0));
        assert!((p.distance - 3.0).abs() < EPS);
        assert!((p.angle - std::f64::consts::FRAC_PI_2).abs() < EPS);
    }

    // -- zoom --

    #[test]
    fn zoom_steps_are_clamped_and_rounded() {
        assert_eq!(step_zoom(1.0, 0.1), 1.1);
        assert_eq!(step_zoom(1.95, 0.1), MAX_ZOOM);
        assert_eq!(step_zoom(0.55, -0.1), MIN_ZOOM);
        let mut z = DEFAULT_ZOOM;
        for _ in 0..3 {
            z = step_zoom(z, 0.1);
        }
        assert_eq!(z, 1.3);
    }

    // -- aspect ratio --

    #[test]
    fn aspect_ratio_of_degenerate_size_is_none() {
        assert_eq!(PixelSize::new(0, 10).aspect_ratio(), None);
        assert_eq!(PixelSize::new(16, 8).aspect_ratio(), Some(2.0));
    }

    #[test]
    fn rounding_to_places() {
        assert_eq!(round_to(0.123_456, 4), 0.1235);
        assert_eq!(round_to(2.5, 0), 3.0);
    }
}
