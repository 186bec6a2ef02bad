//! Result reconciliation.
//!
//! The generation service may answer at any resolution. Its output is
//! center-cropped to the base image's aspect ratio and resampled to the
//! base's exact pixel size before it replaces the base.

use std::io::Cursor;

use image::imageops::FilterType;
use image::ImageFormat;

use crate::error::CoreError;
use crate::geometry::PixelSize;
use crate::payload::ImagePayload;

/// Relative aspect-ratio difference below which no crop is applied.
pub const ASPECT_TOLERANCE: f64 = 0.001;

/// A crop window in output-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Centered crop of `output` matching the aspect ratio of `target`.
///
/// Returns `None` when the ratios already agree within
/// [`ASPECT_TOLERANCE`] or either size is degenerate.
pub fn crop_region(output: PixelSize, target: PixelSize) -> Option<CropRegion> {
    let out_aspect = output.aspect_ratio()?;
    let target_aspect = target.aspect_ratio()?;

    if ((out_aspect - target_aspect) / target_aspect).abs() < ASPECT_TOLERANCE {
        return None;
    }

    let region = if out_aspect > target_aspect {
        let width = ((f64::from(output.height) * target_aspect).round() as u32).clamp(1, output.width);
        CropRegion {
            x: (output.width - width) / 2,
            y: 0,
            width,
            height: output.height,
        }
    } else {
        let height = ((f64::from(output.width) / target_aspect).round() as u32).clamp(1, output.height);
        CropRegion {
            x: 0,
            y: (output.height - height) / 2,
            width: output.width,
            height,
        }
    };
    Some(region)
}

/// Crop and resample `output` to exactly `target`, re-encoded as PNG.
///
/// An output whose aspect ratio already matches is returned unchanged.
pub fn reconcile(output: &ImagePayload, target: PixelSize) -> Result<ImagePayload, CoreError> {
    if target.aspect_ratio().is_none() {
        return Err(CoreError::Reconciliation(format!(
            "Invalid target size {}x{}",
            target.width, target.height
        )));
    }

    let decoded = image::load_from_memory(&output.bytes)
        .map_err(|e| CoreError::Reconciliation(format!("Cannot decode generated image: {e}")))?;
    let size = PixelSize::new(decoded.width(), decoded.height());

    let Some(region) = crop_region(size, target) else {
        return Ok(output.clone());
    };

    let fitted = decoded
        .crop_imm(region.x, region.y, region.width, region.height)
        .resize_exact(target.width, target.height, FilterType::Lanczos3);

    let mut encoded = Cursor::new(Vec::new());
    fitted
        .write_to(&mut encoded, ImageFormat::Png)
        .map_err(|e| CoreError::Reconciliation(format!("Cannot encode reconciled image: {e}")))?;

    Ok(ImagePayload::new("image/png", encoded.into_inner()))
}
