//! Natural-language instructions sent alongside the images.

use crate::placement::PlacementDescriptor;

/// Guidance used when overlay images accompany the base image.
pub const OVERLAY_GUIDANCE: &[&str] = &[
    "You will receive a base vehicle photo and one or more overlay PNGs.",
    "Seamlessly integrate each overlay into the base at the specified positions and rotations.",
    "Preserve the original background; align perspective, lighting, reflections and shadows.",
    "Return only a single edited image (no text).",
    "Maintain the original canvas/resolution of the base image. Do not crop or add borders.",
];

/// Guidance used for a prompt-only edit of the base image.
pub const EDIT_GUIDANCE: &[&str] = &[
    "Edit the provided base image according to the instructions.",
    "Return only a single edited image (no text).",
    "Maintain the original canvas/resolution of the base image. Do not crop or add borders.",
];

/// Fixed preamble for overlay asset generation.
pub const ASSET_GUIDANCE: &str = "You produce a single cosmetic car part image suitable as an overlay asset.\n\
- Output must be a transparent-background PNG (no background, only the item).\n\
- Center the item, sufficient padding, consistent perspective.\n\
- High-resolution with clean alpha edges. No text or watermarks.";

fn placement_json(descriptor: Option<&PlacementDescriptor>) -> Option<String> {
    descriptor
        .filter(|d| !d.is_empty())
        .map(PlacementDescriptor::to_json)
}

/// Build the instruction for an integration or prompt edit.
///
/// Sections are joined by a blank line and empty sections are dropped:
/// guidance, placement JSON, image-order note, then the user prompt. A
/// blank prompt with overlays present is replaced by one restating the
/// placement.
pub fn integration_instruction(
    descriptor: Option<&PlacementDescriptor>,
    overlay_count: usize,
    prompt: Option<&str>,
) -> String {
    let guidance = if overlay_count > 0 {
        OVERLAY_GUIDANCE.join("\n")
    } else {
        EDIT_GUIDANCE.join("\n")
    };
    let placement = placement_json(descriptor);

    let prompt = prompt.map(str::trim).unwrap_or_default();
    let prompt = if prompt.is_empty() && overlay_count > 0 {
        format!(
            "Integrate the overlay images into the base vehicle photo at the specified positions.\n\
             Placement (one per overlay, in order):\n{}",
            placement.as_deref().unwrap_or_default()
        )
    } else {
        prompt.to_string()
    };

    let sections = [
        guidance,
        placement
            .map(|json| format!("Placement JSON (normalized and/or pixel centers):\n{json}"))
            .unwrap_or_default(),
        if overlay_count > 0 {
            format!(
                "The first {overlay_count} image(s) are overlay parts to integrate; the next image \
                 is the base scene to edit. Place each overlay once at its specified position."
            )
        } else {
            String::new()
        },
        prompt,
    ];

    sections
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the instruction for generating one overlay asset.
pub fn asset_instruction(category: &str, prompt: &str) -> String {
    format!(
        "{ASSET_GUIDANCE}\n\nCategory: {}\nRequest: {}",
        category.trim(),
        prompt.trim()
    )
}
