//! Overlay asset records and saved mod snapshots.
//!
//! These are the library-side records a layer points at. A layer keeps only
//! the asset id and a fetchable URL (see [`AssetRecord::layer_source`]);
//! persistence of the records themselves lives outside this crate.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::payload::ImagePayload;
use crate::scene::LayerSource;
use crate::types::Timestamp;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Name given to a saved mod when the user leaves it blank.
pub const DEFAULT_MOD_NAME: &str = "Untitled Mod";

/* --------------------------------------------------------------------------
Records
-------------------------------------------------------------------------- */

/// A generated or uploaded overlay asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: uuid::Uuid,
    /// Catalog key, e.g. `Aero / Spoilers & Wings`.
    pub category: String,
    pub name: String,
    pub prompt: String,
    /// Storage handle of the image (path or key in the blob store).
    pub image_handle: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub created_at: Timestamp,
}

impl AssetRecord {
    /// Layer source pointing at this asset through `url`.
    pub fn layer_source(&self, url: impl Into<String>) -> LayerSource {
        LayerSource::new(self.id.to_string(), url)
    }
}

/// A saved integration result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModSnapshot {
    pub id: uuid::Uuid,
    pub name: String,
    pub prompt: String,
    pub image_handle: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub created_at: Timestamp,
}

impl ModSnapshot {
    /// New snapshot stamped now; a blank name becomes [`DEFAULT_MOD_NAME`].
    pub fn new(
        name: &str,
        prompt: &str,
        image_handle: impl Into<String>,
        size: Option<crate::geometry::PixelSize>,
    ) -> Self {
        let name = match name.trim() {
            "" => DEFAULT_MOD_NAME.to_string(),
            n => n.to_string(),
        };
        Self {
            id: uuid::Uuid::new_v4(),
            name,
            prompt: prompt.trim().to_string(),
            image_handle: image_handle.into(),
            width: size.map(|s| s.width),
            height: size.map(|s| s.height),
            created_at: chrono::Utc::now(),
        }
    }
}

/// Records in `category`, newest first.
pub fn assets_in_category<'a>(records: &'a [AssetRecord], category: &str) -> Vec<&'a AssetRecord> {
    let mut matching: Vec<&AssetRecord> =
        records.iter().filter(|r| r.category == category).collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matching
}

/* --------------------------------------------------------------------------
Generation requests
-------------------------------------------------------------------------- */

/// A validated request to generate one overlay asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetGenerationRequest {
    pub name: String,
    pub category: String,
    pub prompt: String,
    /// Optional reference image sent after the instruction text.
    pub reference: Option<ImagePayload>,
}

impl AssetGenerationRequest {
    /// Validate and normalize a request.
    ///
    /// Category and prompt are required; a blank name becomes
    /// `"<category> asset"`.
    pub fn new(
        name: &str,
        category: &str,
        prompt: &str,
        reference: Option<ImagePayload>,
    ) -> Result<Self, CoreError> {
        let category = category.trim();
        let prompt = prompt.trim();
        if category.is_empty() {
            return Err(CoreError::Validation("Category is required".to_string()));
        }
        if prompt.is_empty() {
            return Err(CoreError::Validation("Please enter a prompt".to_string()));
        }
        let name = match name.trim() {
            "" => format!("{category} asset"),
            n => n.to_string(),
        };

        Ok(Self {
            name,
            category: category.to_string(),
            prompt: prompt.to_string(),
            reference: reference.filter(|r| !r.is_empty()),
        })
    }

    /// Instruction text for the generation service.
    pub fn instruction(&self) -> String {
        crate::instruction::asset_instruction(&self.category, &self.prompt)
    }
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
