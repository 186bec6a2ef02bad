//! The editing session controller.
//!
//! [`Studio`] owns the overlay scene, the interaction controller, the base
//! image and the progressive-mode flag. Generation is split into three
//! steps so the host can keep handling input while a request is in flight:
//!
//! 1. [`Studio::begin_integration`] / [`Studio::begin_prompt_edit`] validate
//!    synchronously and hand out an [`IntegrationTicket`] holding a snapshot
//!    of everything the request needs;
//! 2. [`IntegrationTicket::run`] performs the I/O (overlay fetch, remote call)
//!    without touching the studio;
//! 3. [`Studio::finish`] applies the result, unless the scene or base image
//!    was replaced in the meantime.
//!
//! Only one ticket may be outstanding at a time. A ticket whose request is
//! cancelled is handed back through [`Studio::abandon`]; clearing the scene
//! or replacing the base image also releases it, since its result could no
//! longer apply.

use carmod_core::error::CoreError;
use carmod_core::geometry::{PixelSize, Point, Rect};
use carmod_core::interaction::{Handle, InputEffect, InteractionController, Key, Modifiers};
use carmod_core::payload::{validate_base_image, ImagePayload};
use carmod_core::placement::{compile_prompt_request, compile_request, validate_integration, MeasuredImage};
use carmod_core::reconcile::reconcile;
use carmod_core::scene::{LayerSource, Scene};
use carmod_core::types::LayerId;
use carmod_gemini::{GenerationOutput, ImageGenerator};

use crate::error::IntegrateError;
use crate::fetch::{fetch_overlays, BlobFetcher};

// ---------------------------------------------------------------------------
// Configuration and results
// ---------------------------------------------------------------------------

/// Session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudioConfig {
    /// Each successful result becomes the next base image.
    pub progressive: bool,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self { progressive: true }
    }
}

/// The most recent generated image, after reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct StudioResult {
    pub image: ImagePayload,
    pub size: Option<PixelSize>,
    /// Advisory text returned with the image.
    pub text: String,
    /// `false` when reconciliation failed and the raw output was kept.
    pub reconciled: bool,
}

/// What [`Studio::finish`] did with a result.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationOutcome {
    pub result: StudioResult,
    pub base_replaced: bool,
    /// The layers baked into the result were removed from the scene.
    pub scene_cleared: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketKind {
    /// Bake the visible overlays into the base image.
    Integrate,
    /// Text-only edit of the base image.
    PromptEdit,
}

/// Snapshot of one pending generation.
#[derive(Debug, Clone)]
pub struct IntegrationTicket {
    serial: u64,
    generation: u64,
    kind: TicketKind,
    base: MeasuredImage,
    scene: Scene,
    prompt: Option<String>,
}

impl IntegrationTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn kind(&self) -> TicketKind {
        self.kind
    }

    /// Fetch overlays, compile the request and call the generator.
    pub async fn run(
        &self,
        fetcher: &dyn BlobFetcher,
        generator: &dyn ImageGenerator,
    ) -> Result<GenerationOutput, IntegrateError> {
        let request = match self.kind {
            TicketKind::Integrate => {
                let visible = self.scene.visible_layers();
                let overlays = fetch_overlays(fetcher, &visible).await;
                tracing::debug!(
                    requested = visible.len(),
                    loaded = overlays.len(),
                    "Overlays fetched",
                );
                compile_request(&self.scene, &self.base, &overlays, self.prompt.as_deref())?
            }
            TicketKind::PromptEdit => {
                compile_prompt_request(&self.base.payload, self.prompt.as_deref().unwrap_or_default())?
            }
        };

        tracing::info!(
            generation = self.generation,
            kind = ?self.kind,
            overlays = request.overlays.len(),
            "Sending generation request",
        );
        Ok(generator.generate(&request).await?)
    }
}

// ---------------------------------------------------------------------------
// Studio
// ---------------------------------------------------------------------------

/// One editing session.
#[derive(Debug, Default)]
pub struct Studio {
    config: StudioConfig,
    scene: Scene,
    controller: InteractionController,
    base: Option<MeasuredImage>,
    last_result: Option<StudioResult>,
    /// Bumped whenever an in-flight result would no longer apply.
    generation: u64,
    /// Serial of the outstanding ticket.
    in_flight: Option<u64>,
    next_serial: u64,
}

impl Studio {
    pub fn new(config: StudioConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> StudioConfig {
        self.config
    }

    pub fn set_progressive(&mut self, progressive: bool) {
        self.config.progressive = progressive;
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Direct scene edits (layer panel actions, programmatic placement).
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn base_image(&self) -> Option<&MeasuredImage> {
        self.base.as_ref()
    }

    pub fn last_result(&self) -> Option<&StudioResult> {
        self.last_result.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    // ---- base image ----

    /// Replace the base image. Any in-flight result becomes stale.
    pub fn set_base_image(&mut self, payload: ImagePayload) -> Result<PixelSize, IntegrateError> {
        validate_base_image(&payload)?;
        let measured = MeasuredImage::measure(payload)?;
        let size = measured.size;
        self.base = Some(measured);
        self.last_result = None;
        self.invalidate();
        Ok(size)
    }

    /// Promote the last result to base image.
    pub fn use_result_as_base(&mut self) -> Result<PixelSize, IntegrateError> {
        let Some(result) = self.last_result.clone() else {
            return Err(CoreError::Validation("There is no result to use".to_string()).into());
        };
        self.set_base_image(result.image)
    }

    pub fn clear_result(&mut self) {
        self.last_result = None;
    }

    /// Remove every layer. Any in-flight result becomes stale.
    pub fn clear_scene(&mut self) {
        self.controller.pointer_up();
        self.scene.clear();
        self.invalidate();
    }

    // ---- input ----

    pub fn pointer_down_on_layer(&mut self, layer: LayerId, pointer: Point) -> Result<(), IntegrateError> {
        Ok(self.controller.begin_drag(&mut self.scene, layer, pointer)?)
    }

    pub fn pointer_down_on_handle(
        &mut self,
        canvas: &Rect,
        layer: LayerId,
        handle: Handle,
        pointer: Point,
    ) -> Result<(), IntegrateError> {
        Ok(self
            .controller
            .begin_transform(&self.scene, canvas, layer, handle, pointer)?)
    }

    pub fn pointer_move(&mut self, canvas: &Rect, pointer: Point) -> Result<InputEffect, IntegrateError> {
        Ok(self.controller.pointer_move(&mut self.scene, canvas, pointer)?)
    }

    pub fn pointer_up(&mut self) -> Option<LayerId> {
        self.controller.pointer_up()
    }

    pub fn wheel(&mut self, delta_y: f64, modifiers: Modifiers) -> Result<InputEffect, IntegrateError> {
        Ok(self.controller.wheel(&mut self.scene, delta_y, modifiers)?)
    }

    pub fn key(&mut self, key: Key, modifiers: Modifiers) -> Result<InputEffect, IntegrateError> {
        Ok(self.controller.key(&mut self.scene, key, modifiers)?)
    }

    pub fn drop_asset(
        &mut self,
        canvas: &Rect,
        source: LayerSource,
        pointer: Point,
    ) -> Result<LayerId, IntegrateError> {
        Ok(self.controller.drop_asset(&mut self.scene, canvas, source, pointer)?)
    }

    pub fn zoom_by(&mut self, delta: f64) -> f64 {
        self.controller.zoom_by(delta)
    }

    pub fn reset_zoom(&mut self) {
        self.controller.reset_zoom();
    }

    // ---- generation ----

    /// Validate and snapshot an integration of the visible overlays.
    ///
    /// Fails before any I/O when no base image is loaded, nothing visible
    /// is placed, or another generation is in flight.
    pub fn begin_integration(&mut self, prompt: Option<&str>) -> Result<IntegrationTicket, IntegrateError> {
        self.ensure_idle()?;
        let base = self.require_base()?;
        validate_integration(&self.scene)?;

        let scene = self.scene.clone();
        Ok(self.issue(TicketKind::Integrate, base, scene, prompt.map(str::to_string)))
    }

    /// Validate and snapshot a prompt-only edit of the base image.
    pub fn begin_prompt_edit(&mut self, prompt: &str) -> Result<IntegrationTicket, IntegrateError> {
        self.ensure_idle()?;
        let base = self.require_base()?;
        if prompt.trim().is_empty() {
            return Err(CoreError::Validation("Please enter a prompt".to_string()).into());
        }

        Ok(self.issue(
            TicketKind::PromptEdit,
            base,
            Scene::new(),
            Some(prompt.trim().to_string()),
        ))
    }

    /// Give back a ticket whose request will never finish (cancelled or
    /// dropped by the host). Returns `true` if it was the outstanding one.
    pub fn abandon(&mut self, ticket: IntegrationTicket) -> bool {
        let released = self.release(&ticket);
        if released {
            tracing::info!(generation = ticket.generation, kind = ?ticket.kind, "Generation abandoned");
        }
        released
    }

    /// Apply the outcome of a ticket.
    ///
    /// A stale ticket's result is discarded with [`IntegrateError::Stale`].
    /// Otherwise the image is reconciled to the base size (falling back to
    /// the raw output if that fails), stored as the last result, promoted
    /// to base in progressive mode, and an integration removes the layers it
    /// baked in. Layers placed while the request was in flight are kept.
    pub fn finish(
        &mut self,
        ticket: IntegrationTicket,
        result: Result<GenerationOutput, IntegrateError>,
    ) -> Result<IntegrationOutcome, IntegrateError> {
        self.release(&ticket);

        if ticket.generation != self.generation {
            tracing::info!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale generation result",
            );
            return Err(IntegrateError::Stale);
        }
        let output = result?;

        let (image, reconciled) = match reconcile(&output.image, ticket.base.size) {
            Ok(image) => (image, true),
            Err(e) => {
                tracing::warn!(error = %e, "Reconciliation failed; keeping raw output");
                (output.image, false)
            }
        };
        let result = StudioResult {
            size: image.dimensions().ok(),
            image,
            text: output.text,
            reconciled,
        };

        let base_replaced = self.config.progressive
            && match self.set_base_image(result.image.clone()) {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Result cannot become the base image");
                    false
                }
            };
        let scene_cleared = ticket.kind == TicketKind::Integrate;
        if scene_cleared {
            self.remove_baked_layers(&ticket.scene);
        }
        self.last_result = Some(result.clone());

        tracing::info!(
            kind = ?ticket.kind,
            reconciled,
            base_replaced,
            bytes = result.image.len(),
            "Generation result applied",
        );
        Ok(IntegrationOutcome {
            result,
            base_replaced,
            scene_cleared,
        })
    }

    /// Begin, run and finish an integration in one call.
    pub async fn integrate(
        &mut self,
        fetcher: &dyn BlobFetcher,
        generator: &dyn ImageGenerator,
        prompt: Option<&str>,
    ) -> Result<IntegrationOutcome, IntegrateError> {
        let ticket = self.begin_integration(prompt)?;
        let result = ticket.run(fetcher, generator).await;
        self.finish(ticket, result)
    }

    /// Begin, run and finish a prompt edit in one call.
    pub async fn prompt_edit(
        &mut self,
        fetcher: &dyn BlobFetcher,
        generator: &dyn ImageGenerator,
        prompt: &str,
    ) -> Result<IntegrationOutcome, IntegrateError> {
        let ticket = self.begin_prompt_edit(prompt)?;
        let result = ticket.run(fetcher, generator).await;
        self.finish(ticket, result)
    }

    // ---- private helpers ----

    fn ensure_idle(&self) -> Result<(), IntegrateError> {
        match self.in_flight {
            Some(_) => Err(IntegrateError::Busy),
            None => Ok(()),
        }
    }

    fn issue(
        &mut self,
        kind: TicketKind,
        base: MeasuredImage,
        scene: Scene,
        prompt: Option<String>,
    ) -> IntegrationTicket {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.in_flight = Some(serial);
        IntegrationTicket {
            serial,
            generation: self.generation,
            kind,
            base,
            scene,
            prompt,
        }
    }

    /// Clear the busy flag if `ticket` is the outstanding one.
    fn release(&mut self, ticket: &IntegrationTicket) -> bool {
        if self.in_flight == Some(ticket.serial) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Make any outstanding ticket stale and stop waiting for it.
    fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }

    fn remove_baked_layers(&mut self, snapshot: &Scene) {
        for layer in snapshot.layers() {
            // Already gone if the user deleted it mid-flight.
            let _ = self.scene.remove_layer(layer.id);
        }
    }

    fn require_base(&self) -> Result<MeasuredImage, IntegrateError> {
        self.base
            .clone()
            .ok_or_else(|| CoreError::Validation("Upload a base image first".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> ImagePayload {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        ImagePayload::new("image/png", out.into_inner())
    }

    fn studio_with_layer() -> (Studio, LayerId) {
        let mut studio = Studio::new(StudioConfig::default());
        studio.set_base_image(png(16, 9)).unwrap();
        let id = studio
            .scene_mut()
            .add_layer(LayerSource::new("rim", "https://blobs.test/rim.png"), None)
            .unwrap();
        (studio, id)
    }

    fn output(image: ImagePayload) -> Result<GenerationOutput, IntegrateError> {
        Ok(GenerationOutput {
            image,
            text: String::new(),
        })
    }

    // -- begin --

    #[test]
    fn integration_needs_base_image() {
        let mut studio = Studio::new(StudioConfig::default());
        studio
            .scene_mut()
            .add_layer(LayerSource::new("a", "https://blobs.test/a.png"), None)
            .unwrap();
        assert_matches!(
            studio.begin_integration(None),
            Err(IntegrateError::Core(CoreError::Validation(_)))
        );
        assert!(!studio.is_busy());
    }

    #[test]
    fn hidden_only_scene_fails_validation() {
        let (mut studio, id) = studio_with_layer();
        studio.scene_mut().toggle_hidden(id).unwrap();
        assert_matches!(
            studio.begin_integration(None),
            Err(IntegrateError::Core(CoreError::Validation(_)))
        );
    }

    #[test]
    fn second_begin_is_busy() {
        let (mut studio, _) = studio_with_layer();
        let _ticket = studio.begin_integration(None).unwrap();
        assert!(studio.is_busy());
        assert_matches!(studio.begin_integration(None), Err(IntegrateError::Busy));
        assert_matches!(studio.begin_prompt_edit("x"), Err(IntegrateError::Busy));
    }

    #[test]
    fn prompt_edit_needs_prompt() {
        let (mut studio, _) = studio_with_layer();
        assert_matches!(
            studio.begin_prompt_edit("  "),
            Err(IntegrateError::Core(CoreError::Validation(_)))
        );
    }

    // -- finish --

    #[test]
    fn progressive_integration_replaces_base_and_clears_scene() {
        let (mut studio, _) = studio_with_layer();
        let ticket = studio.begin_integration(None).unwrap();

        let outcome = studio.finish(ticket, output(png(32, 32))).unwrap();
        assert!(outcome.result.reconciled);
        assert!(outcome.base_replaced);
        assert!(outcome.scene_cleared);
        assert!(studio.scene().is_empty());
        assert!(!studio.is_busy());
        assert_eq!(studio.base_image().unwrap().size, PixelSize::new(16, 9));
        assert_eq!(studio.last_result().unwrap().size, Some(PixelSize::new(16, 9)));
    }

    #[test]
    fn non_progressive_keeps_base() {
        let (mut studio, _) = studio_with_layer();
        studio.set_progressive(false);
        let original = studio.base_image().unwrap().payload.clone();
        let ticket = studio.begin_integration(None).unwrap();

        let outcome = studio.finish(ticket, output(png(16, 9))).unwrap();
        assert!(!outcome.base_replaced);
        assert!(studio.scene().is_empty());
        assert_eq!(studio.base_image().unwrap().payload, original);
        assert!(studio.last_result().is_some());
    }

    #[test]
    fn prompt_edit_keeps_layers() {
        let (mut studio, _) = studio_with_layer();
        let ticket = studio.begin_prompt_edit("matte black").unwrap();
        let outcome = studio.finish(ticket, output(png(16, 9))).unwrap();
        assert!(!outcome.scene_cleared);
        assert_eq!(studio.scene().len(), 1);
    }

    #[test]
    fn clearing_mid_flight_makes_result_stale() {
        let (mut studio, _) = studio_with_layer();
        let ticket = studio.begin_integration(None).unwrap();
        studio.clear_scene();

        assert_matches!(studio.finish(ticket, output(png(16, 9))), Err(IntegrateError::Stale));
        assert!(studio.last_result().is_none());
        assert!(!studio.is_busy());
    }

    #[test]
    fn new_base_mid_flight_makes_result_stale() {
        let (mut studio, _) = studio_with_layer();
        let ticket = studio.begin_integration(None).unwrap();
        studio.set_base_image(png(4, 4)).unwrap();
        assert_matches!(studio.finish(ticket, output(png(16, 9))), Err(IntegrateError::Stale));
    }

    #[test]
    fn layer_edits_mid_flight_do_not_invalidate() {
        let (mut studio, id) = studio_with_layer();
        let ticket = studio.begin_integration(None).unwrap();
        studio.wheel(-1.0, Modifiers::NONE).unwrap();
        studio.scene_mut().bring_to_front(id).unwrap();
        assert!(studio.finish(ticket, output(png(16, 9))).is_ok());
    }

    #[test]
    fn undecodable_output_falls_back_to_raw() {
        let (mut studio, _) = studio_with_layer();
        studio.set_progressive(false);
        let ticket = studio.begin_integration(None).unwrap();
        let raw = ImagePayload::new("image/png", b"opaque bytes".to_vec());

        let outcome = studio.finish(ticket, output(raw.clone())).unwrap();
        assert!(!outcome.result.reconciled);
        assert_eq!(outcome.result.image, raw);
    }

    #[test]
    fn failed_generation_releases_busy_flag_and_keeps_scene() {
        let (mut studio, _) = studio_with_layer();
        let ticket = studio.begin_integration(None).unwrap();
        let err = studio.finish(
            ticket,
            Err(IntegrateError::Generation(carmod_gemini::GeminiError::NoImageReturned {
                text: "nope".to_string(),
                finish_reason: None,
            })),
        );
        assert_matches!(err, Err(IntegrateError::Generation(_)));
        assert!(!studio.is_busy());
        assert_eq!(studio.scene().len(), 1);
    }

    #[test]
    fn same_aspect_output_is_kept_at_its_own_size() {
        let (mut studio, _) = studio_with_layer();
        let ticket = studio.begin_integration(None).unwrap();
        let generated = png(32, 18);

        let outcome = studio.finish(ticket, output(generated.clone())).unwrap();
        assert!(outcome.result.reconciled);
        assert_eq!(outcome.result.image, generated);
        assert_eq!(outcome.result.size, Some(PixelSize::new(32, 18)));
        assert_eq!(studio.base_image().unwrap().size, PixelSize::new(32, 18));
    }

    #[test]
    fn layers_added_mid_flight_survive_the_result() {
        let (mut studio, baked) = studio_with_layer();
        let ticket = studio.begin_integration(None).unwrap();
        let late = studio
            .scene_mut()
            .add_layer(LayerSource::new("wing", "https://blobs.test/wing.png"), None)
            .unwrap();
        studio.scene_mut().remove_layer(baked).unwrap();

        let outcome = studio.finish(ticket, output(png(16, 9))).unwrap();
        assert!(outcome.scene_cleared);
        assert_eq!(studio.scene().len(), 1);
        assert!(studio.scene().contains(late));
    }

    // -- abandoned tickets --

    #[test]
    fn abandoned_ticket_releases_busy_flag() {
        let (mut studio, _) = studio_with_layer();
        let ticket = studio.begin_integration(None).unwrap();
        assert!(studio.abandon(ticket.clone()));
        assert!(!studio.is_busy());
        assert!(!studio.abandon(ticket));

        let next = studio.begin_integration(None).unwrap();
        assert_eq!(next.kind(), TicketKind::Integrate);
    }

    #[test]
    fn dropped_ticket_is_released_by_reset() {
        let (mut studio, _) = studio_with_layer();
        drop(studio.begin_integration(None).unwrap());
        assert!(studio.is_busy());

        studio.clear_scene();
        assert!(!studio.is_busy());
        studio.set_base_image(png(16, 9)).unwrap();
        studio
            .scene_mut()
            .add_layer(LayerSource::new("rim", "https://blobs.test/rim.png"), None)
            .unwrap();
        assert!(studio.begin_integration(None).is_ok());
    }

    #[test]
    fn stale_ticket_does_not_release_newer_one() {
        let (mut studio, _) = studio_with_layer();
        let old = studio.begin_integration(None).unwrap();
        studio.set_base_image(png(16, 9)).unwrap();
        let _current = studio.begin_prompt_edit("gloss").unwrap();

        assert_matches!(studio.finish(old, output(png(16, 9))), Err(IntegrateError::Stale));
        assert!(studio.is_busy());
    }

    // -- results --

    #[test]
    fn use_result_as_base_promotes_and_clears_result() {
        let (mut studio, _) = studio_with_layer();
        studio.set_progressive(false);
        let ticket = studio.begin_prompt_edit("lower it").unwrap();
        studio.finish(ticket, output(png(32, 18))).unwrap();

        assert_eq!(studio.use_result_as_base().unwrap(), PixelSize::new(32, 18));
        assert!(studio.last_result().is_none());
        assert_matches!(
            studio.use_result_as_base(),
            Err(IntegrateError::Core(CoreError::Validation(_)))
        );
    }
}
