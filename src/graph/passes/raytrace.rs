//! Raytraced Lighting Pass
//!
//! A compute-queue producer that writes a full-resolution lighting texture
//! for the forward pass to sample. It disables itself when raytracing is
//! off in the configuration or when the visible set is empty — in either
//! case it costs nothing, not even resource registrations.
//!
//! Cross-queue ordering with the graphics consumers is handled by the
//! command manager's GPU-side waits; this pass only declares its output.

use crate::descriptor::ViewKind;
use crate::errors::{KilnError, Result};
use crate::gpu::queue::QueueClass;
use crate::gpu::resource::{ResourceDesc, ResourceState, ResourceUsage, TextureFormat};
use crate::graph::context::{FrameInputs, InitContext, RenderContext, SetupContext};
use crate::graph::producer::Producer;
use crate::pipeline::PipelineHandle;
use crate::settings::RenderSettings;

/// Logical name of the lighting output texture.
pub const RT_LIGHTING: &str = "rt-lighting";

/// Dispatch tile edge in pixels.
const TILE: u32 = 8;

/// Computes per-pixel raytraced lighting on the compute queue.
pub struct RaytracedLightingPass {
    pipeline: Option<PipelineHandle>,
}

impl RaytracedLightingPass {
    #[must_use]
    pub fn new() -> Self {
        Self { pipeline: None }
    }
}

impl Default for RaytracedLightingPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Producer for RaytracedLightingPass {
    fn name(&self) -> &str {
        "raytraced-lighting"
    }

    fn queue_class(&self) -> QueueClass {
        QueueClass::Compute
    }

    fn enabled(&self, inputs: &FrameInputs, settings: &RenderSettings) -> bool {
        settings.enable_raytracing && !inputs.draw_items.is_empty()
    }

    fn writes(&self) -> &[&'static str] {
        &[RT_LIGHTING]
    }

    fn initialize(&mut self, ctx: &mut InitContext) -> Result<()> {
        self.pipeline = Some(ctx.pipeline("raytraced-lighting")?);
        Ok(())
    }

    fn setup(&mut self, ctx: &mut SetupContext) -> Result<()> {
        let (width, height) = ctx.settings.resolution;
        let desc = ResourceDesc::texture_2d(
            width,
            height,
            TextureFormat::Rgba16Float,
            ResourceUsage::UNORDERED_ACCESS | ResourceUsage::SHADER_RESOURCE,
        );
        ctx.create_or_get(RT_LIGHTING, desc)?;
        ctx.create_view(RT_LIGHTING, ViewKind::UnorderedAccess)?;
        Ok(())
    }

    fn render(&mut self, ctx: &mut RenderContext) -> Result<()> {
        let pipeline = self
            .pipeline
            .clone()
            .ok_or_else(|| KilnError::Pass("raytraced-lighting pipeline not initialized".into()))?;

        ctx.transition(RT_LIGHTING, ResourceState::UnorderedAccess)?;

        let (width, height) = ctx.settings.resolution;
        let commands = ctx.commands();
        commands.set_pipeline(&pipeline);
        commands.dispatch([width.div_ceil(TILE), height.div_ceil(TILE), 1]);
        Ok(())
    }
}
