//! Forward Pass
//!
//! Draws the visible set into the back buffer against a persistent depth
//! buffer. Each draw item's world transform goes through the frame upload
//! arena as a 64-byte constant block — the canonical transient-upload
//! pattern the arena exists for.

use crate::descriptor::ViewKind;
use crate::errors::{KilnError, Result};
use crate::gpu::resource::{ResourceDesc, ResourceState, ResourceUsage, TextureFormat};
use crate::graph::context::{InitContext, RenderContext, SetupContext};
use crate::graph::passes::raytrace::RT_LIGHTING;
use crate::graph::producer::Producer;
use crate::pipeline::PipelineHandle;
use crate::renderer::BACKBUFFER;

/// Logical name of the persistent scene depth buffer.
pub const SCENE_DEPTH: &str = "scene-depth";

/// Per-draw constant block uploaded through the frame arena.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DrawConstants {
    world: [f32; 16],
}

/// GPU constant-buffer offset alignment.
const CONSTANT_ALIGN: u64 = 256;

/// Draws the visible set, optionally sampling the raytraced lighting
/// texture produced earlier in the frame on the compute queue.
pub struct ForwardPass {
    pipeline: Option<PipelineHandle>,
    use_raytraced_lighting: bool,
}

impl ForwardPass {
    /// Forward pass without a raytraced-lighting input.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pipeline: None,
            use_raytraced_lighting: false,
        }
    }

    /// Forward pass that samples [`RT_LIGHTING`] when it is available.
    /// Only valid in producer lists that also schedule
    /// [`RaytracedLightingPass`](crate::graph::passes::raytrace::RaytracedLightingPass)
    /// earlier — ordering validation enforces this at startup.
    #[must_use]
    pub fn with_raytraced_input() -> Self {
        Self {
            pipeline: None,
            use_raytraced_lighting: true,
        }
    }
}

impl Default for ForwardPass {
    fn default() -> Self {
        Self::new()
    }
}

impl Producer for ForwardPass {
    fn name(&self) -> &str {
        "forward"
    }

    fn reads(&self) -> &[&'static str] {
        if self.use_raytraced_lighting {
            &[BACKBUFFER, RT_LIGHTING]
        } else {
            &[BACKBUFFER]
        }
    }

    fn writes(&self) -> &[&'static str] {
        &[BACKBUFFER, SCENE_DEPTH]
    }

    fn initialize(&mut self, ctx: &mut InitContext) -> Result<()> {
        let (width, height) = ctx.settings.resolution;
        ctx.create_persistent(
            SCENE_DEPTH,
            ResourceDesc::texture_2d(
                width,
                height,
                TextureFormat::Depth32Float,
                ResourceUsage::DEPTH_STENCIL,
            ),
        )?;
        // Persistent DSV: allocated below the descriptor floor, survives
        // per-frame resets.
        ctx.create_view(SCENE_DEPTH, ViewKind::DepthStencil)?;
        self.pipeline = Some(ctx.pipeline("forward")?);
        Ok(())
    }

    fn setup(&mut self, ctx: &mut SetupContext) -> Result<()> {
        ctx.create_view(BACKBUFFER, ViewKind::RenderTarget)?;
        // The lighting texture only exists when its producer ran this
        // frame; its absence simply means the pipeline shades unlit.
        if self.use_raytraced_lighting && ctx.resources.contains(RT_LIGHTING) {
            ctx.create_view(RT_LIGHTING, ViewKind::ShaderResource)?;
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut RenderContext) -> Result<()> {
        let pipeline = self
            .pipeline
            .clone()
            .ok_or_else(|| KilnError::Pass("forward pipeline not initialized".into()))?;

        ctx.transition(BACKBUFFER, ResourceState::RenderTarget)?;
        ctx.transition(SCENE_DEPTH, ResourceState::DepthWrite)?;
        if self.use_raytraced_lighting && ctx.resources.contains(RT_LIGHTING) {
            ctx.transition(RT_LIGHTING, ResourceState::ShaderResource)?;
        }

        let depth_view = ctx.view(SCENE_DEPTH, ViewKind::DepthStencil)?;
        let depth = ctx.resource(SCENE_DEPTH)?.resource.clone();
        ctx.commands().clear_depth(depth, depth_view, 1.0);

        ctx.commands().set_pipeline(&pipeline);

        let items = ctx.inputs.draw_items;
        for item in items {
            let constants = DrawConstants {
                world: item.transform.to_cols_array(),
            };
            let allocation =
                ctx.upload_bytes(bytemuck::bytes_of(&constants), CONSTANT_ALIGN)?;
            ctx.commands().draw(item.vertex_count, 1, Some(allocation));
        }
        Ok(())
    }
}
