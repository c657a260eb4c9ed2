//! Frame-Clear Pass
//!
//! First producer of the frame: transitions the back buffer out of its
//! presented state and clears it to the configured color (or the per-frame
//! background override from the scene).

use crate::descriptor::ViewKind;
use crate::errors::Result;
use crate::gpu::resource::ResourceState;
use crate::graph::context::{RenderContext, SetupContext};
use crate::graph::producer::Producer;
use crate::renderer::BACKBUFFER;

/// Clears the back buffer at the start of the frame.
pub struct ClearPass;

impl Producer for ClearPass {
    fn name(&self) -> &str {
        "clear"
    }

    fn writes(&self) -> &[&'static str] {
        &[BACKBUFFER]
    }

    fn setup(&mut self, ctx: &mut SetupContext) -> Result<()> {
        // A fresh RTV per frame from the streaming CPU table region.
        ctx.create_view(BACKBUFFER, ViewKind::RenderTarget)?;
        Ok(())
    }

    fn render(&mut self, ctx: &mut RenderContext) -> Result<()> {
        let color = ctx
            .inputs
            .background
            .unwrap_or(ctx.settings.clear_color)
            .to_array();

        ctx.transition(BACKBUFFER, ResourceState::RenderTarget)?;

        let view = ctx.view(BACKBUFFER, ViewKind::RenderTarget)?;
        let resource = ctx.resource(BACKBUFFER)?.resource.clone();
        ctx.commands().clear_target(resource, view, color);
        Ok(())
    }
}
