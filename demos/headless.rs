//! Headless demo: a full frame loop with no window and no GPU.
//!
//! Builds the core on the in-process binding, schedules the built-in
//! producers, renders a handful of frames with a spinning quad, and prints
//! the allocator/pool statistics at the end.
//!
//! ```text
//! RUST_LOG=debug cargo run --example headless
//! ```

use std::sync::Arc;

use glam::Mat4;

use kiln::gpu::headless::{HeadlessBackend, HeadlessPipelines, HeadlessSurface};
use kiln::gpu::queue::QueueClass;
use kiln::graph::context::{DrawItem, FrameInputs};
use kiln::graph::passes::{ClearPass, ForwardPass, RaytracedLightingPass};
use kiln::renderer::RenderCore;
use kiln::settings::RenderSettings;

const FRAMES: u64 = 8;

fn main() -> kiln::Result<()> {
    env_logger::init();

    let settings = RenderSettings {
        enable_raytracing: true,
        resolution: (1920, 1080),
        ..Default::default()
    };

    let backend = Arc::new(HeadlessBackend::new());
    let pipelines = Arc::new(HeadlessPipelines::new());
    let mut surface = HeadlessSurface::new(backend.as_ref(), settings.resolution, 2)?;

    let mut core = RenderCore::new(backend.clone(), pipelines, settings)?;
    core.add_producer(Box::new(ClearPass));
    core.add_producer(Box::new(RaytracedLightingPass::new()));
    core.add_producer(Box::new(ForwardPass::with_raytraced_input()));
    core.initialize()?;

    for frame in 0..FRAMES {
        let time = frame as f32 / 60.0;
        let items = [DrawItem {
            mesh: 1,
            material: 1,
            transform: Mat4::from_rotation_z(time),
            vertex_count: 6,
        }];
        let inputs = FrameInputs {
            draw_items: &items,
            time,
            background: None,
        };
        core.render_frame(&mut surface, &inputs)?;
    }

    println!("presented {} frames", surface.presented());
    println!(
        "upload arenas: slot 0 reset {}x over {} page(s), slot 1 reset {}x over {} page(s)",
        core.upload().reset_count(0),
        core.upload().page_count(0),
        core.upload().reset_count(1),
        core.upload().page_count(1),
    );
    for class in QueueClass::ALL {
        let pool = core.command_manager().pool(class);
        println!(
            "{} lists: {} created, {} pooled, {} in flight",
            class.name(),
            pool.created(),
            pool.pooled(),
            pool.in_flight(),
        );
    }
    println!(
        "descriptors: {} cpu views, {} shader views; {} pooled backings",
        core.descriptor_tables().cpu.len(),
        core.descriptor_tables().shader.len(),
        core.resources().pooled_count(),
    );

    core.shutdown()
}
