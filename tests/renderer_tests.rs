//! Render Core End-to-End Tests
//!
//! Full frames on the headless binding:
//! - present-per-frame and frame counting
//! - frame-slot arena rotation across the pipeline depth
//! - raytracing gating (configuration + empty visible set)
//! - producer failure → aborted frame, core stays usable
//! - startup ordering validation
//! - resize re-initialization of persistent resources

use std::sync::Arc;

use glam::Mat4;

use kiln::errors::KilnError;
use kiln::gpu::headless::{HeadlessBackend, HeadlessPipelines, HeadlessSurface};
use kiln::gpu::resource::ResourceKind;
use kiln::graph::context::{DrawItem, FrameInputs};
use kiln::graph::passes::{ClearPass, ForwardPass, RaytracedLightingPass, SCENE_DEPTH};
use kiln::graph::producer::{FnProducer, FramePhase};
use kiln::renderer::RenderCore;
use kiln::settings::RenderSettings;

fn setup(
    settings: RenderSettings,
    raytraced: bool,
) -> (RenderCore, HeadlessSurface, Arc<HeadlessBackend>) {
    let backend = Arc::new(HeadlessBackend::new());
    let pipelines = Arc::new(HeadlessPipelines::new());
    let surface = HeadlessSurface::new(backend.as_ref(), settings.resolution, 2).unwrap();

    let mut core = RenderCore::new(backend.clone(), pipelines, settings).unwrap();
    core.add_producer(Box::new(ClearPass));
    if raytraced {
        core.add_producer(Box::new(RaytracedLightingPass::new()));
        core.add_producer(Box::new(ForwardPass::with_raytraced_input()));
    } else {
        core.add_producer(Box::new(ForwardPass::new()));
    }
    core.initialize().unwrap();
    (core, surface, backend)
}

fn one_triangle() -> Vec<DrawItem> {
    vec![DrawItem {
        mesh: 1,
        material: 1,
        transform: Mat4::IDENTITY,
        vertex_count: 3,
    }]
}

fn inputs(items: &[DrawItem]) -> FrameInputs<'_> {
    FrameInputs {
        draw_items: items,
        time: 0.0,
        background: None,
    }
}

// ============================================================================
// Frame loop
// ============================================================================

#[test]
fn renders_and_presents_each_frame() {
    let (mut core, mut surface, _backend) = setup(RenderSettings::default(), false);
    let items = one_triangle();

    for _ in 0..4 {
        core.render_frame(&mut surface, &inputs(&items)).unwrap();
    }

    assert_eq!(surface.presented(), 4);
    assert_eq!(core.frame_index(), 4);
}

#[test]
fn frame_slots_rotate_across_the_pipeline_depth() {
    let settings = RenderSettings {
        max_frames_in_flight: 2,
        ..Default::default()
    };
    let (mut core, mut surface, _backend) = setup(settings, false);
    let items = one_triangle();

    for _ in 0..4 {
        core.render_frame(&mut surface, &inputs(&items)).unwrap();
    }

    // Slot 0 carried frames 0 and 2, slot 1 carried frames 1 and 3; each
    // reset happened only after its recorded fences completed (enforced
    // structurally by the arena).
    assert_eq!(core.upload().reset_count(0), 2);
    assert_eq!(core.upload().reset_count(1), 2);
}

// ============================================================================
// Raytracing gating
// ============================================================================

#[test]
fn raytracing_disabled_by_configuration_costs_nothing() {
    let (mut core, mut surface, backend) = setup(RenderSettings::default(), true);
    let items = one_triangle();

    core.render_frame(&mut surface, &inputs(&items)).unwrap();

    let retired = backend.take_retired();
    assert!(retired.iter().all(|r| r.label != "raytraced-lighting"));
    assert!(retired.iter().any(|r| r.label == "forward"));
}

#[test]
fn raytracing_disabled_by_empty_visible_set() {
    let settings = RenderSettings {
        enable_raytracing: true,
        ..Default::default()
    };
    let (mut core, mut surface, backend) = setup(settings, true);

    core.render_frame(&mut surface, &FrameInputs::empty()).unwrap();

    let retired = backend.take_retired();
    assert!(retired.iter().all(|r| r.label != "raytraced-lighting"));
}

#[test]
fn raytraced_lighting_retires_before_its_graphics_consumer() {
    let settings = RenderSettings {
        enable_raytracing: true,
        ..Default::default()
    };
    let (mut core, mut surface, backend) = setup(settings, true);
    let items = one_triangle();

    core.render_frame(&mut surface, &inputs(&items)).unwrap();

    let labels: Vec<String> = backend.take_retired().into_iter().map(|r| r.label).collect();
    let lighting = labels.iter().position(|l| l == "raytraced-lighting");
    let forward = labels.iter().position(|l| l == "forward");
    assert!(lighting.is_some() && forward.is_some());
    assert!(lighting < forward);
}

// ============================================================================
// Failure semantics
// ============================================================================

#[test]
fn aborted_frame_is_not_presented_and_core_recovers() {
    let backend = Arc::new(HeadlessBackend::new());
    let pipelines = Arc::new(HeadlessPipelines::new());
    let settings = RenderSettings::default();
    let mut surface = HeadlessSurface::new(backend.as_ref(), settings.resolution, 2).unwrap();

    let mut core = RenderCore::new(backend, pipelines, settings).unwrap();
    core.add_producer(Box::new(ClearPass));
    let mut fail_once = true;
    core.add_producer(Box::new(FnProducer::new("flaky").with_render(move |_| {
        if fail_once {
            fail_once = false;
            return Err(KilnError::Pass("transient device trouble".into()));
        }
        Ok(())
    })));
    core.initialize().unwrap();

    let err = core
        .render_frame(&mut surface, &FrameInputs::empty())
        .unwrap_err();
    match err {
        KilnError::ProducerFailed { producer, phase, frame, .. } => {
            assert_eq!(producer, "flaky");
            assert_eq!(phase, FramePhase::Render);
            assert_eq!(frame, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(surface.presented(), 0);
    assert_eq!(core.frame_index(), 0);

    // The next frame goes through untouched.
    core.render_frame(&mut surface, &FrameInputs::empty()).unwrap();
    assert_eq!(surface.presented(), 1);
    assert_eq!(core.frame_index(), 1);
}

#[test]
fn initialize_rejects_reads_with_no_earlier_writer() {
    let backend = Arc::new(HeadlessBackend::new());
    let pipelines = Arc::new(HeadlessPipelines::new());
    let settings = RenderSettings::default();

    let mut core = RenderCore::new(backend, pipelines, settings).unwrap();
    core.add_producer(Box::new(ClearPass));
    // Declares a read of the lighting texture, but nothing produces it.
    core.add_producer(Box::new(ForwardPass::with_raytraced_input()));

    let err = core.initialize().unwrap_err();
    assert!(matches!(err, KilnError::OrderingViolation { .. }));
}

// ============================================================================
// Resize
// ============================================================================

#[test]
fn resize_rebuilds_persistent_resources_at_the_new_size() {
    let (mut core, mut surface, _backend) = setup(RenderSettings::default(), false);
    let items = one_triangle();

    core.render_frame(&mut surface, &inputs(&items)).unwrap();
    core.resize((640, 360)).unwrap();

    let depth = core.resources().get(SCENE_DEPTH).unwrap();
    match depth.desc.kind {
        ResourceKind::Texture2D { width, height, .. } => {
            assert_eq!((width, height), (640, 360));
        }
        ResourceKind::Buffer { .. } => panic!("depth buffer is not a buffer"),
    }

    core.render_frame(&mut surface, &inputs(&items)).unwrap();
    core.shutdown().unwrap();
}
