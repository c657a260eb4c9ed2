//! Frame Graph Tests
//!
//! Tests for:
//! - Scheduler: declared order, two-phase execution, disabled skipping,
//!   failure escalation with producer/phase/frame context
//! - Ordering validation: read-before-write detection at startup
//! - ResourceContext: within-frame idempotency, cross-frame pooling,
//!   redundant-barrier elision, pooled shader-view stability

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use kiln::descriptor::{DescriptorTables, ViewKind};
use kiln::errors::KilnError;
use kiln::gpu::backend::RenderBackend;
use kiln::gpu::command::CommandList;
use kiln::gpu::headless::{HeadlessBackend, HeadlessPipelines};
use kiln::gpu::manager::CommandManager;
use kiln::gpu::queue::QueueClass;
use kiln::gpu::resource::{ResourceDesc, ResourceState, ResourceUsage, TextureFormat};
use kiln::graph::context::FrameInputs;
use kiln::graph::producer::{FnProducer, FramePhase};
use kiln::graph::resources::ResourceContext;
use kiln::graph::scheduler::Scheduler;
use kiln::settings::RenderSettings;
use kiln::upload::frame::FrameUploadAllocator;

type EventLog = Rc<RefCell<Vec<String>>>;

/// Everything Scheduler::run_frame needs, wired to a headless binding.
struct Rig {
    settings: RenderSettings,
    pipelines: HeadlessPipelines,
    commands: CommandManager,
    resources: ResourceContext,
    tables: DescriptorTables,
    upload: FrameUploadAllocator,
}

impl Rig {
    fn new() -> Self {
        let backend: Arc<dyn RenderBackend> = Arc::new(HeadlessBackend::new());
        Self {
            settings: RenderSettings::default(),
            pipelines: HeadlessPipelines::new(),
            commands: CommandManager::new(&backend).unwrap(),
            resources: ResourceContext::new(backend.clone()),
            tables: DescriptorTables::new(64, 256),
            upload: FrameUploadAllocator::new(&backend, 2, 4096),
        }
    }

    fn run(&mut self, scheduler: &mut Scheduler, frame: u64) -> kiln::Result<()> {
        self.upload.begin_frame((frame % 2) as usize)?;
        self.tables.begin_frame();
        self.resources.begin_frame(frame);
        let inputs = FrameInputs::empty();
        let result = scheduler.run_frame(
            &self.settings,
            &inputs,
            frame,
            &self.pipelines,
            &mut self.commands,
            &mut self.resources,
            &mut self.tables,
            &mut self.upload,
        );
        self.resources.end_frame();
        result
    }
}

fn logging_producer(log: &EventLog, name: &'static str, enabled: bool) -> FnProducer {
    let setup_log = log.clone();
    let render_log = log.clone();
    FnProducer::new(name)
        .with_enabled(move |_, _| enabled)
        .with_setup(move |_| {
            setup_log.borrow_mut().push(format!("{name}.setup"));
            Ok(())
        })
        .with_render(move |_| {
            render_log.borrow_mut().push(format!("{name}.render"));
            Ok(())
        })
}

// ============================================================================
// Scheduler
// ============================================================================

#[test]
fn disabled_producers_are_skipped_entirely() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut scheduler = Scheduler::new();
    scheduler.add_producer(Box::new(logging_producer(&log, "a", false)));
    scheduler.add_producer(Box::new(logging_producer(&log, "b", true)));
    scheduler.add_producer(Box::new(logging_producer(&log, "c", true)));

    let mut rig = Rig::new();
    rig.run(&mut scheduler, 0).unwrap();

    // Exactly {b, c} run, in declared order, and every enabled producer's
    // Setup completes before any Render starts.
    assert_eq!(
        *log.borrow(),
        ["b.setup", "c.setup", "b.render", "c.render"]
    );
}

#[test]
fn failing_render_aborts_the_frame_with_context() {
    let log: EventLog = Rc::new(RefCell::new(Vec::new()));
    let mut scheduler = Scheduler::new();
    scheduler.add_producer(Box::new(logging_producer(&log, "a", true)));

    let fail_log = log.clone();
    scheduler.add_producer(Box::new(
        FnProducer::new("broken")
            .with_setup(move |_| {
                fail_log.borrow_mut().push("broken.setup".into());
                Ok(())
            })
            .with_render(|_| Err(KilnError::Pass("shader blew up".into()))),
    ));
    scheduler.add_producer(Box::new(logging_producer(&log, "z", true)));

    let mut rig = Rig::new();
    let err = rig.run(&mut scheduler, 7).unwrap_err();

    match err {
        KilnError::ProducerFailed { producer, phase, frame, .. } => {
            assert_eq!(producer, "broken");
            assert_eq!(phase, FramePhase::Render);
            assert_eq!(frame, 7);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Setup of the later producer ran (phase barrier), its render did not.
    let events = log.borrow();
    assert!(events.contains(&"z.setup".to_string()));
    assert!(!events.contains(&"z.render".to_string()));
}

// ============================================================================
// Ordering validation
// ============================================================================

#[test]
fn validation_rejects_reads_before_writes() {
    let mut scheduler = Scheduler::new();
    scheduler.add_producer(Box::new(
        FnProducer::new("consumer").with_reads(&["shadow-map"]),
    ));

    let err = scheduler.validate(&["backbuffer"]).unwrap_err();
    match err {
        KilnError::OrderingViolation { producer, resource } => {
            assert_eq!(producer, "consumer");
            assert_eq!(resource, "shadow-map");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn validation_accepts_declared_order_and_seeded_names() {
    let mut scheduler = Scheduler::new();
    scheduler.add_producer(Box::new(
        FnProducer::new("shadow").with_writes(&["shadow-map"]),
    ));
    scheduler.add_producer(Box::new(
        FnProducer::new("consumer").with_reads(&["shadow-map", "backbuffer"]),
    ));

    scheduler.validate(&["backbuffer"]).unwrap();
}

// ============================================================================
// ResourceContext
// ============================================================================

fn color_target_desc() -> ResourceDesc {
    ResourceDesc::texture_2d(
        64,
        64,
        TextureFormat::Rgba8Unorm,
        ResourceUsage::RENDER_TARGET | ResourceUsage::SHADER_RESOURCE,
    )
}

fn context() -> ResourceContext {
    let backend: Arc<dyn RenderBackend> = Arc::new(HeadlessBackend::new());
    ResourceContext::new(backend)
}

#[test]
fn create_or_get_is_idempotent_within_a_frame() {
    let mut resources = context();
    let desc = color_target_desc();

    resources.begin_frame(0);
    let first = resources
        .create_or_get("GBufferAlbedo", desc)
        .unwrap()
        .resource
        .clone();
    let second = resources
        .create_or_get("GBufferAlbedo", desc)
        .unwrap()
        .resource
        .clone();
    assert!(first.ptr_eq(&second));
    resources.end_frame();

    // Next frame: same logical name and description, possibly different
    // physical backing (here: the pooled one).
    resources.begin_frame(1);
    let next = resources.create_or_get("GBufferAlbedo", desc).unwrap();
    assert_eq!(next.name, "GBufferAlbedo");
    assert_eq!(next.desc, desc);
    resources.end_frame();
}

#[test]
fn transitions_elide_redundant_barriers() {
    let mut resources = context();
    let mut list = CommandList::new(QueueClass::Graphics);
    list.begin("barriers");

    resources.begin_frame(0);
    resources.create_or_get("target", color_target_desc()).unwrap();

    resources
        .transition("target", ResourceState::RenderTarget, &mut list)
        .unwrap();
    assert_eq!(list.len(), 1);

    // Same state again: nothing recorded.
    resources
        .transition("target", ResourceState::RenderTarget, &mut list)
        .unwrap();
    assert_eq!(list.len(), 1);

    resources
        .transition("target", ResourceState::ShaderResource, &mut list)
        .unwrap();
    assert_eq!(list.len(), 2);
    resources.end_frame();
}

#[test]
fn transition_of_unknown_resource_fails() {
    let mut resources = context();
    let mut list = CommandList::new(QueueClass::Graphics);
    list.begin("missing");

    resources.begin_frame(0);
    let err = resources
        .transition("never-registered", ResourceState::Common, &mut list)
        .unwrap_err();
    assert!(matches!(err, KilnError::UnknownResource(_)));
    resources.end_frame();
}

#[test]
fn pooled_shader_views_keep_their_bindless_index() {
    let mut resources = context();
    let mut tables = DescriptorTables::new(8, 8);
    let desc = color_target_desc();

    resources.begin_frame(0);
    resources.create_or_get("fx", desc).unwrap();
    let srv = resources
        .create_view("fx", ViewKind::ShaderResource, &mut tables)
        .unwrap();
    let srv_again = resources
        .create_view("fx", ViewKind::ShaderResource, &mut tables)
        .unwrap();
    assert_eq!(srv, srv_again);

    let rtv = resources
        .create_view("fx", ViewKind::RenderTarget, &mut tables)
        .unwrap();
    assert_eq!(rtv.gpu_index, None);
    resources.end_frame();

    // New frame, new logical name, same description: the pooled backing is
    // reused and its shader-visible view (and bindless index) travel with
    // it. The CPU-only view does not survive the per-frame reset.
    tables.begin_frame();
    resources.begin_frame(1);
    resources.create_or_get("fx-next", desc).unwrap();
    let srv_reused = resources
        .create_view("fx-next", ViewKind::ShaderResource, &mut tables)
        .unwrap();
    assert_eq!(srv_reused, srv);
    assert_eq!(tables.shader.len(), 1);
    resources.end_frame();
}
