//! Producers
//!
//! A producer is one scheduled unit of render work: declared enablement,
//! declared resource inputs/outputs, and Setup/Render callbacks. Producers
//! are created once at renderer initialization, execute in declared order
//! every frame, and are torn down only at shutdown.
//!
//! # Per-Frame State Machine
//!
//! | State      | Meaning                                                   |
//! |------------|-----------------------------------------------------------|
//! | Disabled   | [`enabled`](Producer::enabled) returned `false` — skipped entirely, no resource or command cost |
//! | Setup      | Declares/creates inputs and outputs via the resource registry; runs for every enabled producer before any Render |
//! | Render     | Records GPU commands into a pooled recording context, which the scheduler submits |
//!
//! The Setup/Render split is what lets a later producer depend on a
//! resource an earlier producer created, without reordering: all
//! declarations land before any recording starts.

use crate::errors::Result;
use crate::graph::context::{FrameInputs, InitContext, RenderContext, SetupContext};
use crate::gpu::queue::QueueClass;
use crate::settings::RenderSettings;

// ─── FramePhase ───────────────────────────────────────────────────────────────

/// The phase a producer callback runs in; carried in failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Initialize,
    Setup,
    Render,
}

impl std::fmt::Display for FramePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initialize => "initialize",
            Self::Setup => "setup",
            Self::Render => "render",
        };
        f.write_str(name)
    }
}

// ─── Producer ─────────────────────────────────────────────────────────────────

/// One render pass in the declared-order producer list.
pub trait Producer {
    /// Producer name, used in logs, error context and batch labels.
    fn name(&self) -> &str;

    /// Which queue class this producer's commands submit to.
    fn queue_class(&self) -> QueueClass {
        QueueClass::Graphics
    }

    /// Enablement predicate, evaluated once per frame before Setup.
    ///
    /// A disabled producer is skipped entirely — neither Setup nor Render
    /// runs, and no resources are touched.
    fn enabled(&self, _inputs: &FrameInputs, _settings: &RenderSettings) -> bool {
        true
    }

    /// Logical resource names this producer reads. Used by startup ordering
    /// validation; an empty slice declares no cross-producer inputs.
    fn reads(&self) -> &[&'static str] {
        &[]
    }

    /// Logical resource names this producer writes/creates.
    fn writes(&self) -> &[&'static str] {
        &[]
    }

    /// One-time creation of persistent resources and pipeline lookups.
    /// Runs once at engine startup (and again after a resize
    /// re-initialization), never per frame.
    fn initialize(&mut self, _ctx: &mut InitContext) -> Result<()> {
        Ok(())
    }

    /// Per-frame resource declaration. Runs for every enabled producer
    /// before any producer's Render.
    fn setup(&mut self, ctx: &mut SetupContext) -> Result<()>;

    /// Per-frame command recording into `ctx`'s recording context.
    fn render(&mut self, ctx: &mut RenderContext) -> Result<()>;

    /// Teardown at engine shutdown, symmetric with initialization.
    fn shutdown(&mut self) {}
}

// ─── FnProducer ───────────────────────────────────────────────────────────────

type EnabledFn = Box<dyn Fn(&FrameInputs, &RenderSettings) -> bool>;
type InitFn = Box<dyn FnMut(&mut InitContext) -> Result<()>>;
type SetupFn = Box<dyn FnMut(&mut SetupContext) -> Result<()>>;
type RenderFn = Box<dyn FnMut(&mut RenderContext) -> Result<()>>;

/// Function-bundle producer: `{name, enabled, setup, render}` closures
/// instead of a trait implementation. Handy for small passes and tests.
///
/// ```rust
/// use kiln::graph::producer::FnProducer;
///
/// let pass = FnProducer::new("debug-overlay")
///     .with_enabled(|_, settings| settings.enable_raytracing)
///     .with_render(|ctx| {
///         ctx.commands().draw(3, 1, None);
///         Ok(())
///     });
/// # let _ = pass;
/// ```
pub struct FnProducer {
    name: String,
    queue: QueueClass,
    reads: Vec<&'static str>,
    writes: Vec<&'static str>,
    enabled: EnabledFn,
    init: Option<InitFn>,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
}

impl FnProducer {
    /// Creates an always-enabled graphics-queue producer with no-op phases.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: QueueClass::Graphics,
            reads: Vec::new(),
            writes: Vec::new(),
            enabled: Box::new(|_, _| true),
            init: None,
            setup: None,
            render: None,
        }
    }

    /// Sets the queue class.
    #[must_use]
    pub fn on_queue(mut self, queue: QueueClass) -> Self {
        self.queue = queue;
        self
    }

    /// Declares read dependencies.
    #[must_use]
    pub fn with_reads(mut self, reads: &[&'static str]) -> Self {
        self.reads = reads.to_vec();
        self
    }

    /// Declares written/created resources.
    #[must_use]
    pub fn with_writes(mut self, writes: &[&'static str]) -> Self {
        self.writes = writes.to_vec();
        self
    }

    /// Sets the enablement predicate.
    #[must_use]
    pub fn with_enabled(
        mut self,
        enabled: impl Fn(&FrameInputs, &RenderSettings) -> bool + 'static,
    ) -> Self {
        self.enabled = Box::new(enabled);
        self
    }

    /// Sets the initialize callback.
    #[must_use]
    pub fn with_initialize(
        mut self,
        init: impl FnMut(&mut InitContext) -> Result<()> + 'static,
    ) -> Self {
        self.init = Some(Box::new(init));
        self
    }

    /// Sets the setup callback.
    #[must_use]
    pub fn with_setup(
        mut self,
        setup: impl FnMut(&mut SetupContext) -> Result<()> + 'static,
    ) -> Self {
        self.setup = Some(Box::new(setup));
        self
    }

    /// Sets the render callback.
    #[must_use]
    pub fn with_render(
        mut self,
        render: impl FnMut(&mut RenderContext) -> Result<()> + 'static,
    ) -> Self {
        self.render = Some(Box::new(render));
        self
    }
}

impl Producer for FnProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn queue_class(&self) -> QueueClass {
        self.queue
    }

    fn enabled(&self, inputs: &FrameInputs, settings: &RenderSettings) -> bool {
        (self.enabled)(inputs, settings)
    }

    fn reads(&self) -> &[&'static str] {
        &self.reads
    }

    fn writes(&self) -> &[&'static str] {
        &self.writes
    }

    fn initialize(&mut self, ctx: &mut InitContext) -> Result<()> {
        match &mut self.init {
            Some(init) => init(ctx),
            None => Ok(()),
        }
    }

    fn setup(&mut self, ctx: &mut SetupContext) -> Result<()> {
        match &mut self.setup {
            Some(setup) => setup(ctx),
            None => Ok(()),
        }
    }

    fn render(&mut self, ctx: &mut RenderContext) -> Result<()> {
        match &mut self.render {
            Some(render) => render(ctx),
            None => Ok(()),
        }
    }
}
