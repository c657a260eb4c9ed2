//! Render Core
//!
//! [`RenderCore`] is the explicit owner of the whole frame-execution stack:
//! command manager, upload arenas, descriptor tables, resource registry and
//! the producer scheduler. It is constructed once at startup and passed by
//! reference wherever it is needed — there is no global instance and no
//! hidden mutable state.
//!
//! # Frame Loop
//!
//! ```text
//! render_frame(surface, inputs)
//!   ├─ rotate frame slot, CPU-wait that slot's recorded fences   (the ONLY
//!   │  blocking wait on the hot path — bounded-depth pipelining)
//!   ├─ fence-gated arena reset + per-frame descriptor/registry reset
//!   ├─ acquire back buffer, register it as `backbuffer`
//!   ├─ scheduler: enablement → Setup (all) → Render+submit (each)
//!   ├─ record the Present transition, submit
//!   ├─ surface.present
//!   └─ signal used queues; record the signals against this frame slot
//! ```
//!
//! A single CPU thread drives this sequence; GPU execution is asynchronous
//! behind the queues and fences. The stop-the-world [`flush`] lives inside
//! [`resize`](RenderCore::resize) and [`shutdown`](RenderCore::shutdown)
//! only.
//!
//! [`flush`]: crate::gpu::manager::CommandManager::flush

use std::sync::Arc;

use smallvec::SmallVec;

use crate::descriptor::DescriptorTables;
use crate::errors::{KilnError, Result};
use crate::gpu::backend::{RenderBackend, Surface};
use crate::gpu::fence::FenceValue;
use crate::gpu::manager::CommandManager;
use crate::gpu::queue::QueueClass;
use crate::gpu::resource::ResourceState;
use crate::graph::context::{FrameInputs, InitContext};
use crate::graph::producer::Producer;
use crate::graph::resources::ResourceContext;
use crate::graph::scheduler::Scheduler;
use crate::pipeline::PipelineProvider;
use crate::settings::RenderSettings;
use crate::upload::frame::FrameUploadAllocator;

/// Logical name the core registers the acquired back buffer under.
pub const BACKBUFFER: &str = "backbuffer";

type SlotFences = SmallVec<[(QueueClass, FenceValue); 3]>;

/// The frame-execution core. One value, explicit ownership, no singletons.
pub struct RenderCore {
    backend: Arc<dyn RenderBackend>,
    settings: RenderSettings,
    commands: CommandManager,
    upload: FrameUploadAllocator,
    tables: DescriptorTables,
    resources: ResourceContext,
    scheduler: Scheduler,
    pipelines: Arc<dyn PipelineProvider>,
    frame_index: u64,
    /// Per frame slot: the signals issued when that slot's frame ended.
    slot_fences: Vec<SlotFences>,
    initialized: bool,
}

impl RenderCore {
    /// Builds the core on a binding. Queue or table creation failure is a
    /// fatal initialization error — there is no degraded mode.
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        pipelines: Arc<dyn PipelineProvider>,
        settings: RenderSettings,
    ) -> Result<Self> {
        settings.validate()?;
        log::info!(
            "initializing frame core on `{}` ({} frames in flight, {}x{})",
            backend.name(),
            settings.max_frames_in_flight,
            settings.resolution.0,
            settings.resolution.1
        );

        let commands = CommandManager::new(&backend)?;
        let upload = FrameUploadAllocator::new(
            &backend,
            settings.max_frames_in_flight,
            settings.upload_page_size,
        );
        let tables =
            DescriptorTables::new(settings.view_table_capacity, settings.shader_table_capacity);
        let resources = ResourceContext::new(Arc::clone(&backend));
        let slot_fences = vec![SlotFences::new(); settings.max_frames_in_flight as usize];

        Ok(Self {
            backend,
            settings,
            commands,
            upload,
            tables,
            resources,
            scheduler: Scheduler::new(),
            pipelines,
            frame_index: 0,
            slot_fences,
            initialized: false,
        })
    }

    /// Appends a producer to the declared execution order. Call before
    /// [`initialize`](Self::initialize).
    pub fn add_producer(&mut self, producer: Box<dyn Producer>) {
        if self.initialized {
            log::warn!(
                "producer `{}` added after initialization; it will miss its initialize phase until the next resize",
                producer.name()
            );
        }
        self.scheduler.add_producer(producer);
    }

    /// Runs every producer's one-time initialization, freezes the
    /// persistent descriptor floor, and validates the declared ordering.
    pub fn initialize(&mut self) -> Result<()> {
        let mut ctx = InitContext {
            settings: &self.settings,
            resources: &mut self.resources,
            tables: &mut self.tables,
            pipelines: self.pipelines.as_ref(),
        };
        self.scheduler.initialize_all(&mut ctx, self.frame_index)?;
        self.tables.freeze_persistent();

        let mut provided: Vec<&str> = vec![BACKBUFFER];
        provided.extend(self.resources.persistent_names());
        self.scheduler.validate(&provided)?;

        self.initialized = true;
        log::info!(
            "frame core initialized: {} producers, {} persistent descriptors",
            self.scheduler.producer_count(),
            self.tables.cpu.len() + self.tables.shader.len()
        );
        Ok(())
    }

    // ── Per-frame ──────────────────────────────────────────────────────────

    /// Executes one frame and presents it.
    ///
    /// On a producer failure the frame is aborted: per-frame registrations
    /// are dropped, nothing is presented, and the error carries the
    /// producer's name and phase. The core stays usable for the next frame.
    pub fn render_frame(&mut self, surface: &mut dyn Surface, inputs: &FrameInputs) -> Result<()> {
        if !self.initialized {
            log::debug!("render_frame before initialize; initializing now");
            self.initialize()?;
        }

        let slot = (self.frame_index % u64::from(self.settings.max_frames_in_flight)) as usize;

        // Bounded-depth pipelining: the one blocking wait on the hot path.
        let pending = std::mem::take(&mut self.slot_fences[slot]);
        for (class, value) in &pending {
            self.commands.queue(*class).wait_until(*value)?;
        }

        self.upload.begin_frame(slot)?;
        self.tables.begin_frame();
        self.resources.begin_frame(self.frame_index);

        let result = self.execute_frame(surface, inputs, slot);

        if result.is_err() {
            // The frame aborted mid-way. Whatever was already submitted is
            // still on the GPU; fence it off so slot reuse waits for it.
            if let Ok(signals) = self.commands.signal_used() {
                self.upload.end_frame(
                    slot,
                    signals.iter().map(|s| (s.observer.clone(), s.value)),
                );
                self.slot_fences[slot] = signals.iter().map(|s| (s.class, s.value)).collect();
            }
        }

        // Transient registrations are invalidated whether the frame
        // completed or aborted; a half-built frame must not leak into the
        // next one.
        self.resources.end_frame();

        if result.is_ok() {
            self.frame_index += 1;
        }
        result
    }

    fn execute_frame(
        &mut self,
        surface: &mut dyn Surface,
        inputs: &FrameInputs,
        slot: usize,
    ) -> Result<()> {
        let frame = surface.acquire()?;
        self.resources.register_external(BACKBUFFER, frame.resource.clone());

        self.scheduler.run_frame(
            &self.settings,
            inputs,
            self.frame_index,
            self.pipelines.as_ref(),
            &mut self.commands,
            &mut self.resources,
            &mut self.tables,
            &mut self.upload,
        )?;

        // Hand the back buffer to the surface in the state it expects.
        let mut list = self
            .commands
            .allocate_command_list(QueueClass::Graphics, "present");
        self.resources
            .transition(BACKBUFFER, ResourceState::Present, &mut list)?;
        self.commands.submit(list)?;

        surface.present(frame)?;

        // One signal per queue that worked this frame; these gate both the
        // slot's arena reset and the slot-reuse wait next time around.
        let signals = self.commands.signal_used()?;
        self.upload.end_frame(
            slot,
            signals.iter().map(|s| (s.observer.clone(), s.value)),
        );
        self.slot_fences[slot] = signals.iter().map(|s| (s.class, s.value)).collect();
        Ok(())
    }

    // ── Stop-the-world operations ──────────────────────────────────────────

    /// Changes the output resolution: drains the GPU, rebuilds persistent
    /// resources and views at the new size, drops stale pooled backings.
    pub fn resize(&mut self, resolution: (u32, u32)) -> Result<()> {
        if resolution == self.settings.resolution {
            return Ok(());
        }
        if resolution.0 == 0 || resolution.1 == 0 {
            return Err(KilnError::InvalidSettings(format!(
                "resolution must be non-zero, got {}x{}",
                resolution.0, resolution.1
            )));
        }
        log::info!(
            "resizing {}x{} -> {}x{}",
            self.settings.resolution.0,
            self.settings.resolution.1,
            resolution.0,
            resolution.1
        );

        self.commands.flush()?;
        self.settings.resolution = resolution;

        self.resources.clear_persistent();
        self.resources.trim(0);
        self.tables.reset_all();

        let mut ctx = InitContext {
            settings: &self.settings,
            resources: &mut self.resources,
            tables: &mut self.tables,
            pipelines: self.pipelines.as_ref(),
        };
        self.scheduler.initialize_all(&mut ctx, self.frame_index)?;
        self.tables.freeze_persistent();
        Ok(())
    }

    /// Drains the GPU and tears producers down, symmetric with
    /// initialization. The core is inert afterwards.
    pub fn shutdown(&mut self) -> Result<()> {
        log::info!("shutting down frame core after {} frames", self.frame_index);
        self.commands.flush()?;
        self.scheduler.shutdown_all();
        self.resources.clear_persistent();
        self.resources.trim(0);
        self.initialized = false;
        Ok(())
    }

    // ── Introspection ──────────────────────────────────────────────────────

    /// The active settings.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Absolute index of the next frame to render.
    #[inline]
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The binding this core runs on.
    #[inline]
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn RenderBackend> {
        &self.backend
    }

    /// Queue/pool diagnostics.
    #[inline]
    #[must_use]
    pub fn command_manager(&self) -> &CommandManager {
        &self.commands
    }

    /// Upload arena diagnostics.
    #[inline]
    #[must_use]
    pub fn upload(&self) -> &FrameUploadAllocator {
        &self.upload
    }

    /// Resource registry diagnostics.
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &ResourceContext {
        &self.resources
    }

    /// Descriptor table diagnostics.
    #[inline]
    #[must_use]
    pub fn descriptor_tables(&self) -> &DescriptorTables {
        &self.tables
    }
}
