//! Frame Scheduler
//!
//! Holds the declared-order producer list and runs the two-phase frame:
//! enablement is evaluated once for all producers, then every enabled
//! producer's Setup runs, then every enabled producer's Render runs. The
//! phase barrier between Setup and Render is what satisfies cross-producer
//! resource dependencies — no dependency-graph solver, no reordering.
//!
//! # Failure Semantics
//!
//! A producer whose Setup or Render fails is never silently skipped: the
//! scheduler logs the producer name, drops any partially recorded command
//! batch (unsafe to submit), and aborts the frame with
//! [`KilnError::ProducerFailed`] carrying the producer, phase and frame.
//!
//! # Ordering Validation
//!
//! The producer order is declared manually, so [`Scheduler::validate`]
//! checks at startup that no producer reads a logical resource name before
//! some earlier producer writes it (persistent and external names seed the
//! set). Validation assumes every producer enabled — it is a static check
//! that catches ordering bugs before the first frame, not a dynamic one.

use rustc_hash::FxHashSet;

use crate::descriptor::DescriptorTables;
use crate::errors::{KilnError, Result};
use crate::gpu::manager::CommandManager;
use crate::graph::context::{FrameInputs, InitContext, RenderContext, SetupContext};
use crate::graph::producer::{FramePhase, Producer};
use crate::graph::resources::ResourceContext;
use crate::pipeline::PipelineProvider;
use crate::settings::RenderSettings;
use crate::upload::frame::FrameUploadAllocator;

/// Declared-order producer list + two-phase frame execution.
pub struct Scheduler {
    producers: Vec<Box<dyn Producer>>,
    /// Per-frame enablement snapshot, reused across frames.
    enabled: Vec<bool>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            producers: Vec::new(),
            enabled: Vec::new(),
        }
    }

    /// Appends a producer. Producers execute in insertion order, every
    /// frame, for the lifetime of the core.
    pub fn add_producer(&mut self, producer: Box<dyn Producer>) {
        self.producers.push(producer);
    }

    /// Number of registered producers.
    #[inline]
    #[must_use]
    pub fn producer_count(&self) -> usize {
        self.producers.len()
    }

    // ── Startup / shutdown ─────────────────────────────────────────────────

    /// Runs every producer's one-time initialization, in declared order.
    pub fn initialize_all(&mut self, ctx: &mut InitContext, frame: u64) -> Result<()> {
        for producer in &mut self.producers {
            let name = producer.name().to_string();
            if let Err(source) = producer.initialize(ctx) {
                log::error!("producer `{name}` failed during initialize: {source}");
                return Err(KilnError::ProducerFailed {
                    producer: name,
                    phase: FramePhase::Initialize,
                    frame,
                    source: Box::new(source),
                });
            }
        }
        Ok(())
    }

    /// Checks the declared read/write sets against the declared order.
    ///
    /// `provided` seeds the written set with names producers do not create
    /// themselves: external records (the back buffer) and persistent
    /// resources made during initialization.
    pub fn validate(&self, provided: &[&str]) -> Result<()> {
        let mut written: FxHashSet<&str> = provided.iter().copied().collect();
        for producer in &self.producers {
            for read in producer.reads() {
                if !written.contains(read) {
                    return Err(KilnError::OrderingViolation {
                        producer: producer.name().to_string(),
                        resource: (*read).to_string(),
                    });
                }
            }
            for write in producer.writes() {
                written.insert(write);
            }
        }
        Ok(())
    }

    /// Tears producers down in reverse declaration order.
    pub fn shutdown_all(&mut self) {
        for producer in self.producers.iter_mut().rev() {
            producer.shutdown();
        }
    }

    // ── Per-frame execution ────────────────────────────────────────────────

    /// Runs one frame: enablement snapshot, Setup for all enabled
    /// producers, then Render + submit per enabled producer.
    #[allow(clippy::too_many_arguments)]
    pub fn run_frame(
        &mut self,
        settings: &RenderSettings,
        inputs: &FrameInputs,
        frame_index: u64,
        pipelines: &dyn PipelineProvider,
        commands: &mut CommandManager,
        resources: &mut ResourceContext,
        tables: &mut DescriptorTables,
        upload: &mut FrameUploadAllocator,
    ) -> Result<()> {
        // Enablement is decided once, before Setup — not mid-frame.
        self.enabled.clear();
        self.enabled
            .extend(self.producers.iter().map(|p| p.enabled(inputs, settings)));

        // Setup phase: all enabled producers declare resources before any
        // recording starts.
        for (index, producer) in self.producers.iter_mut().enumerate() {
            if !self.enabled[index] {
                continue;
            }
            let name = producer.name().to_string();
            let mut ctx = SetupContext {
                settings,
                inputs,
                frame_index,
                resources: &mut *resources,
                tables: &mut *tables,
                upload: &mut *upload,
                pipelines,
            };
            if let Err(source) = producer.setup(&mut ctx) {
                log::error!("producer `{name}` failed during setup on frame {frame_index}: {source}");
                return Err(KilnError::ProducerFailed {
                    producer: name,
                    phase: FramePhase::Setup,
                    frame: frame_index,
                    source: Box::new(source),
                });
            }
        }

        // Render phase: record and submit per producer, in declared order.
        for (index, producer) in self.producers.iter_mut().enumerate() {
            if !self.enabled[index] {
                continue;
            }
            let name = producer.name().to_string();
            let class = producer.queue_class();
            let mut list = commands.allocate_command_list(class, &name);
            {
                let mut ctx = RenderContext {
                    settings,
                    inputs,
                    frame_index,
                    resources: &mut *resources,
                    upload: &mut *upload,
                    pipelines,
                    list: &mut list,
                };
                if let Err(source) = producer.render(&mut ctx) {
                    // The partially recorded list is dropped, never submitted.
                    log::error!(
                        "producer `{name}` failed during render on frame {frame_index}: {source}"
                    );
                    return Err(KilnError::ProducerFailed {
                        producer: name,
                        phase: FramePhase::Render,
                        frame: frame_index,
                        source: Box::new(source),
                    });
                }
            }
            commands.submit(list)?;
        }

        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
