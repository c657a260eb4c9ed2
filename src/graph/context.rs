//! Frame Contexts
//!
//! Phase-separated contexts handed to producers:
//!
//! - [`InitContext`]: one-time initialization. Persistent resources and
//!   pipeline lookups happen here, never per frame.
//! - [`SetupContext`]: mutable per-frame context for the **Setup** phase.
//!   Producers declare/create their inputs and outputs here.
//! - [`RenderContext`]: per-frame context for the **Render** phase.
//!   Producers record commands into the pooled recording context; resource
//!   *creation* is over, only state transitions and uploads remain.
//!
//! The contexts store individual references to engine subsystems so the
//! borrow checker can split borrows across disjoint fields — the same
//! field-level splitting the rest of the core relies on.

use glam::Mat4;

use crate::descriptor::{DescriptorSlot, DescriptorTables, ViewKind};
use crate::errors::{KilnError, Result};
use crate::gpu::command::CommandList;
use crate::gpu::resource::{ResourceDesc, ResourceState};
use crate::graph::resources::{ResourceContext, ResourceRecord};
use crate::pipeline::{PipelineHandle, PipelineProvider};
use crate::settings::{Color, RenderSettings};
use crate::upload::frame::FrameUploadAllocator;
use crate::upload::linear::MemoryAllocation;

// ─── Frame Inputs ─────────────────────────────────────────────────────────────

/// One visible draw item from the scene collaborator: an already-culled
/// mesh/material pair with its world transform. Handles are opaque to the
/// core — only the collaborator's pipeline objects interpret them.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub mesh: u64,
    pub material: u64,
    pub transform: Mat4,
    /// Vertex count of the mesh's draw range.
    pub vertex_count: u32,
}

/// Everything the outside world feeds into one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    /// The visible set, already culled, in draw order.
    pub draw_items: &'a [DrawItem],
    /// Scene time in seconds.
    pub time: f32,
    /// Per-frame clear-color override; `None` uses the configured color.
    pub background: Option<Color>,
}

impl FrameInputs<'_> {
    /// Inputs with an empty visible set.
    #[must_use]
    pub const fn empty() -> Self {
        FrameInputs {
            draw_items: &[],
            time: 0.0,
            background: None,
        }
    }
}

impl Default for FrameInputs<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

// ─── InitContext ──────────────────────────────────────────────────────────────

/// One-time initialization context: persistent resources and pipelines.
pub struct InitContext<'a> {
    pub settings: &'a RenderSettings,
    pub resources: &'a mut ResourceContext,
    pub tables: &'a mut DescriptorTables,
    pub pipelines: &'a dyn PipelineProvider,
}

impl InitContext<'_> {
    /// Creates an engine-lifetime resource.
    pub fn create_persistent(&mut self, name: &str, desc: ResourceDesc) -> Result<()> {
        self.resources.create_persistent(name, desc)?;
        Ok(())
    }

    /// Binds a view to a persistent resource. Views created here land below
    /// the persistent descriptor floor and survive per-frame resets.
    pub fn create_view(&mut self, name: &str, kind: ViewKind) -> Result<DescriptorSlot> {
        self.resources.create_view(name, kind, self.tables)
    }

    /// Looks up a compiled pipeline-state object by name.
    pub fn pipeline(&self, name: &str) -> Result<PipelineHandle> {
        self.pipelines.pipeline(name)
    }
}

// ─── SetupContext ─────────────────────────────────────────────────────────────

/// Mutable context for the per-frame **Setup** phase.
pub struct SetupContext<'a> {
    pub settings: &'a RenderSettings,
    pub inputs: &'a FrameInputs<'a>,
    pub frame_index: u64,
    pub resources: &'a mut ResourceContext,
    pub tables: &'a mut DescriptorTables,
    pub upload: &'a mut FrameUploadAllocator,
    pub pipelines: &'a dyn PipelineProvider,
}

impl SetupContext<'_> {
    /// Registers (or returns) the named resource for the active frame.
    pub fn create_or_get(&mut self, name: &str, desc: ResourceDesc) -> Result<&mut ResourceRecord> {
        self.resources.create_or_get(name, desc)
    }

    /// Binds a view of `kind` to the named record.
    pub fn create_view(&mut self, name: &str, kind: ViewKind) -> Result<DescriptorSlot> {
        self.resources.create_view(name, kind, self.tables)
    }

    /// Looks up a compiled pipeline-state object by name.
    pub fn pipeline(&self, name: &str) -> Result<PipelineHandle> {
        self.pipelines.pipeline(name)
    }
}

// ─── RenderContext ────────────────────────────────────────────────────────────

/// Per-producer context for the **Render** phase, wrapping the pooled
/// recording context the scheduler allocated for this producer.
pub struct RenderContext<'a> {
    pub settings: &'a RenderSettings,
    pub inputs: &'a FrameInputs<'a>,
    pub frame_index: u64,
    pub resources: &'a mut ResourceContext,
    pub upload: &'a mut FrameUploadAllocator,
    pub pipelines: &'a dyn PipelineProvider,
    pub(crate) list: &'a mut CommandList,
}

impl RenderContext<'_> {
    /// The recording context this producer's commands go into.
    #[inline]
    pub fn commands(&mut self) -> &mut CommandList {
        self.list
    }

    /// Transitions the named resource, recording a barrier if needed.
    pub fn transition(&mut self, name: &str, to: ResourceState) -> Result<()> {
        self.resources.transition(name, to, self.list)
    }

    /// The named resource record (active frame, then persistent).
    pub fn resource(&self, name: &str) -> Result<&ResourceRecord> {
        self.resources
            .get(name)
            .ok_or_else(|| KilnError::UnknownResource(name.to_string()))
    }

    /// A view created during Setup (or initialization). Render never
    /// creates views — a missing one is a pass bug, reported as such.
    pub fn view(&self, name: &str, kind: ViewKind) -> Result<DescriptorSlot> {
        self.resource(name)?.view(kind).ok_or_else(|| {
            KilnError::Pass(format!(
                "no {} view was created for `{name}` during setup",
                kind.name()
            ))
        })
    }

    /// Copies `data` into the active frame slot's upload arena and returns
    /// the allocation (for constants, staging, per-draw data).
    pub fn upload_bytes(&mut self, data: &[u8], align: u64) -> Result<MemoryAllocation> {
        self.upload.allocate_and_write(data, align)
    }
}
