//! Command Recording
//!
//! [`CommandList`] is the thin recording façade producers write into: a
//! scheduling-level command stream (transitions, clears, upload copies,
//! draws, dispatches) that the graphics-API binding translates into real
//! command buffers at submission time. Pixel-level semantics live behind
//! [`PipelineHandle`]s; the core only orders and synchronizes.
//!
//! [`CommandListPool`] recycles recording contexts: a list that has been
//! submitted returns to the free pool only once the fence value of the
//! submission that consumed it completes. Running out of free lists is not
//! an error — the pool grows, which is the intended steady-state behavior
//! under load.

use crate::descriptor::DescriptorSlot;
use crate::gpu::fence::{FenceObserver, FenceValue};
use crate::gpu::queue::QueueClass;
use crate::gpu::resource::{GpuResource, ResourceState};
use crate::pipeline::PipelineHandle;
use crate::upload::linear::MemoryAllocation;

// ─── Command IR ───────────────────────────────────────────────────────────────

/// One recorded command.
///
/// This is the unit the binding interprets; the variants cover exactly what
/// the frame-execution machinery itself must express. Anything finer-grained
/// is the pipeline object's business.
#[derive(Debug, Clone)]
pub enum GpuCommand {
    /// Resource state barrier.
    Transition {
        resource: GpuResource,
        from: ResourceState,
        to: ResourceState,
    },
    /// Clear a render-target view to a color.
    ClearTarget {
        resource: GpuResource,
        view: DescriptorSlot,
        color: [f64; 4],
    },
    /// Clear a depth-stencil view.
    ClearDepth {
        resource: GpuResource,
        view: DescriptorSlot,
        depth: f32,
    },
    /// Copy from an upload-arena range into a GPU resource.
    CopyUpload {
        src: MemoryAllocation,
        dst: GpuResource,
        dst_offset: u64,
    },
    /// Bind a pipeline-state object.
    SetPipeline { pipeline: PipelineHandle },
    /// Non-indexed draw; `constants` is the per-draw upload range, if any.
    Draw {
        vertex_count: u32,
        instance_count: u32,
        constants: Option<MemoryAllocation>,
    },
    /// Compute dispatch.
    Dispatch { groups: [u32; 3] },
}

/// A finished, submittable command stream.
#[derive(Debug)]
pub struct CommandBatch {
    /// Label of the recording context (producer name), for journals/tools.
    pub label: String,
    /// The recorded commands, in order.
    pub commands: Vec<GpuCommand>,
}

impl CommandBatch {
    /// Number of recorded commands.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// `true` when nothing was recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

// ─── CommandList ──────────────────────────────────────────────────────────────

/// A recording context for one queue class.
///
/// Redundant `SetPipeline` records are elided: re-binding the pipeline that
/// is already current costs nothing, so producers can set state defensively.
pub struct CommandList {
    class: QueueClass,
    label: String,
    commands: Vec<GpuCommand>,
    current_pipeline: Option<PipelineHandle>,
}

impl CommandList {
    /// Creates an empty recording context for `class`.
    #[must_use]
    pub fn new(class: QueueClass) -> Self {
        Self {
            class,
            label: String::new(),
            commands: Vec::new(),
            current_pipeline: None,
        }
    }

    /// The queue class this list records for.
    #[inline]
    #[must_use]
    pub fn class(&self) -> QueueClass {
        self.class
    }

    /// The current label (producer name).
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Clears all recorded state and starts a new labeled recording.
    pub fn begin(&mut self, label: &str) {
        self.commands.clear();
        self.current_pipeline = None;
        self.label.clear();
        self.label.push_str(label);
    }

    // ── Recording ──────────────────────────────────────────────────────────

    /// Records a state barrier.
    pub fn transition(&mut self, resource: GpuResource, from: ResourceState, to: ResourceState) {
        self.commands.push(GpuCommand::Transition { resource, from, to });
    }

    /// Records a render-target clear.
    pub fn clear_target(&mut self, resource: GpuResource, view: DescriptorSlot, color: [f64; 4]) {
        self.commands.push(GpuCommand::ClearTarget { resource, view, color });
    }

    /// Records a depth clear.
    pub fn clear_depth(&mut self, resource: GpuResource, view: DescriptorSlot, depth: f32) {
        self.commands.push(GpuCommand::ClearDepth { resource, view, depth });
    }

    /// Records a copy from upload memory into `dst`.
    pub fn copy_upload(&mut self, src: MemoryAllocation, dst: GpuResource, dst_offset: u64) {
        self.commands.push(GpuCommand::CopyUpload { src, dst, dst_offset });
    }

    /// Binds a pipeline; a re-bind of the current pipeline records nothing.
    pub fn set_pipeline(&mut self, pipeline: &PipelineHandle) {
        if self
            .current_pipeline
            .as_ref()
            .is_some_and(|current| current.ptr_eq(pipeline))
        {
            return;
        }
        self.current_pipeline = Some(pipeline.clone());
        self.commands.push(GpuCommand::SetPipeline { pipeline: pipeline.clone() });
    }

    /// Records a draw.
    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        constants: Option<MemoryAllocation>,
    ) {
        self.commands.push(GpuCommand::Draw { vertex_count, instance_count, constants });
    }

    /// Records a compute dispatch.
    pub fn dispatch(&mut self, groups: [u32; 3]) {
        self.commands.push(GpuCommand::Dispatch { groups });
    }

    // ── Finalization ───────────────────────────────────────────────────────

    /// Ends recording and moves the command stream into a submittable batch.
    /// The list itself stays usable after a [`begin`](Self::begin).
    #[must_use]
    pub fn finish(&mut self) -> CommandBatch {
        self.current_pipeline = None;
        CommandBatch {
            label: std::mem::take(&mut self.label),
            commands: std::mem::take(&mut self.commands),
        }
    }

    /// Number of commands recorded so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// `true` when nothing has been recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The recorded commands (inspection / tests).
    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }
}

// ─── CommandListPool ──────────────────────────────────────────────────────────

/// Recycles recording contexts for one queue class.
///
/// A submitted list is parked with the fence value of the submission that
/// consumed it and becomes reusable only once that value completes — the
/// GPU may still be consuming the translated commands until then.
pub struct CommandListPool {
    class: QueueClass,
    free: Vec<CommandList>,
    in_flight: Vec<(FenceObserver, FenceValue, CommandList)>,
    created: usize,
}

impl CommandListPool {
    /// Creates an empty pool for `class`.
    #[must_use]
    pub fn new(class: QueueClass) -> Self {
        Self {
            class,
            free: Vec::new(),
            in_flight: Vec::new(),
            created: 0,
        }
    }

    /// Takes a recording context, reclaiming completed in-flight lists
    /// first and lazily creating a new one if none is free.
    pub fn allocate(&mut self, label: &str) -> CommandList {
        self.reclaim();
        let mut list = match self.free.pop() {
            Some(list) => list,
            None => {
                self.created += 1;
                log::debug!(
                    "{} command-list pool grew to {} lists",
                    self.class.name(),
                    self.created
                );
                CommandList::new(self.class)
            }
        };
        list.begin(label);
        list
    }

    /// Parks a submitted list until `value` completes on its queue's fence.
    pub fn retire(&mut self, list: CommandList, observer: FenceObserver, value: FenceValue) {
        debug_assert_eq!(list.class(), self.class);
        self.in_flight.push((observer, value, list));
    }

    /// Moves every fence-complete in-flight list back to the free pool.
    pub fn reclaim(&mut self) {
        let mut index = 0;
        while index < self.in_flight.len() {
            let (observer, value, _) = &self.in_flight[index];
            if observer.is_complete(*value) {
                let (_, _, list) = self.in_flight.swap_remove(index);
                self.free.push(list);
            } else {
                index += 1;
            }
        }
    }

    /// Lists waiting in the free pool.
    #[inline]
    #[must_use]
    pub fn pooled(&self) -> usize {
        self.free.len()
    }

    /// Lists still owned by in-flight submissions.
    #[inline]
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Total lists ever created by this pool.
    #[inline]
    #[must_use]
    pub fn created(&self) -> usize {
        self.created
    }
}
