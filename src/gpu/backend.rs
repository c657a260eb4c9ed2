//! Graphics-API Binding Boundary
//!
//! The frame-execution core does not define a graphics API's object model;
//! it defines the contracts a binding must satisfy. Everything behind these
//! traits — device objects, real command buffers, heap addresses — belongs
//! to the binding (D3D12, Vulkan, or the in-process
//! [`HeadlessBackend`](crate::gpu::headless::HeadlessBackend)).
//!
//! # Contracts
//!
//! - [`RenderBackend`] — object factory: queues, upload pages, resources.
//! - [`QueueBackend`] — one GPU execution timeline. Submissions are consumed
//!   strictly in order; each carries GPU-side waits that must hold before
//!   its commands run and a fence signal that must fire after they drain.
//! - [`UploadMemory`] — one CPU-writable, GPU-readable memory block.
//! - [`ResourceBinding`] — one physical GPU resource.
//! - [`Surface`] — the platform window collaborator's back-buffer contract.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::errors::Result;
use crate::gpu::command::CommandBatch;
use crate::gpu::fence::{FenceObserver, FenceSignaler, FenceValue};
use crate::gpu::queue::QueueClass;
use crate::gpu::resource::{GpuResource, ResourceDesc};

// ─── Submission ───────────────────────────────────────────────────────────────

/// A GPU-side wait: the receiving queue must not start the submission's
/// commands until `fence` reaches `value`. Never a CPU stall.
#[derive(Debug, Clone)]
pub struct GpuWait {
    pub fence: FenceObserver,
    pub value: FenceValue,
}

/// One unit of work handed to a [`QueueBackend`].
pub struct Submission {
    /// Recorded commands; `None` for a pure signal submission.
    pub batch: Option<CommandBatch>,
    /// GPU-side waits that gate execution of this submission.
    pub waits: SmallVec<[GpuWait; 2]>,
    /// Fired by the binding once the submission has fully drained.
    pub signaler: FenceSignaler,
    /// The value to signal.
    pub signal_value: FenceValue,
}

// ─── Binding Traits ───────────────────────────────────────────────────────────

/// One GPU execution timeline (a hardware queue or a simulation of one).
pub trait QueueBackend: Send + Sync {
    /// Enqueues a submission. Submissions on one queue retire in order;
    /// each must honor its waits before running and fire its signaler when
    /// done.
    fn submit(&self, submission: Submission) -> Result<()>;

    /// Blocks the calling CPU thread until `fence` reaches `value`,
    /// driving whatever progress the binding needs to get there.
    ///
    /// # Errors
    ///
    /// [`KilnError::WaitStalled`](crate::errors::KilnError::WaitStalled)
    /// when no further progress is possible (wedged timeline).
    fn wait(&self, fence: &FenceObserver, value: FenceValue) -> Result<()>;
}

/// One CPU-writable, GPU-readable memory block backing an upload
/// [`Page`](crate::upload::linear::Page).
///
/// The core guarantees single-writer access per frame slot, so interior
/// mutability inside the binding needs no external locking discipline.
pub trait UploadMemory: Send + Sync {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// `true` for a zero-length block.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// GPU virtual address of the block start.
    fn gpu_address(&self) -> u64;

    /// Copies `data` into the block at `offset`.
    fn write(&self, offset: u64, data: &[u8]);

    /// Copies block contents at `offset` into `out`.
    fn read(&self, offset: u64, out: &mut [u8]);
}

/// One physical GPU resource created by the binding.
pub trait ResourceBinding: Send + Sync {
    /// The description the resource was created with.
    fn desc(&self) -> ResourceDesc;

    /// Debug label supplied at creation.
    fn label(&self) -> &str;
}

/// Factory for binding-owned objects. Fatal failures here abort startup.
pub trait RenderBackend: Send + Sync {
    /// Binding name (for logs).
    fn name(&self) -> &str;

    /// Creates the execution timeline for one queue class.
    fn create_queue(&self, class: QueueClass) -> Result<Arc<dyn QueueBackend>>;

    /// Allocates a CPU-visible upload block of `size` bytes.
    fn create_upload_page(&self, size: u64) -> Result<Box<dyn UploadMemory>>;

    /// Creates a physical resource matching `desc`.
    fn create_resource(&self, label: &str, desc: &ResourceDesc) -> Result<GpuResource>;
}

// ─── Surface ──────────────────────────────────────────────────────────────────

/// One acquired back buffer, valid for a single frame.
pub struct SurfaceFrame {
    /// The back-buffer resource to render into and present.
    pub resource: GpuResource,
}

/// The platform window collaborator: exposes the current back buffer and
/// the present operation. The core presents exactly once per frame, after
/// every producer has finished.
pub trait Surface {
    /// Acquires the back buffer for the coming frame.
    fn acquire(&mut self) -> Result<SurfaceFrame>;

    /// Presents a previously acquired frame.
    fn present(&mut self, frame: SurfaceFrame) -> Result<()>;

    /// Current surface size in pixels.
    fn resolution(&self) -> (u32, u32);
}
