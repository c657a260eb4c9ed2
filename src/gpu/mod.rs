//! GPU Submission & Synchronization
//!
//! The queue/fence half of the frame-execution core:
//!
//! - [`fence`] — monotonic CPU/GPU completion counters
//! - [`queue`] — per-class submission with fence signaling and GPU-side waits
//! - [`command`] — the recording façade and the fence-gated list pool
//! - [`manager`] — one queue per class, cross-queue ordering, global flush
//! - [`backend`] — the contracts a graphics-API binding must satisfy
//! - [`resource`] — API-agnostic resource descriptions and handles
//! - [`headless`] — the in-process software binding (tests, CI, demos)

pub mod backend;
pub mod command;
pub mod fence;
pub mod headless;
pub mod manager;
pub mod queue;
pub mod resource;

pub use backend::{GpuWait, QueueBackend, RenderBackend, Submission, Surface, SurfaceFrame};
pub use command::{CommandBatch, CommandList, CommandListPool, GpuCommand};
pub use fence::{Fence, FenceObserver, FenceSignaler, FenceValue};
pub use headless::{HeadlessBackend, HeadlessPipelines, HeadlessSurface};
pub use manager::{CommandManager, FrameSignal};
pub use queue::{CommandQueue, QueueClass};
pub use resource::{
    GpuResource, ResourceDesc, ResourceKind, ResourceState, ResourceUsage, TextureFormat,
};
