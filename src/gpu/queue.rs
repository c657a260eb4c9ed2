//! Command Queues
//!
//! A [`CommandQueue`] submits recorded command batches to one GPU queue
//! class and exposes fence-based completion queries. Every submission
//! signals the queue's fence, so callers always get a value to test or wait
//! on.
//!
//! Cross-queue dependencies are GPU-side: queue A's consumers call
//! [`push_wait`](CommandQueue::push_wait) on queue B with A's fence value,
//! and B's next submission will not start until the GPU observes that value
//! — no CPU stall involved. The only CPU-blocking entry point is
//! [`wait_until`](CommandQueue::wait_until), reserved for flush points and
//! frame-slot reuse, never the per-frame hot path.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::errors::Result;
use crate::gpu::backend::{GpuWait, QueueBackend, Submission};
use crate::gpu::command::CommandBatch;
use crate::gpu::fence::{Fence, FenceObserver, FenceValue};

// ─── QueueClass ───────────────────────────────────────────────────────────────

/// The three GPU queue classes the core schedules across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum QueueClass {
    /// Full graphics capability (draws, clears, barriers).
    Graphics = 0,
    /// Async compute (dispatches, barriers).
    Compute = 1,
    /// Transfer-only (upload copies).
    Copy = 2,
}

impl QueueClass {
    /// All classes, in index order.
    pub const ALL: [Self; 3] = [Self::Graphics, Self::Compute, Self::Copy];

    /// Number of queue classes.
    pub const COUNT: usize = 3;

    /// Dense index for per-class arrays.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Class name (for logs and debugging).
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Graphics => "graphics",
            Self::Compute => "compute",
            Self::Copy => "copy",
        }
    }
}

// ─── CommandQueue ─────────────────────────────────────────────────────────────

/// One GPU submission timeline with its completion fence.
pub struct CommandQueue {
    class: QueueClass,
    backend: Arc<dyn QueueBackend>,
    fence: Fence,
    /// GPU-side waits queued for the next submission.
    pending_waits: SmallVec<[GpuWait; 2]>,
}

impl CommandQueue {
    /// Wraps a binding timeline for `class`.
    #[must_use]
    pub fn new(class: QueueClass, backend: Arc<dyn QueueBackend>) -> Self {
        Self {
            class,
            backend,
            fence: Fence::new(),
            pending_waits: SmallVec::new(),
        }
    }

    /// This queue's class.
    #[inline]
    #[must_use]
    pub fn class(&self) -> QueueClass {
        self.class
    }

    /// This queue's fence.
    #[inline]
    #[must_use]
    pub fn fence(&self) -> &Fence {
        &self.fence
    }

    // ── Submission ─────────────────────────────────────────────────────────

    /// Submits a recorded batch and immediately signals the fence behind
    /// it. Returns the value the batch's consumers must wait on.
    pub fn execute(&mut self, batch: CommandBatch) -> Result<FenceValue> {
        self.submit(Some(batch))
    }

    /// Enqueues a GPU-side signal after all previously submitted work.
    /// Returns the value to test later.
    pub fn signal(&mut self) -> Result<FenceValue> {
        self.submit(None)
    }

    /// Queues a GPU-side wait applied to this queue's next submission:
    /// the submission will not start until `fence` reaches `value`.
    pub fn push_wait(&mut self, fence: FenceObserver, value: FenceValue) {
        self.pending_waits.push(GpuWait { fence, value });
    }

    // ── Completion ─────────────────────────────────────────────────────────

    /// Non-blocking: has the GPU observed `value` on this queue's fence?
    #[inline]
    #[must_use]
    pub fn is_complete(&self, value: FenceValue) -> bool {
        self.fence.is_complete(value)
    }

    /// The highest fence value issued by this queue (`0` if none).
    #[inline]
    #[must_use]
    pub fn last_signaled(&self) -> FenceValue {
        self.fence.last_issued()
    }

    /// Blocks the calling thread until the fence reaches `value`.
    ///
    /// Used only at flush points and frame-slot reuse — a CPU wait on the
    /// per-frame hot path would stall the pipeline the frame slots exist to
    /// keep full.
    pub fn wait_until(&self, value: FenceValue) -> Result<()> {
        if self.fence.is_complete(value) {
            return Ok(());
        }
        self.backend.wait(&self.fence.observer(), value)
    }

    fn submit(&mut self, batch: Option<CommandBatch>) -> Result<FenceValue> {
        let value = self.fence.issue();
        let submission = Submission {
            batch,
            waits: std::mem::take(&mut self.pending_waits),
            signaler: self.fence.signaler(),
            signal_value: value,
        };
        self.backend.submit(submission)?;
        Ok(value)
    }
}
