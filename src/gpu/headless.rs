//! Headless Binding
//!
//! A fully functional in-process implementation of every binding contract in
//! [`backend`](crate::gpu::backend). There is no GPU: submissions retire on
//! the calling thread, in queue order, honoring GPU-side waits exactly like
//! a hardware queue would. Used by the integration tests, CI environments
//! without a device, and the headless demo.
//!
//! # Pacing
//!
//! | Mode                  | Behavior                                        |
//! |-----------------------|-------------------------------------------------|
//! | immediate (default)   | Submissions retire as soon as their waits hold  |
//! | manual ([`pace_manual`]) | Submissions queue up until [`retire_next`] / [`retire_all`] |
//!
//! Manual pacing is how tests introduce artificial fence delay: work stays
//! "on the GPU" until the test decides it finishes. A CPU-side
//! [`QueueBackend::wait`] always forces the simulated GPU to catch up far
//! enough to satisfy the wait (or fails with
//! [`KilnError::WaitStalled`](crate::errors::KilnError::WaitStalled) if the
//! timeline is wedged on an impossible dependency).
//!
//! [`pace_manual`]: HeadlessBackend::pace_manual
//! [`retire_next`]: HeadlessBackend::retire_next
//! [`retire_all`]: HeadlessBackend::retire_all

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::{KilnError, Result};
use crate::gpu::backend::{
    QueueBackend, RenderBackend, ResourceBinding, Submission, Surface, SurfaceFrame, UploadMemory,
};
use crate::gpu::fence::{FenceObserver, FenceValue};
use crate::gpu::queue::QueueClass;
use crate::gpu::resource::{GpuResource, ResourceDesc, ResourceUsage, TextureFormat};
use crate::pipeline::{PipelineHandle, PipelineProvider, PipelineState};

// ─── Journal ──────────────────────────────────────────────────────────────────

/// One retired submission, recorded in arrival-of-completion order.
#[derive(Debug, Clone)]
pub struct RetiredBatch {
    /// The queue the submission retired on.
    pub queue: QueueClass,
    /// Recording label (producer name), or `"<signal>"` for bare signals.
    pub label: String,
    /// Number of recorded commands (`0` for bare signals).
    pub commands: usize,
}

// ─── Backend ──────────────────────────────────────────────────────────────────

struct HeadlessShared {
    queues: [Mutex<VecDeque<Submission>>; QueueClass::COUNT],
    manual: AtomicBool,
    retired: Mutex<Vec<RetiredBatch>>,
    next_gpu_address: AtomicU64,
}

/// The in-process software binding.
pub struct HeadlessBackend {
    shared: Arc<HeadlessShared>,
}

impl HeadlessBackend {
    /// Creates a backend in immediate pacing mode.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(HeadlessShared {
                queues: [
                    Mutex::new(VecDeque::new()),
                    Mutex::new(VecDeque::new()),
                    Mutex::new(VecDeque::new()),
                ],
                manual: AtomicBool::new(false),
                retired: Mutex::new(Vec::new()),
                next_gpu_address: AtomicU64::new(0x1_0000_0000),
            }),
        }
    }

    // ── Pacing control ─────────────────────────────────────────────────────

    /// Switches to manual pacing: submissions stay pending until retired
    /// explicitly (artificial fence delay).
    pub fn pace_manual(&self) {
        self.shared.manual.store(true, Ordering::Release);
    }

    /// Switches back to immediate pacing and drains everything pending.
    pub fn pace_immediate(&self) {
        self.shared.manual.store(false, Ordering::Release);
        self.shared.pump_all();
    }

    /// Retires the head submission of `class` if its waits are satisfied.
    /// Returns whether a submission retired.
    pub fn retire_next(&self, class: QueueClass) -> bool {
        self.shared.retire_head(class)
    }

    /// Retires everything retirable, across all queues, until quiescent.
    pub fn retire_all(&self) {
        self.shared.pump_all();
    }

    // ── Inspection ─────────────────────────────────────────────────────────

    /// Drains and returns the retirement journal.
    #[must_use]
    pub fn take_retired(&self) -> Vec<RetiredBatch> {
        std::mem::take(&mut *self.shared.retired.lock())
    }

    /// Number of journal entries not yet taken.
    #[must_use]
    pub fn retired_count(&self) -> usize {
        self.shared.retired.lock().len()
    }

    /// Number of submissions still pending on `class`.
    #[must_use]
    pub fn pending_count(&self, class: QueueClass) -> usize {
        self.shared.queues[class.index()].lock().len()
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessShared {
    /// Pops and retires the head of `class` when its waits are satisfied.
    fn retire_head(&self, class: QueueClass) -> bool {
        let submission = {
            let mut queue = self.queues[class.index()].lock();
            let ready = queue
                .front()
                .is_some_and(|head| head.waits.iter().all(|w| w.fence.is_complete(w.value)));
            if ready { queue.pop_front() } else { None }
        };
        match submission {
            Some(submission) => {
                self.retire(class, submission);
                true
            }
            None => false,
        }
    }

    /// Retires until no queue can make progress. Returns whether anything
    /// retired at all.
    fn pump_all(&self) -> bool {
        let mut progressed = false;
        loop {
            let mut round = false;
            for class in QueueClass::ALL {
                while self.retire_head(class) {
                    round = true;
                }
            }
            if !round {
                break;
            }
            progressed = true;
        }
        progressed
    }

    fn retire(&self, class: QueueClass, submission: Submission) {
        let (label, commands) = match &submission.batch {
            Some(batch) => (batch.label.clone(), batch.commands.len()),
            None => ("<signal>".to_string(), 0),
        };
        self.retired.lock().push(RetiredBatch { queue: class, label, commands });
        submission.signaler.signal(submission.signal_value);
    }
}

impl RenderBackend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn create_queue(&self, class: QueueClass) -> Result<Arc<dyn QueueBackend>> {
        Ok(Arc::new(HeadlessQueue {
            shared: Arc::clone(&self.shared),
            class,
        }))
    }

    fn create_upload_page(&self, size: u64) -> Result<Box<dyn UploadMemory>> {
        // Synthetic address space; pages never overlap.
        let address = self
            .shared
            .next_gpu_address
            .fetch_add(size.next_multiple_of(0x1_0000), Ordering::Relaxed);
        Ok(Box::new(HeadlessUploadMemory {
            data: Mutex::new(vec![0u8; size as usize].into_boxed_slice()),
            address,
        }))
    }

    fn create_resource(&self, label: &str, desc: &ResourceDesc) -> Result<GpuResource> {
        log::debug!("headless: creating resource `{label}` ({desc:?})");
        Ok(GpuResource::new(Arc::new(HeadlessResource {
            label: label.to_string(),
            desc: *desc,
        })))
    }
}

// ─── Queue ────────────────────────────────────────────────────────────────────

struct HeadlessQueue {
    shared: Arc<HeadlessShared>,
    class: QueueClass,
}

impl QueueBackend for HeadlessQueue {
    fn submit(&self, submission: Submission) -> Result<()> {
        self.shared.queues[self.class.index()].lock().push_back(submission);
        if !self.shared.manual.load(Ordering::Acquire) {
            self.shared.pump_all();
        }
        Ok(())
    }

    fn wait(&self, fence: &FenceObserver, value: FenceValue) -> Result<()> {
        // A CPU wait means "GPU, catch up" — drive the simulation forward
        // until the value lands. Wedging means an impossible dependency.
        loop {
            if fence.is_complete(value) {
                return Ok(());
            }
            if !self.shared.pump_all() {
                return Err(KilnError::WaitStalled(value));
            }
        }
    }
}

// ─── Upload memory ────────────────────────────────────────────────────────────

struct HeadlessUploadMemory {
    data: Mutex<Box<[u8]>>,
    address: u64,
}

impl UploadMemory for HeadlessUploadMemory {
    fn len(&self) -> u64 {
        self.data.lock().len() as u64
    }

    fn gpu_address(&self) -> u64 {
        self.address
    }

    fn write(&self, offset: u64, data: &[u8]) {
        let mut bytes = self.data.lock();
        let start = offset as usize;
        bytes[start..start + data.len()].copy_from_slice(data);
    }

    fn read(&self, offset: u64, out: &mut [u8]) {
        let bytes = self.data.lock();
        let start = offset as usize;
        out.copy_from_slice(&bytes[start..start + out.len()]);
    }
}

// ─── Resources ────────────────────────────────────────────────────────────────

struct HeadlessResource {
    label: String,
    desc: ResourceDesc,
}

impl ResourceBinding for HeadlessResource {
    fn desc(&self) -> ResourceDesc {
        self.desc
    }

    fn label(&self) -> &str {
        &self.label
    }
}

// ─── Surface ──────────────────────────────────────────────────────────────────

/// Ring-buffered offscreen surface: back buffers without a window.
pub struct HeadlessSurface {
    resolution: (u32, u32),
    buffers: Vec<GpuResource>,
    next: usize,
    presented: u64,
}

impl HeadlessSurface {
    /// Creates `buffer_count` offscreen back buffers at `resolution`.
    pub fn new(
        backend: &dyn RenderBackend,
        resolution: (u32, u32),
        buffer_count: usize,
    ) -> Result<Self> {
        let desc = ResourceDesc::texture_2d(
            resolution.0,
            resolution.1,
            TextureFormat::Bgra8Unorm,
            ResourceUsage::RENDER_TARGET | ResourceUsage::COPY_SRC,
        );
        let buffers = (0..buffer_count)
            .map(|index| backend.create_resource(&format!("backbuffer-{index}"), &desc))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            resolution,
            buffers,
            next: 0,
            presented: 0,
        })
    }

    /// Number of frames presented so far.
    #[inline]
    #[must_use]
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Surface for HeadlessSurface {
    fn acquire(&mut self) -> Result<SurfaceFrame> {
        let resource = self.buffers[self.next].clone();
        Ok(SurfaceFrame { resource })
    }

    fn present(&mut self, _frame: SurfaceFrame) -> Result<()> {
        self.next = (self.next + 1) % self.buffers.len();
        self.presented += 1;
        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

// ─── Pipelines ────────────────────────────────────────────────────────────────

struct HeadlessPipeline {
    name: String,
}

impl PipelineState for HeadlessPipeline {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Caching by-name pipeline provider.
///
/// Permissive by default (any name resolves to a fresh stub state object);
/// [`with_known`](Self::with_known) restricts the namespace so lookups of
/// unregistered names fail like a real shader toolchain would.
pub struct HeadlessPipelines {
    cache: Mutex<FxHashMap<String, PipelineHandle>>,
    known: Option<FxHashSet<String>>,
}

impl HeadlessPipelines {
    /// Permissive provider: every name resolves.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(FxHashMap::default()),
            known: None,
        }
    }

    /// Provider that only resolves the given names.
    #[must_use]
    pub fn with_known<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cache: Mutex::new(FxHashMap::default()),
            known: Some(names.into_iter().map(Into::into).collect()),
        }
    }
}

impl Default for HeadlessPipelines {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineProvider for HeadlessPipelines {
    fn pipeline(&self, name: &str) -> Result<PipelineHandle> {
        if let Some(known) = &self.known {
            if !known.contains(name) {
                return Err(KilnError::PipelineNotFound(name.to_string()));
            }
        }
        let mut cache = self.cache.lock();
        if let Some(handle) = cache.get(name) {
            return Ok(handle.clone());
        }
        let handle = PipelineHandle::new(Arc::new(HeadlessPipeline { name: name.to_string() }));
        cache.insert(name.to_string(), handle.clone());
        Ok(handle)
    }
}
