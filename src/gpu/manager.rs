//! Command Manager
//!
//! Owns one [`CommandQueue`] per queue class plus that class's
//! [`CommandListPool`], coordinates cross-queue ordering, and provides the
//! global stop-the-world [`flush`](CommandManager::flush).
//!
//! # Cross-Queue Ordering Policy
//!
//! The producer list is declared-order, not a dependency graph, so the
//! manager realizes cross-queue dependencies conservatively: before a batch
//! runs on queue A, A receives GPU-side waits for the most recent submission
//! on every other queue it has not already waited past. A compute producer
//! feeding a graphics producer therefore orders correctly without any
//! solver, at the cost of occasionally waiting on unrelated work. All of
//! this is GPU-side; the CPU never blocks here.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::errors::Result;
use crate::gpu::backend::{GpuWait, RenderBackend};
use crate::gpu::command::{CommandList, CommandListPool};
use crate::gpu::fence::{FenceObserver, FenceValue};
use crate::gpu::queue::{CommandQueue, QueueClass};

/// A fence signal issued at a frame boundary on one queue.
#[derive(Debug, Clone)]
pub struct FrameSignal {
    pub class: QueueClass,
    pub observer: FenceObserver,
    pub value: FenceValue,
}

struct QueueSlot {
    queue: CommandQueue,
    pool: CommandListPool,
    /// Highest fence value submitted on this queue.
    last_submitted: FenceValue,
    /// Per-other-queue: the highest fence value this queue already waits on.
    waited: [FenceValue; QueueClass::COUNT],
    /// Work submitted since the last frame-boundary signal.
    dirty: bool,
}

/// One queue per class, their list pools, and cross-queue coordination.
pub struct CommandManager {
    slots: [QueueSlot; QueueClass::COUNT],
}

impl CommandManager {
    /// Creates all three queues from the binding. Queue creation failure is
    /// a fatal initialization error.
    pub fn new(backend: &Arc<dyn RenderBackend>) -> Result<Self> {
        let mut make = |class: QueueClass| -> Result<QueueSlot> {
            Ok(QueueSlot {
                queue: CommandQueue::new(class, backend.create_queue(class)?),
                pool: CommandListPool::new(class),
                last_submitted: 0,
                waited: [0; QueueClass::COUNT],
                dirty: false,
            })
        };
        Ok(Self {
            slots: [
                make(QueueClass::Graphics)?,
                make(QueueClass::Compute)?,
                make(QueueClass::Copy)?,
            ],
        })
    }

    /// The queue for `class`.
    #[inline]
    #[must_use]
    pub fn queue(&self, class: QueueClass) -> &CommandQueue {
        &self.slots[class.index()].queue
    }

    /// Mutable access to the queue for `class`.
    #[inline]
    pub fn queue_mut(&mut self, class: QueueClass) -> &mut CommandQueue {
        &mut self.slots[class.index()].queue
    }

    /// The list pool for `class` (diagnostics).
    #[inline]
    #[must_use]
    pub fn pool(&self, class: QueueClass) -> &CommandListPool {
        &self.slots[class.index()].pool
    }

    /// Obtains a recording context from `class`'s pool, lazily creating a
    /// backing list if none is free. Pool growth is normal, not an error.
    pub fn allocate_command_list(&mut self, class: QueueClass, label: &str) -> CommandList {
        self.slots[class.index()].pool.allocate(label)
    }

    /// Finalizes and submits a recorded list on its queue class.
    ///
    /// Applies the conservative cross-queue waits, signals the queue fence,
    /// and parks the list in the pool until that signal completes. Returns
    /// the fence value consumers of this batch must wait on.
    pub fn submit(&mut self, mut list: CommandList) -> Result<FenceValue> {
        let class = list.class();
        let index = class.index();

        let waits = self.collect_waits(class);
        let batch = list.finish();

        let slot = &mut self.slots[index];
        for wait in waits {
            slot.queue.push_wait(wait.fence, wait.value);
        }
        let value = slot.queue.execute(batch)?;
        let observer = slot.queue.fence().observer();
        slot.pool.retire(list, observer, value);
        slot.last_submitted = value;
        slot.dirty = true;
        Ok(value)
    }

    /// Issues a frame-boundary signal on every queue that saw work since
    /// the previous call. The returned signals gate frame-slot reuse.
    pub fn signal_used(&mut self) -> Result<SmallVec<[FrameSignal; 3]>> {
        let mut signals = SmallVec::new();
        for class in QueueClass::ALL {
            let slot = &mut self.slots[class.index()];
            if !slot.dirty {
                continue;
            }
            let value = slot.queue.signal()?;
            slot.last_submitted = value;
            slot.dirty = false;
            signals.push(FrameSignal {
                class,
                observer: slot.queue.fence().observer(),
                value,
            });
        }
        Ok(signals)
    }

    /// Stop-the-world drain: signals every owned queue and blocks the
    /// calling thread until all are complete.
    ///
    /// Used only at shutdown and resize — never on the per-frame path.
    pub fn flush(&mut self) -> Result<()> {
        let mut targets: SmallVec<[(usize, FenceValue); 3]> = SmallVec::new();
        for class in QueueClass::ALL {
            let slot = &mut self.slots[class.index()];
            let value = slot.queue.signal()?;
            slot.last_submitted = value;
            slot.dirty = false;
            targets.push((class.index(), value));
        }
        for (index, value) in targets {
            self.slots[index].queue.wait_until(value)?;
        }
        for slot in &mut self.slots {
            slot.pool.reclaim();
        }
        Ok(())
    }

    /// The conservative cross-queue waits `class` must apply before its
    /// next batch: every other queue's newest submission not yet waited on.
    fn collect_waits(&mut self, class: QueueClass) -> SmallVec<[GpuWait; 2]> {
        let index = class.index();
        let mut waits = SmallVec::new();
        for other in QueueClass::ALL {
            let other_index = other.index();
            if other_index == index {
                continue;
            }
            let newest = self.slots[other_index].last_submitted;
            if newest > self.slots[index].waited[other_index] {
                waits.push(GpuWait {
                    fence: self.slots[other_index].queue.fence().observer(),
                    value: newest,
                });
                self.slots[index].waited[other_index] = newest;
            }
        }
        waits
    }
}
