//! Frame-Slot Upload Arenas
//!
//! One [`LinearAllocator`] per frame-in-flight slot. The CPU records frame
//! N+1's uploads while the GPU still reads frame N's, so a slot's arena may
//! only be reset once every fence recorded for that slot's last frame has
//! completed.
//!
//! That rule is enforced by construction: [`FrameUploadAllocator::begin_frame`]
//! checks the recorded fences itself and refuses the reset with
//! [`KilnError::SlotInFlight`] if any is outstanding. Resetting early would
//! let the GPU read freed memory — a data race against the GPU that no lock
//! protects against.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::errors::{KilnError, Result};
use crate::gpu::backend::RenderBackend;
use crate::gpu::fence::{FenceObserver, FenceValue};
use crate::upload::linear::{LinearAllocator, MemoryAllocation};

struct FrameSlot {
    arena: LinearAllocator,
    /// Fences that must complete before this slot's arena may be reset —
    /// one per queue that consumed the slot's uploads last frame.
    pending: SmallVec<[(FenceObserver, FenceValue); 3]>,
    resets: u64,
}

/// Rotating per-frame upload arenas with fence-gated reclamation.
pub struct FrameUploadAllocator {
    slots: Vec<FrameSlot>,
    active: usize,
}

impl FrameUploadAllocator {
    /// Creates one arena per frame-in-flight slot.
    #[must_use]
    pub fn new(backend: &Arc<dyn RenderBackend>, frames_in_flight: u32, page_size: u64) -> Self {
        let slots = (0..frames_in_flight)
            .map(|_| FrameSlot {
                arena: LinearAllocator::new(Arc::clone(backend), "frame-upload", page_size),
                pending: SmallVec::new(),
                resets: 0,
            })
            .collect();
        Self { slots, active: 0 }
    }

    /// Number of frame slots.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The slot serving allocations right now.
    #[inline]
    #[must_use]
    pub fn active_slot(&self) -> usize {
        self.active
    }

    /// Resets `slot`'s arena and makes it the active allocation target.
    ///
    /// # Errors
    ///
    /// [`KilnError::SlotInFlight`] when a fence recorded by
    /// [`end_frame`](Self::end_frame) for this slot has not completed. The
    /// caller must CPU-wait that fence first (the bounded-pipeline wait);
    /// this check is the structural guarantee, not the wait itself.
    pub fn begin_frame(&mut self, slot: usize) -> Result<()> {
        let state = &mut self.slots[slot];
        for (observer, value) in &state.pending {
            if !observer.is_complete(*value) {
                return Err(KilnError::SlotInFlight { slot, value: *value });
            }
        }
        state.pending.clear();
        state.arena.reset();
        state.resets += 1;
        self.active = slot;
        Ok(())
    }

    /// Records the fences that gate `slot`'s next reset.
    ///
    /// Call at end of frame with the signal issued on every queue that
    /// consumed this slot's uploads.
    pub fn end_frame(
        &mut self,
        slot: usize,
        signals: impl IntoIterator<Item = (FenceObserver, FenceValue)>,
    ) {
        let state = &mut self.slots[slot];
        state.pending.clear();
        state.pending.extend(signals);
    }

    /// Allocates from the active slot's arena.
    pub fn allocate(&mut self, size: u64, align: u64) -> Result<MemoryAllocation> {
        self.slots[self.active].arena.allocate(size, align)
    }

    /// Allocates from the active slot and copies `data` into it.
    pub fn allocate_and_write(&mut self, data: &[u8], align: u64) -> Result<MemoryAllocation> {
        let allocation = self.allocate(data.len() as u64, align)?;
        self.slots[self.active].arena.write(&allocation, data);
        Ok(allocation)
    }

    /// Copies `data` into an allocation from the active slot.
    pub fn write(&self, allocation: &MemoryAllocation, data: &[u8]) {
        self.slots[self.active].arena.write(allocation, data);
    }

    /// Reads back an allocation from the active slot (tests, diagnostics).
    pub fn read(&self, allocation: &MemoryAllocation, out: &mut [u8]) {
        self.slots[self.active].arena.read(allocation, out);
    }

    // ── Diagnostics ────────────────────────────────────────────────────────

    /// How many times `slot`'s arena has been reset.
    #[inline]
    #[must_use]
    pub fn reset_count(&self, slot: usize) -> u64 {
        self.slots[slot].resets
    }

    /// Page count of `slot`'s arena.
    #[inline]
    #[must_use]
    pub fn page_count(&self, slot: usize) -> usize {
        self.slots[slot].arena.page_count()
    }
}
