//! Fences
//!
//! A fence is a monotonically increasing completion counter shared between
//! the CPU and one GPU execution queue. The CPU side issues values and tests
//! them; the GPU side (the graphics-API binding) advances the completion
//! counter as submitted work drains.
//!
//! # Roles
//!
//! | Type            | Held by            | Capability                        |
//! |-----------------|--------------------|-----------------------------------|
//! | [`Fence`]       | [`CommandQueue`]   | Issue new values, observe, signal |
//! | [`FenceObserver`] | anyone            | Non-blocking completion queries   |
//! | [`FenceSignaler`] | the GPU binding   | Advance the completion counter    |
//!
//! Completion only ever moves forward: a signal for a value lower than the
//! current counter is a no-op. Value `0` is the always-complete sentinel —
//! `is_complete(0)` holds before any work was ever submitted.
//!
//! [`CommandQueue`]: crate::gpu::queue::CommandQueue

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// A point on a queue's timeline. Unsigned, monotonically increasing.
pub type FenceValue = u64;

/// Shared CPU/GPU fence state: the completion counter plus a condvar so
/// CPU-side waiters can sleep until the binding signals.
#[derive(Debug)]
struct FenceShared {
    completed: Mutex<FenceValue>,
    condvar: Condvar,
}

// ─── Fence ────────────────────────────────────────────────────────────────────

/// The owning side of a fence. One per [`CommandQueue`].
///
/// Issues strictly increasing values via [`issue`](Self::issue); hands out
/// [`FenceObserver`]s for completion queries and [`FenceSignaler`]s for the
/// GPU binding to advance the counter.
///
/// [`CommandQueue`]: crate::gpu::queue::CommandQueue
#[derive(Debug)]
pub struct Fence {
    shared: Arc<FenceShared>,
    next: FenceValue,
}

impl Fence {
    /// Creates a fence with completion counter `0` and no issued values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(FenceShared {
                completed: Mutex::new(0),
                condvar: Condvar::new(),
            }),
            next: 0,
        }
    }

    /// Reserves and returns the next fence value.
    ///
    /// The value is not complete until a signaler advances the counter past
    /// it. Values issued by consecutive calls are strictly increasing.
    #[inline]
    pub fn issue(&mut self) -> FenceValue {
        self.next += 1;
        self.next
    }

    /// The highest value issued so far (`0` if none).
    #[inline]
    #[must_use]
    pub fn last_issued(&self) -> FenceValue {
        self.next
    }

    /// The highest value the GPU has reported complete.
    #[inline]
    #[must_use]
    pub fn completed_value(&self) -> FenceValue {
        *self.shared.completed.lock()
    }

    /// Non-blocking completion test.
    #[inline]
    #[must_use]
    pub fn is_complete(&self, value: FenceValue) -> bool {
        value <= self.completed_value()
    }

    /// Returns a cheap, clonable read-only view of this fence.
    #[must_use]
    pub fn observer(&self) -> FenceObserver {
        FenceObserver {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Returns the write handle the GPU binding uses to report completion.
    #[must_use]
    pub fn signaler(&self) -> FenceSignaler {
        FenceSignaler {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for Fence {
    fn default() -> Self {
        Self::new()
    }
}

// ─── FenceObserver ────────────────────────────────────────────────────────────

/// Read-only view of a fence's completion counter.
///
/// Cloning is cheap (one `Arc` bump). Observers are how allocators and pools
/// check "is the GPU done with this?" without holding a queue reference.
#[derive(Debug, Clone)]
pub struct FenceObserver {
    shared: Arc<FenceShared>,
}

impl FenceObserver {
    /// The highest value the GPU has reported complete.
    #[inline]
    #[must_use]
    pub fn completed_value(&self) -> FenceValue {
        *self.shared.completed.lock()
    }

    /// Non-blocking completion test.
    #[inline]
    #[must_use]
    pub fn is_complete(&self, value: FenceValue) -> bool {
        value <= self.completed_value()
    }

    /// Blocks the calling thread until the counter reaches `value`.
    ///
    /// This relies on another thread signaling; single-threaded bindings
    /// must drive completion themselves before (or instead of) calling this.
    /// Prefer [`CommandQueue::wait_until`], which lets the binding make
    /// progress.
    ///
    /// [`CommandQueue::wait_until`]: crate::gpu::queue::CommandQueue::wait_until
    pub fn wait(&self, value: FenceValue) {
        let mut completed = self.shared.completed.lock();
        while *completed < value {
            self.shared.condvar.wait(&mut completed);
        }
    }
}

// ─── FenceSignaler ────────────────────────────────────────────────────────────

/// Write handle used by the GPU binding to advance the completion counter.
///
/// Handed to the binding together with each submission; the binding fires it
/// once the submission's work has fully drained.
#[derive(Debug, Clone)]
pub struct FenceSignaler {
    shared: Arc<FenceShared>,
}

impl FenceSignaler {
    /// Advances the completion counter to `value` and wakes CPU waiters.
    ///
    /// Monotonic: signaling a value at or below the current counter has no
    /// effect.
    pub fn signal(&self, value: FenceValue) {
        let mut completed = self.shared.completed.lock();
        if value > *completed {
            *completed = value;
            self.shared.condvar.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_values_are_strictly_increasing() {
        let mut fence = Fence::new();
        let a = fence.issue();
        let b = fence.issue();
        let c = fence.issue();
        assert!(a < b && b < c);
        assert_eq!(fence.last_issued(), c);
    }

    #[test]
    fn zero_is_always_complete() {
        let fence = Fence::new();
        assert!(fence.is_complete(0));
        assert!(!fence.is_complete(1));
    }

    #[test]
    fn signal_is_monotonic() {
        let mut fence = Fence::new();
        let signaler = fence.signaler();
        let v = fence.issue();
        signaler.signal(v);
        assert_eq!(fence.completed_value(), v);

        // Lower or equal signals are no-ops.
        signaler.signal(0);
        assert_eq!(fence.completed_value(), v);
    }

    #[test]
    fn observer_tracks_completion() {
        let mut fence = Fence::new();
        let observer = fence.observer();
        let signaler = fence.signaler();
        let v = fence.issue();
        assert!(!observer.is_complete(v));
        signaler.signal(v);
        assert!(observer.is_complete(v));
    }
}
