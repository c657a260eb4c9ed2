//! Upload Arena Tests
//!
//! Tests for:
//! - Page: exact-fit bump allocation, alignment, reset
//! - LinearAllocator: non-overlapping ranges, page rollover, oversized
//!   requests, reset-and-reuse, write/read round trips
//! - FrameUploadAllocator: fence-gated slot resets, the 2-slots-in-flight
//!   pipelining scenario

use std::sync::Arc;

use kiln::errors::KilnError;
use kiln::gpu::backend::RenderBackend;
use kiln::gpu::fence::Fence;
use kiln::gpu::headless::HeadlessBackend;
use kiln::upload::frame::FrameUploadAllocator;
use kiln::upload::linear::{LinearAllocator, Page};

fn backend() -> Arc<dyn RenderBackend> {
    Arc::new(HeadlessBackend::new())
}

// ============================================================================
// Page
// ============================================================================

#[test]
fn page_allocation_fails_exactly_at_capacity() {
    let backend = backend();
    let mut page = Page::new(backend.create_upload_page(256).unwrap());

    assert_eq!(page.try_allocate(200, 1), Some(0));
    assert_eq!(page.remaining(), 56);

    // One byte over what is left: must fail, not grow.
    assert_eq!(page.try_allocate(57, 1), None);
    assert_eq!(page.head(), 200);

    // Exactly what is left: succeeds.
    assert_eq!(page.try_allocate(56, 1), Some(200));
    assert_eq!(page.remaining(), 0);
    assert_eq!(page.try_allocate(1, 1), None);

    // Reset restores full capacity.
    page.reset();
    assert_eq!(page.remaining(), 256);
    assert_eq!(page.try_allocate(256, 1), Some(0));
}

#[test]
fn page_respects_alignment() {
    let backend = backend();
    let mut page = Page::new(backend.create_upload_page(1024).unwrap());

    assert_eq!(page.try_allocate(10, 1), Some(0));
    assert_eq!(page.try_allocate(16, 16), Some(16));
    assert_eq!(page.try_allocate(4, 256), Some(256));
    // Alignment padding counts against capacity.
    assert_eq!(page.head(), 260);
}

// ============================================================================
// LinearAllocator
// ============================================================================

#[test]
fn allocations_are_pairwise_disjoint_and_in_bounds() {
    let mut arena = LinearAllocator::new(backend(), "test", 1024);

    let sizes = [64u64, 128, 32, 256, 100, 16];
    let mut ranges = Vec::new();
    for size in sizes {
        let allocation = arena.allocate(size, 16).unwrap();
        assert!(allocation.offset + allocation.size <= 1024);
        ranges.push((allocation.page, allocation.offset, allocation.size));
    }

    for (i, a) in ranges.iter().enumerate() {
        for b in ranges.iter().skip(i + 1) {
            if a.0 != b.0 {
                continue; // different pages cannot overlap
            }
            let disjoint = a.1 + a.2 <= b.1 || b.1 + b.2 <= a.1;
            assert!(disjoint, "ranges {a:?} and {b:?} overlap");
        }
    }
}

#[test]
fn full_page_rolls_over_to_a_new_page() {
    let mut arena = LinearAllocator::new(backend(), "test", 128);

    let first = arena.allocate(100, 1).unwrap();
    let second = arena.allocate(100, 1).unwrap();

    assert_ne!(first.page, second.page);
    assert_eq!(second.offset, 0);
    assert_eq!(arena.page_count(), 2);
}

#[test]
fn oversized_request_gets_a_dedicated_page() {
    let mut arena = LinearAllocator::new(backend(), "test", 128);

    let big = arena.allocate(512, 1).unwrap();
    assert_eq!(big.offset, 0);
    assert_eq!(big.size, 512);

    // The oversized page is retired immediately; small requests still work.
    let small = arena.allocate(64, 1).unwrap();
    assert_ne!(big.page, small.page);
}

#[test]
fn reset_returns_pages_to_the_pool() {
    let mut arena = LinearAllocator::new(backend(), "test", 128);
    for _ in 0..6 {
        arena.allocate(100, 1).unwrap();
    }
    let pages_before = arena.page_count();
    assert_eq!(pages_before, 6);

    arena.reset();
    for _ in 0..6 {
        arena.allocate(100, 1).unwrap();
    }
    // Reclaimed pages are reused; the pool did not grow.
    assert_eq!(arena.page_count(), pages_before);
}

#[test]
fn write_then_read_round_trips() {
    let mut arena = LinearAllocator::new(backend(), "test", 1024);
    let allocation = arena.allocate(8, 1).unwrap();
    arena.write(&allocation, &[1, 2, 3, 4, 5, 6, 7, 8]);

    let mut out = [0u8; 8];
    arena.read(&allocation, &mut out);
    assert_eq!(out, [1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn gpu_addresses_track_page_and_offset() {
    let mut arena = LinearAllocator::new(backend(), "test", 256);
    let a = arena.allocate(64, 1).unwrap();
    let b = arena.allocate(64, 1).unwrap();
    assert_eq!(b.gpu_address, a.gpu_address + 64);
}

// ============================================================================
// FrameUploadAllocator
// ============================================================================

#[test]
fn slot_reset_is_refused_while_its_fence_is_outstanding() {
    let backend = backend();
    let mut upload = FrameUploadAllocator::new(&backend, 2, 1024);
    let mut fence = Fence::new();

    upload.begin_frame(0).unwrap();
    upload.allocate_and_write(&[0xAB; 64], 256).unwrap();
    let value = fence.issue();
    upload.end_frame(0, [(fence.observer(), value)]);

    // The GPU has not signaled: resetting slot 0 must fail structurally.
    let err = upload.begin_frame(0).unwrap_err();
    assert!(matches!(err, KilnError::SlotInFlight { slot: 0, .. }));

    fence.signaler().signal(value);
    upload.begin_frame(0).unwrap();
}

#[test]
fn two_slot_pipeline_resets_each_slot_only_after_completion() {
    let backend = backend();
    let mut upload = FrameUploadAllocator::new(&backend, 2, 1024);
    let mut fence = Fence::new();
    let signaler = fence.signaler();

    // Four frames, two slots, one 64-byte upload per frame. Completion is
    // delayed until the moment the slot is about to be reused.
    let mut pending: [Option<u64>; 2] = [None, None];
    for frame in 0..4usize {
        let slot = frame % 2;
        if let Some(value) = pending[slot] {
            // Artificial fence delay: reset must be refused first.
            assert!(matches!(
                upload.begin_frame(slot),
                Err(KilnError::SlotInFlight { .. })
            ));
            signaler.signal(value);
        }
        upload.begin_frame(slot).unwrap();
        upload.allocate_and_write(&[frame as u8; 64], 256).unwrap();
        let value = fence.issue();
        upload.end_frame(slot, [(fence.observer(), value)]);
        pending[slot] = Some(value);
    }

    // Slot 0 served frames 0 and 2; slot 1 served frames 1 and 3.
    assert_eq!(upload.reset_count(0), 2);
    assert_eq!(upload.reset_count(1), 2);
}
