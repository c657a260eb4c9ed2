//! Descriptor Table Tests
//!
//! Tests for:
//! - DescriptorAllocator: bump allocation up to capacity, hard failure past
//!   it, strictly increasing non-colliding handles
//! - Streaming cursor API: peek-then-increment
//! - Persistent floor: freeze + per-frame reset semantics
//! - DescriptorTables: view-kind routing, shader-visible indices

use kiln::descriptor::{DescriptorAllocator, DescriptorTables, ViewKind, DESCRIPTOR_STRIDE};
use kiln::errors::KilnError;

fn shader_table(capacity: u32) -> DescriptorAllocator {
    DescriptorAllocator::new("shader-views", capacity, 0x1000, true)
}

fn cpu_table(capacity: u32) -> DescriptorAllocator {
    DescriptorAllocator::new("cpu-views", capacity, 0x100, false)
}

// ============================================================================
// Capacity & handle properties
// ============================================================================

#[test]
fn allocates_exactly_capacity_then_fails() {
    let capacity = 8;
    let mut table = shader_table(capacity);

    let mut last_offset = None;
    let mut last_address = None;
    for _ in 0..capacity {
        let slot = table.allocate().unwrap();
        // Strictly increasing, non-colliding handles.
        if let Some(previous) = last_offset {
            assert!(slot.heap_offset > previous);
        }
        if let Some(previous) = last_address {
            assert!(slot.cpu_address > previous);
        }
        last_offset = Some(slot.heap_offset);
        last_address = Some(slot.cpu_address);
    }

    // The capacity+1-th call fails rather than wrapping.
    let err = table.allocate().unwrap_err();
    assert!(matches!(
        err,
        KilnError::DescriptorTableFull { capacity: 8, .. }
    ));
    assert_eq!(table.remaining(), 0);
}

#[test]
fn shader_visible_slots_carry_stable_gpu_indices() {
    let mut shader = shader_table(4);
    let mut cpu = cpu_table(4);

    let shader_slot = shader.allocate().unwrap();
    assert_eq!(shader_slot.gpu_index, Some(0));
    assert_eq!(shader.allocate().unwrap().gpu_index, Some(1));

    let cpu_slot = cpu.allocate().unwrap();
    assert_eq!(cpu_slot.gpu_index, None);
}

#[test]
fn handles_follow_the_fixed_stride() {
    let mut table = cpu_table(4);
    let a = table.allocate().unwrap();
    let b = table.allocate().unwrap();
    assert_eq!(b.cpu_address - a.cpu_address, DESCRIPTOR_STRIDE);
}

// ============================================================================
// Streaming cursor API
// ============================================================================

#[test]
fn streaming_cursor_peeks_then_advances() {
    let mut table = shader_table(3);

    let peeked_address = table.next_cpu_address();
    let peeked_index = table.next_gpu_index();
    table.increment().unwrap();

    // The slot the cursor pointed at is what allocate would have returned.
    let next = table.allocate().unwrap();
    assert_eq!(next.cpu_address, peeked_address + DESCRIPTOR_STRIDE);
    assert_eq!(peeked_index, Some(0));
    assert_eq!(next.gpu_index, Some(1));

    table.increment().unwrap();
    let err = table.increment().unwrap_err();
    assert!(matches!(err, KilnError::DescriptorTableFull { .. }));
}

// ============================================================================
// Persistent floor
// ============================================================================

#[test]
fn reset_rewinds_to_the_persistent_floor() {
    let mut table = cpu_table(16);

    for _ in 0..3 {
        table.allocate().unwrap();
    }
    table.freeze_persistent();

    for _ in 0..5 {
        table.allocate().unwrap();
    }
    assert_eq!(table.len(), 8);

    // Per-frame reset: transient region recycled, persistent slots kept.
    table.reset();
    assert_eq!(table.len(), 3);
    assert_eq!(table.allocate().unwrap().heap_offset, 3);

    table.reset_all();
    assert_eq!(table.len(), 0);
    assert_eq!(table.allocate().unwrap().heap_offset, 0);
}

// ============================================================================
// DescriptorTables
// ============================================================================

#[test]
fn view_kinds_route_to_the_right_table() {
    let mut tables = DescriptorTables::new(4, 4);

    assert!(!tables.for_kind(ViewKind::RenderTarget).is_shader_visible());
    assert!(!tables.for_kind(ViewKind::DepthStencil).is_shader_visible());
    assert!(tables.for_kind(ViewKind::ShaderResource).is_shader_visible());
    assert!(tables.for_kind(ViewKind::ConstantBuffer).is_shader_visible());
    assert!(tables.for_kind(ViewKind::UnorderedAccess).is_shader_visible());
}

#[test]
fn per_frame_reset_spares_the_shader_table() {
    let mut tables = DescriptorTables::new(8, 8);

    tables.for_kind(ViewKind::RenderTarget).allocate().unwrap();
    tables.for_kind(ViewKind::ShaderResource).allocate().unwrap();
    tables.freeze_persistent();

    tables.for_kind(ViewKind::RenderTarget).allocate().unwrap();
    tables.for_kind(ViewKind::ShaderResource).allocate().unwrap();

    tables.begin_frame();
    // CPU table rewound to its floor; shader table untouched.
    assert_eq!(tables.cpu.len(), 1);
    assert_eq!(tables.shader.len(), 2);
}
