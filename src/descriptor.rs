//! Descriptor Tables
//!
//! Bump allocation of fixed-size view-descriptor slots out of fixed-capacity
//! tables. A descriptor ("view") describes how a GPU resource is bound for
//! reading or writing; the table's slot index is what shader-visible
//! (bindless) access hands to shader code.
//!
//! # Design
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                  DescriptorTables                      │
//! │                                                        │
//! │  cpu:    [P P P | t t t t . . . ]  reset → floor       │
//! │  shader: [P P P P P P P . . . . ]  never reset         │
//! │                                                        │
//! │  P = persistent (allocated before freeze_persistent)   │
//! │  t = transient  (re-allocated every frame)             │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! Ownership is bump-only: slots are never individually freed. The CPU-only
//! table rewinds each frame to the floor frozen after initialization (its
//! transient region is a content-generation of one frame); the
//! shader-visible table is never reset, so indices handed out from it remain
//! stable for the lifetime of the core — the bindless contract.
//!
//! Capacity is a hard ceiling sized at startup: tables cannot grow without
//! invalidating already-bound indices, so exhaustion is a fatal
//! configuration error surfaced at the allocation call site.

use crate::errors::{KilnError, Result};

/// Byte stride between adjacent descriptor handles.
///
/// Synthetic but fixed: a graphics-API binding maps `base + offset * stride`
/// onto its real heap start and increment size.
pub const DESCRIPTOR_STRIDE: u64 = 32;

// ─── ViewKind ─────────────────────────────────────────────────────────────────

/// How a resource is bound for access by a shader or fixed-function stage.
///
/// The shader-visible capability is a property of the kind, not a subtype:
/// render-target and depth-stencil views live in the CPU-only table, the
/// rest in the shader-visible table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    RenderTarget,
    DepthStencil,
    ShaderResource,
    ConstantBuffer,
    UnorderedAccess,
}

impl ViewKind {
    /// `true` when views of this kind need a stable shader-visible index.
    #[inline]
    #[must_use]
    pub const fn shader_visible(self) -> bool {
        matches!(
            self,
            Self::ShaderResource | Self::ConstantBuffer | Self::UnorderedAccess
        )
    }

    /// Kind name (for logs and errors).
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RenderTarget => "RenderTarget",
            Self::DepthStencil => "DepthStencil",
            Self::ShaderResource => "ShaderResource",
            Self::ConstantBuffer => "ConstantBuffer",
            Self::UnorderedAccess => "UnorderedAccess",
        }
    }
}

// ─── DescriptorSlot ───────────────────────────────────────────────────────────

/// One allocated view slot.
///
/// `cpu_address` is always valid; `gpu_index` is present only for slots
/// allocated from a shader-visible table and is the stable index shader code
/// uses for bindless access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorSlot {
    /// Slot index within the owning table.
    pub heap_offset: u32,
    /// Synthetic CPU handle address (`base + heap_offset * stride`).
    pub cpu_address: u64,
    /// Stable shader-visible index, when the owning table is shader-visible.
    pub gpu_index: Option<u32>,
}

// ─── DescriptorAllocator ──────────────────────────────────────────────────────

/// Bump allocator over one fixed-capacity descriptor table.
#[derive(Debug)]
pub struct DescriptorAllocator {
    label: &'static str,
    capacity: u32,
    cursor: u32,
    /// Reset rewinds to here, preserving initialization-time slots.
    floor: u32,
    base_address: u64,
    shader_visible: bool,
}

impl DescriptorAllocator {
    /// Creates a table with `capacity` slots.
    ///
    /// `base_address` anchors the synthetic CPU handle space; distinct
    /// tables use distinct bases so handles never collide across tables.
    #[must_use]
    pub fn new(
        label: &'static str,
        capacity: u32,
        base_address: u64,
        shader_visible: bool,
    ) -> Self {
        Self {
            label,
            capacity,
            cursor: 0,
            floor: 0,
            base_address,
            shader_visible,
        }
    }

    /// Allocates the next slot.
    ///
    /// # Errors
    ///
    /// [`KilnError::DescriptorTableFull`] once `capacity` slots are taken.
    /// There is no recovery: the table was sized wrong at startup.
    pub fn allocate(&mut self) -> Result<DescriptorSlot> {
        if self.cursor >= self.capacity {
            return Err(KilnError::DescriptorTableFull {
                table: self.label,
                capacity: self.capacity,
            });
        }
        let slot = self.slot_at(self.cursor);
        self.cursor += 1;
        Ok(slot)
    }

    // ── Streaming cursor API ───────────────────────────────────────────────
    //
    // For producers that need N views of unknown exact count up front: read
    // the handle at the cursor, write the view, then advance.

    /// CPU handle at the current cursor, without advancing.
    #[inline]
    #[must_use]
    pub fn next_cpu_address(&self) -> u64 {
        self.base_address + u64::from(self.cursor) * DESCRIPTOR_STRIDE
    }

    /// Shader-visible index at the current cursor, without advancing.
    /// `None` for CPU-only tables.
    #[inline]
    #[must_use]
    pub fn next_gpu_index(&self) -> Option<u32> {
        self.shader_visible.then_some(self.cursor)
    }

    /// Advances the cursor by one fixed stride.
    ///
    /// # Errors
    ///
    /// [`KilnError::DescriptorTableFull`] when the table is exhausted.
    pub fn increment(&mut self) -> Result<()> {
        if self.cursor >= self.capacity {
            return Err(KilnError::DescriptorTableFull {
                table: self.label,
                capacity: self.capacity,
            });
        }
        self.cursor += 1;
        Ok(())
    }

    // ── Generation boundaries ──────────────────────────────────────────────

    /// Marks every slot allocated so far as persistent: subsequent
    /// [`reset`](Self::reset) calls rewind to this floor instead of zero.
    pub fn freeze_persistent(&mut self) {
        self.floor = self.cursor;
    }

    /// Rewinds the cursor to the persistent floor, recycling the transient
    /// region for the next content-generation (typically one frame).
    pub fn reset(&mut self) {
        self.cursor = self.floor;
    }

    /// Drops the persistent floor and rewinds fully. Used when persistent
    /// views are themselves rebuilt (resize / re-initialization).
    pub fn reset_all(&mut self) {
        self.floor = 0;
        self.cursor = 0;
    }

    // ── Introspection ──────────────────────────────────────────────────────

    /// Number of currently allocated slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u32 {
        self.cursor
    }

    /// `true` when no slots are allocated.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    /// Remaining slot count.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.capacity - self.cursor
    }

    /// The configured hard capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Whether this table hands out shader-visible indices.
    #[inline]
    #[must_use]
    pub fn is_shader_visible(&self) -> bool {
        self.shader_visible
    }

    fn slot_at(&self, offset: u32) -> DescriptorSlot {
        DescriptorSlot {
            heap_offset: offset,
            cpu_address: self.base_address + u64::from(offset) * DESCRIPTOR_STRIDE,
            gpu_index: self.shader_visible.then_some(offset),
        }
    }
}

// ─── DescriptorTables ─────────────────────────────────────────────────────────

/// The two tables the core requires: CPU-only views (render-target /
/// depth-stencil) and shader-visible views (shader-resource /
/// constant-buffer / unordered-access).
#[derive(Debug)]
pub struct DescriptorTables {
    /// CPU-only table; rewound to the persistent floor every frame.
    pub cpu: DescriptorAllocator,
    /// Shader-visible table; never reset, indices are stable.
    pub shader: DescriptorAllocator,
}

// Synthetic handle-space anchors; far enough apart that the tables can never
// overlap at any configurable capacity.
const CPU_TABLE_BASE: u64 = 0x0001_0000;
const SHADER_TABLE_BASE: u64 = 0x1000_0000;

impl DescriptorTables {
    /// Creates both tables from the configured capacities.
    #[must_use]
    pub fn new(view_capacity: u32, shader_capacity: u32) -> Self {
        Self {
            cpu: DescriptorAllocator::new("cpu-views", view_capacity, CPU_TABLE_BASE, false),
            shader: DescriptorAllocator::new(
                "shader-views",
                shader_capacity,
                SHADER_TABLE_BASE,
                true,
            ),
        }
    }

    /// Returns the table responsible for the given view kind.
    #[inline]
    pub fn for_kind(&mut self, kind: ViewKind) -> &mut DescriptorAllocator {
        if kind.shader_visible() {
            &mut self.shader
        } else {
            &mut self.cpu
        }
    }

    /// Freezes initialization-time allocations in both tables.
    pub fn freeze_persistent(&mut self) {
        self.cpu.freeze_persistent();
        self.shader.freeze_persistent();
    }

    /// Per-frame reset: rewinds the CPU-only table's transient region.
    /// The shader-visible table keeps its stable indices.
    pub fn begin_frame(&mut self) {
        self.cpu.reset();
    }

    /// Full rewind of both tables (resize / re-initialization).
    pub fn reset_all(&mut self) {
        self.cpu.reset_all();
        self.shader.reset_all();
    }
}
