//! Linear Upload Allocation
//!
//! A page-based bump allocator for transient CPU-writable, GPU-readable
//! memory: per-draw constants, geometry staging, scratch uploads.
//!
//! # Design
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   LinearAllocator                    │
//! │                                                      │
//! │  active:  [██████░░░░░░░░]  ← bump cursor            │
//! │  retired: [██████████████] [█████████████░]          │
//! │  free:    [              ] [              ]          │
//! │                                                      │
//! │  allocate() → MemoryAllocation   (never freed alone) │
//! │  reset()    → every page back to free, cursor to 0   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Memory Strategy
//!
//! - A [`Page`] never grows: when a request does not fit its remaining
//!   capacity, the page is retired and a new one is taken from the free
//!   pool (or created — pool growth is normal operation, not an error).
//! - Requests larger than the configured page size get a dedicated
//!   oversized page.
//! - [`LinearAllocator::reset`] is the ONLY reclamation mechanism.
//!   Individual allocations are never freed; the caller must guarantee the
//!   GPU is done with every allocation before resetting — which is what
//!   [`FrameUploadAllocator`](crate::upload::frame::FrameUploadAllocator)
//!   enforces with fences.

use std::sync::Arc;

use crate::errors::Result;
use crate::gpu::backend::{RenderBackend, UploadMemory};

slotmap::new_key_type! {
    /// Stable identifier of a page within one allocator's pool.
    pub struct PageKey;
}

// ─── MemoryAllocation ─────────────────────────────────────────────────────────

/// A sub-range of a page, exclusively owned by the requester until the
/// owning allocator is reset as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAllocation {
    /// The page this range lives in.
    pub page: PageKey,
    /// Byte offset of the range within the page.
    pub offset: u64,
    /// Requested size in bytes (alignment padding not included).
    pub size: u64,
    /// GPU virtual address of the range start.
    pub gpu_address: u64,
}

// ─── Page ─────────────────────────────────────────────────────────────────────

/// One CPU-visible, GPU-readable memory block with a bump cursor.
///
/// Invariant: `head <= capacity` at all times. Allocation fails — it never
/// grows the page — exactly when the aligned request exceeds
/// `capacity - head`.
pub struct Page {
    memory: Box<dyn UploadMemory>,
    capacity: u64,
    head: u64,
}

impl Page {
    /// Wraps a backend memory block; capacity is the block's full length.
    #[must_use]
    pub fn new(memory: Box<dyn UploadMemory>) -> Self {
        let capacity = memory.len();
        Self { memory, capacity, head: 0 }
    }

    /// Bump-allocates `size` bytes at `align`; returns the offset, or
    /// `None` when the aligned request does not fit the remaining capacity.
    pub fn try_allocate(&mut self, size: u64, align: u64) -> Option<u64> {
        let aligned = if align <= 1 {
            self.head
        } else {
            self.head.next_multiple_of(align)
        };
        let end = aligned.checked_add(size)?;
        if end > self.capacity {
            return None;
        }
        self.head = end;
        Some(aligned)
    }

    /// Rewinds the cursor to zero. The memory contents are unspecified
    /// afterwards; callers must have stopped reading first.
    pub fn reset(&mut self) {
        self.head = 0;
    }

    /// Bytes still available at the current cursor (ignoring alignment).
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.capacity - self.head
    }

    /// Current cursor position.
    #[inline]
    #[must_use]
    pub fn head(&self) -> u64 {
        self.head
    }

    /// Total byte capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// GPU virtual address of the page start.
    #[inline]
    #[must_use]
    pub fn gpu_address(&self) -> u64 {
        self.memory.gpu_address()
    }

    /// Copies `data` into the page at `offset`.
    fn write(&self, offset: u64, data: &[u8]) {
        self.memory.write(offset, data);
    }

    /// Copies page contents at `offset` into `out`.
    fn read(&self, offset: u64, out: &mut [u8]) {
        self.memory.read(offset, out);
    }
}

// ─── LinearAllocator ──────────────────────────────────────────────────────────

/// Page pool + bump allocation over the active page.
///
/// Transient allocation pressure (a full page) is handled here and never
/// surfaced: the allocator retires the full page and takes another. Only
/// backend failures (page creation) propagate.
pub struct LinearAllocator {
    backend: Arc<dyn RenderBackend>,
    label: &'static str,
    pages: slotmap::SlotMap<PageKey, Page>,
    active: Option<PageKey>,
    retired: Vec<PageKey>,
    free: Vec<PageKey>,
    page_size: u64,
}

impl LinearAllocator {
    /// Creates an empty allocator; the first page is created lazily.
    #[must_use]
    pub fn new(backend: Arc<dyn RenderBackend>, label: &'static str, page_size: u64) -> Self {
        Self {
            backend,
            label,
            pages: slotmap::SlotMap::with_key(),
            active: None,
            retired: Vec::new(),
            free: Vec::new(),
            page_size,
        }
    }

    /// Allocates `size` bytes at `align` from the active page, rolling over
    /// to a pooled or fresh page on overflow.
    pub fn allocate(&mut self, size: u64, align: u64) -> Result<MemoryAllocation> {
        // Oversized requests get a dedicated page; it is immediately full.
        if size > self.page_size {
            log::debug!(
                "{}: oversized allocation of {size} bytes (page size {})",
                self.label,
                self.page_size
            );
            let key = self.create_page(size)?;
            let page = &mut self.pages[key];
            let offset = page
                .try_allocate(size, align)
                .expect("fresh oversized page must fit its own request");
            let gpu_address = page.gpu_address() + offset;
            self.retired.push(key);
            return Ok(MemoryAllocation { page: key, offset, size, gpu_address });
        }

        loop {
            if let Some(key) = self.active {
                let page = &mut self.pages[key];
                if let Some(offset) = page.try_allocate(size, align) {
                    let gpu_address = page.gpu_address() + offset;
                    return Ok(MemoryAllocation { page: key, offset, size, gpu_address });
                }
                // Page full: retire it and roll over.
                self.retired.push(key);
                self.active = None;
            }

            let key = match self.free.pop() {
                Some(key) => key,
                None => {
                    let key = self.create_page(self.page_size)?;
                    log::debug!(
                        "{}: page pool grew to {} pages",
                        self.label,
                        self.pages.len()
                    );
                    key
                }
            };
            self.active = Some(key);
        }
    }

    /// Copies `data` into a previously returned allocation.
    ///
    /// # Panics
    ///
    /// Panics if `data` exceeds the allocation's size — that is a caller
    /// bug, not a runtime condition.
    pub fn write(&self, allocation: &MemoryAllocation, data: &[u8]) {
        assert!(
            data.len() as u64 <= allocation.size,
            "write of {} bytes into a {}-byte allocation",
            data.len(),
            allocation.size
        );
        self.pages[allocation.page].write(allocation.offset, data);
    }

    /// Reads back an allocation's bytes (diagnostics and tests).
    pub fn read(&self, allocation: &MemoryAllocation, out: &mut [u8]) {
        debug_assert!(out.len() as u64 <= allocation.size);
        self.pages[allocation.page].read(allocation.offset, out);
    }

    /// Rewinds every page and returns all of them to the free pool.
    ///
    /// This is the only reclamation mechanism. Callers are responsible for
    /// proving (via fences) that the GPU no longer reads any page.
    pub fn reset(&mut self) {
        if let Some(key) = self.active.take() {
            self.retired.push(key);
        }
        for key in self.retired.drain(..) {
            self.pages[key].reset();
            self.free.push(key);
        }
    }

    /// Total number of pages owned (active + retired + free).
    #[inline]
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Bytes bump-allocated from the currently active page.
    #[inline]
    #[must_use]
    pub fn active_head(&self) -> u64 {
        self.active.map_or(0, |key| self.pages[key].head())
    }

    fn create_page(&mut self, size: u64) -> Result<PageKey> {
        let memory = self.backend.create_upload_page(size)?;
        Ok(self.pages.insert(Page::new(memory)))
    }
}
