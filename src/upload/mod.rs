//! Transient Upload Memory
//!
//! Bump/arena allocation for CPU-written, GPU-read memory with deferred,
//! fence-gated reclamation:
//!
//! - [`linear`] — pages, the bump allocator, and the page pool
//! - [`frame`] — one arena per frame-in-flight slot, reset only after the
//!   GPU provably finished reading the slot

pub mod frame;
pub mod linear;

pub use frame::FrameUploadAllocator;
pub use linear::{LinearAllocator, MemoryAllocation, Page, PageKey};
