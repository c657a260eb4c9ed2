//! Error Types
//!
//! This module defines the error types used throughout the frame-execution
//! core.
//!
//! # Overview
//!
//! The main error type [`KilnError`] covers all failure modes including:
//! - GPU backend and queue failures
//! - Fixed-capacity table exhaustion (fatal configuration errors)
//! - Frame-pipelining invariant violations
//! - Producer (render pass) failures, escalated with context
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, KilnError>`.
//!
//! Transient allocation pressure (a full upload page) is deliberately NOT
//! represented here — it is handled locally inside the allocators and never
//! escalates to callers.

use thiserror::Error;

use crate::gpu::fence::FenceValue;
use crate::graph::producer::FramePhase;

/// The main error type for the kiln frame-execution core.
///
/// Each variant carries enough context to act on the failure without
/// re-deriving it: capacity errors name the table, pipelining errors name
/// the frame slot, producer errors name the producer and the frame.
#[derive(Error, Debug)]
pub enum KilnError {
    // ========================================================================
    // GPU & Backend Errors
    // ========================================================================
    /// The graphics-API binding reported a failure (device/queue/heap
    /// creation, submission rejection). Unrecoverable during startup.
    #[error("GPU backend error: {0}")]
    Backend(String),

    /// A CPU-side fence wait could not make progress. Raised by bindings
    /// whose simulated or real timeline wedged (a GPU hang equivalent).
    #[error("fence wait stalled before reaching value {0}")]
    WaitStalled(FenceValue),

    /// Swap-chain / back-buffer acquisition or presentation failed.
    #[error("surface error: {0}")]
    Surface(String),

    // ========================================================================
    // Capacity Errors (fatal — fixed tables cannot grow)
    // ========================================================================
    /// A fixed-capacity descriptor table is exhausted. Growing the table
    /// would invalidate already-bound indices, so this is a configuration
    /// error surfaced at the allocation call site.
    #[error("descriptor table `{table}` exhausted (capacity {capacity})")]
    DescriptorTableFull {
        /// Human-readable table name (`"cpu-views"` / `"shader-views"`).
        table: &'static str,
        /// The configured hard capacity.
        capacity: u32,
    },

    // ========================================================================
    // Frame Pipelining Errors
    // ========================================================================
    /// A frame-slot reset was requested while the GPU may still be reading
    /// that slot's memory. The reset call checks fence completion itself;
    /// seeing this error means the caller skipped the slot-reuse wait.
    #[error("frame slot {slot} is still in flight (fence value {value} not complete)")]
    SlotInFlight {
        /// The frame slot whose arena was about to be reset.
        slot: usize,
        /// The first fence value that has not yet completed.
        value: FenceValue,
    },

    // ========================================================================
    // Graph & Producer Errors
    // ========================================================================
    /// A producer's Initialize/Setup/Render callback failed. The frame is
    /// aborted; the partially recorded command batch is never submitted.
    #[error("producer `{producer}` failed during {phase} on frame {frame}: {source}")]
    ProducerFailed {
        /// Name of the failing producer.
        producer: String,
        /// The phase the failure occurred in.
        phase: FramePhase,
        /// Absolute frame index at the time of failure.
        frame: u64,
        /// The underlying failure.
        #[source]
        source: Box<KilnError>,
    },

    /// Startup validation: a producer declares a read of a logical resource
    /// that no earlier producer writes and no persistent/external record
    /// provides.
    #[error("producer `{producer}` reads `{resource}` before any earlier producer writes it")]
    OrderingViolation {
        /// The offending producer.
        producer: String,
        /// The logical resource name read too early.
        resource: String,
    },

    /// A logical resource name was not registered for the active frame.
    #[error("unknown resource `{0}` for the active frame")]
    UnknownResource(String),

    /// Free-form failure raised from inside a producer callback.
    #[error("pass error: {0}")]
    Pass(String),

    // ========================================================================
    // Pipeline & Configuration Errors
    // ========================================================================
    /// The pipeline collaborator does not know the requested state object.
    #[error("pipeline `{0}` not found")]
    PipelineNotFound(String),

    /// Rejected settings values (zero frames in flight, zero resolution, …).
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Settings JSON parse error.
    #[error("settings parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Alias for `Result<T, KilnError>`.
pub type Result<T> = std::result::Result<T, KilnError>;
