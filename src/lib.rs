//! # kiln
//!
//! The GPU frame-execution core of a real-time renderer: turning a declared
//! sequence of render passes ("producers") into correctly ordered, correctly
//! synchronized GPU command submissions, while managing the transient
//! CPU/GPU memory those passes consume.
//!
//! The core is graphics-API-agnostic: everything device-shaped sits behind
//! the binding contracts in [`gpu::backend`], and the crate ships a fully
//! functional in-process [`HeadlessBackend`](gpu::headless::HeadlessBackend)
//! for tests, CI and headless tools.
//!
//! ```rust
//! use std::sync::Arc;
//! use kiln::gpu::headless::{HeadlessBackend, HeadlessPipelines, HeadlessSurface};
//! use kiln::graph::passes::{ClearPass, ForwardPass};
//! use kiln::graph::FrameInputs;
//! use kiln::renderer::RenderCore;
//! use kiln::settings::RenderSettings;
//!
//! # fn main() -> kiln::Result<()> {
//! let backend = Arc::new(HeadlessBackend::new());
//! let pipelines = Arc::new(HeadlessPipelines::new());
//! let settings = RenderSettings::default();
//!
//! let mut surface = HeadlessSurface::new(backend.as_ref(), settings.resolution, 2)?;
//! let mut core = RenderCore::new(backend, pipelines, settings)?;
//! core.add_producer(Box::new(ClearPass));
//! core.add_producer(Box::new(ForwardPass::new()));
//! core.initialize()?;
//!
//! core.render_frame(&mut surface, &FrameInputs::empty())?;
//! core.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod descriptor;
pub mod errors;
pub mod gpu;
pub mod graph;
pub mod pipeline;
pub mod renderer;
pub mod settings;
pub mod upload;

pub use descriptor::{DescriptorAllocator, DescriptorSlot, DescriptorTables, ViewKind};
pub use errors::{KilnError, Result};
pub use gpu::{
    CommandList, CommandManager, CommandQueue, Fence, FenceValue, GpuResource, QueueClass,
};
pub use graph::{DrawItem, FnProducer, FrameInputs, Producer, ResourceContext, Scheduler};
pub use pipeline::{PipelineHandle, PipelineProvider};
pub use renderer::{RenderCore, BACKBUFFER};
pub use settings::{Color, RenderSettings};
pub use upload::{FrameUploadAllocator, LinearAllocator, MemoryAllocation};
