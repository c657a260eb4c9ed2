//! Frame Graph
//!
//! The declared-order producer model and its per-frame machinery:
//!
//! - [`producer`] — the [`Producer`](producer::Producer) contract and the
//!   function-bundle adapter
//! - [`scheduler`] — two-phase (Setup → Render) frame execution with
//!   failure escalation and startup ordering validation
//! - [`context`] — phase-separated contexts handed to producers
//! - [`resources`] — the per-frame logical-name → resource registry
//! - [`passes`] — built-in producers

pub mod context;
pub mod passes;
pub mod producer;
pub mod resources;
pub mod scheduler;

pub use context::{DrawItem, FrameInputs, InitContext, RenderContext, SetupContext};
pub use producer::{FnProducer, FramePhase, Producer};
pub use resources::{ResourceContext, ResourceLifetime, ResourceRecord};
pub use scheduler::Scheduler;
