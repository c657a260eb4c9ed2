//! Built-in Producers
//!
//! The stock passes every frame needs plus one compute-queue example:
//!
//! - [`clear::ClearPass`] — back-buffer clear with the configured color
//! - [`forward::ForwardPass`] — visible-set draws with per-draw constant
//!   uploads through the frame arena
//! - [`raytrace::RaytracedLightingPass`] — compute-queue lighting,
//!   self-disabling when raytracing is off or nothing is visible
//!
//! Applications add their own producers around these; the scheduler treats
//! all producers identically.

pub mod clear;
pub mod forward;
pub mod raytrace;

pub use clear::ClearPass;
pub use forward::{ForwardPass, SCENE_DEPTH};
pub use raytrace::{RaytracedLightingPass, RT_LIGHTING};
