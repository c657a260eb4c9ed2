//! Pipeline Collaborator Boundary
//!
//! The shader/pipeline toolchain is an external collaborator: it compiles
//! shader binaries and pipeline-state objects and exposes them by name. The
//! core treats pipeline-state creation as a one-time Initialize/Setup-phase
//! cost — producers fetch handles once and reuse them every frame.

use std::sync::Arc;

use crate::errors::Result;

/// A compiled pipeline-state object owned by the pipeline collaborator.
///
/// Opaque to the core beyond its name; the graphics-API binding downcasts to
/// its concrete type when executing [`GpuCommand::SetPipeline`].
///
/// [`GpuCommand::SetPipeline`]: crate::gpu::command::GpuCommand::SetPipeline
pub trait PipelineState: Send + Sync {
    /// The name the state object was requested under.
    fn name(&self) -> &str;
}

/// Shared handle to a pipeline-state object. Cloning is cheap (`Arc`).
#[derive(Clone)]
pub struct PipelineHandle {
    inner: Arc<dyn PipelineState>,
}

impl PipelineHandle {
    /// Wraps a collaborator-owned state object.
    #[must_use]
    pub fn new(inner: Arc<dyn PipelineState>) -> Self {
        Self { inner }
    }

    /// The pipeline's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// `true` when both handles refer to the same state object.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("name", &self.inner.name())
            .finish()
    }
}

/// By-name lookup of compiled pipeline-state objects.
///
/// # Errors
///
/// Implementations return [`KilnError::PipelineNotFound`] for unknown names;
/// the core escalates that as a producer failure (a pass cannot run without
/// its pipeline).
///
/// [`KilnError::PipelineNotFound`]: crate::errors::KilnError::PipelineNotFound
pub trait PipelineProvider {
    /// Looks up the pipeline-state object registered under `name`.
    fn pipeline(&self, name: &str) -> Result<PipelineHandle>;
}
