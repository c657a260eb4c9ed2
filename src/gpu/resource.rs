//! GPU Resource Descriptions & Handles
//!
//! API-agnostic description of GPU resources and the shared handle type the
//! core passes around. The physical object behind a [`GpuResource`] is
//! whatever the active [`RenderBackend`](crate::gpu::backend::RenderBackend)
//! created — a D3D12 committed resource, a Vulkan image, or a headless stub.
//!
//! Descriptions are hashable on purpose: the transient free pool in
//! [`ResourceContext`](crate::graph::resources::ResourceContext) keys
//! recycled resources by their full description.

use std::sync::Arc;

use crate::gpu::backend::ResourceBinding;

// ─── Formats & Usage ──────────────────────────────────────────────────────────

/// Texture storage formats the core can describe.
///
/// Deliberately small: this is the set the scheduling machinery itself needs
/// to size and pool resources, not a full graphics-API format zoo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
    R8Unorm,
    Depth32Float,
}

bitflags::bitflags! {
    /// Declared usage of a resource; determines which views may be created
    /// and which states it can be transitioned into.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceUsage: u32 {
        const RENDER_TARGET    = 1 << 0;
        const DEPTH_STENCIL    = 1 << 1;
        const SHADER_RESOURCE  = 1 << 2;
        const UNORDERED_ACCESS = 1 << 3;
        const COPY_SRC         = 1 << 4;
        const COPY_DST         = 1 << 5;
    }
}

// ─── Descriptions ─────────────────────────────────────────────────────────────

/// What kind of resource to create, with its dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A 2D texture (render targets, depth buffers, lighting outputs).
    Texture2D {
        width: u32,
        height: u32,
        format: TextureFormat,
    },
    /// A raw GPU buffer of `size` bytes.
    Buffer { size: u64 },
}

/// Full description of a resource request.
///
/// Two requests with equal descriptions are satisfiable by the same physical
/// resource, which is exactly how the transient pool recycles backings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceDesc {
    pub kind: ResourceKind,
    pub usage: ResourceUsage,
}

impl ResourceDesc {
    /// Convenience constructor for a 2D texture description.
    #[must_use]
    pub const fn texture_2d(
        width: u32,
        height: u32,
        format: TextureFormat,
        usage: ResourceUsage,
    ) -> Self {
        Self {
            kind: ResourceKind::Texture2D { width, height, format },
            usage,
        }
    }

    /// Convenience constructor for a buffer description.
    #[must_use]
    pub const fn buffer(size: u64, usage: ResourceUsage) -> Self {
        Self {
            kind: ResourceKind::Buffer { size },
            usage,
        }
    }
}

// ─── State ────────────────────────────────────────────────────────────────────

/// The access state a resource is currently in on the GPU timeline.
///
/// The core tracks one state per resource record and records explicit
/// transition commands when a producer requests a different state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceState {
    /// No particular access; freshly created resources start here.
    #[default]
    Common,
    RenderTarget,
    DepthWrite,
    ShaderResource,
    UnorderedAccess,
    CopySource,
    CopyDest,
    /// Ready for the surface collaborator to present.
    Present,
}

// ─── Handle ───────────────────────────────────────────────────────────────────

/// Shared handle to a physical GPU resource created by the active backend.
///
/// Cloning is cheap (`Arc`). The handle is opaque to the core beyond its
/// description and label; identity comparisons use [`ptr_eq`](Self::ptr_eq).
#[derive(Clone)]
pub struct GpuResource {
    inner: Arc<dyn ResourceBinding>,
}

impl GpuResource {
    /// Wraps a backend resource object.
    #[must_use]
    pub fn new(inner: Arc<dyn ResourceBinding>) -> Self {
        Self { inner }
    }

    /// The description the resource was created with.
    #[inline]
    #[must_use]
    pub fn desc(&self) -> ResourceDesc {
        self.inner.desc()
    }

    /// Debug label supplied at creation.
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        self.inner.label()
    }

    /// `true` when both handles refer to the same physical resource.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for GpuResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuResource")
            .field("label", &self.inner.label())
            .field("desc", &self.inner.desc())
            .finish()
    }
}
