//! Per-Frame Resource Registry
//!
//! [`ResourceContext`] maps logical resource names ("GBufferAlbedo",
//! "scene-depth") to lazily created or reused physical resources plus their
//! views, and owns resource-state bookkeeping for the frame.
//!
//! # Lifetimes
//!
//! | Lifetime     | Registered by           | Reset                            |
//! |--------------|-------------------------|----------------------------------|
//! | `Persistent` | `create_persistent` (initialization) | survives frames     |
//! | `Transient`  | `create_or_get` (Setup phase)        | retired at frame end |
//! | `External`   | `register_external` (the core)       | dropped at frame end |
//!
//! # Memory Strategy
//!
//! Retired transient backings are parked in a description-keyed free pool
//! and reused in later frames — the same logical name may resolve to a
//! different physical resource next frame, which is what enables reuse and
//! aliasing. Shader-visible views travel with the pooled physical resource
//! so bindless indices stay stable; CPU-only views (RTV/DSV) are cheap and
//! re-allocated each frame from the per-frame descriptor region.
//!
//! Physical resources are never destroyed during normal rendering; call
//! [`ResourceContext::trim`] after a resolution change to release stale
//! pool entries.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::descriptor::{DescriptorSlot, DescriptorTables, ViewKind};
use crate::errors::{KilnError, Result};
use crate::gpu::backend::RenderBackend;
use crate::gpu::command::CommandList;
use crate::gpu::resource::{GpuResource, ResourceDesc, ResourceState};

// ─── Records ──────────────────────────────────────────────────────────────────

/// Who owns a record's backing resource, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLifetime {
    /// Created once at initialization; same backing every frame.
    Persistent,
    /// Valid for the active frame; backing recycled through the free pool.
    Transient,
    /// Owned by a collaborator (the back buffer); dropped at frame end.
    External,
}

/// A view bound to a record.
#[derive(Debug, Clone, Copy)]
pub struct ResourceView {
    pub kind: ViewKind,
    pub slot: DescriptorSlot,
}

/// One logical-name → physical-resource binding for the active frame.
pub struct ResourceRecord {
    pub name: String,
    pub resource: GpuResource,
    pub desc: ResourceDesc,
    /// Current access state on the GPU timeline.
    pub state: ResourceState,
    pub lifetime: ResourceLifetime,
    views: SmallVec<[ResourceView; 4]>,
}

impl ResourceRecord {
    /// The view of `kind` bound to this record, if one was created.
    #[must_use]
    pub fn view(&self, kind: ViewKind) -> Option<DescriptorSlot> {
        self.views.iter().find(|v| v.kind == kind).map(|v| v.slot)
    }
}

/// A recycled physical resource waiting in the free pool.
struct PooledResource {
    resource: GpuResource,
    /// Shader-visible views survive pooling — their table never resets, so
    /// the bindless indices stay valid for this physical resource.
    shader_views: SmallVec<[ResourceView; 4]>,
    /// Last known GPU state, restored on reuse so transitions stay correct.
    state: ResourceState,
    idle_frames: u32,
}

// ─── ResourceContext ──────────────────────────────────────────────────────────

/// The frame graph's resource registry. Mutated only by the scheduling
/// thread; no internal locking is needed or present.
pub struct ResourceContext {
    backend: Arc<dyn RenderBackend>,
    persistent: FxHashMap<String, ResourceRecord>,
    active: FxHashMap<String, ResourceRecord>,
    free: FxHashMap<ResourceDesc, Vec<PooledResource>>,
    frame_index: u64,
}

impl ResourceContext {
    /// Creates an empty registry bound to a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn RenderBackend>) -> Self {
        Self {
            backend,
            persistent: FxHashMap::default(),
            active: FxHashMap::default(),
            free: FxHashMap::default(),
            frame_index: 0,
        }
    }

    // ── Frame boundary ─────────────────────────────────────────────────────

    /// Starts a new frame's registration generation.
    pub fn begin_frame(&mut self, frame_index: u64) {
        debug_assert!(
            self.active.is_empty(),
            "end_frame was not called for the previous frame"
        );
        self.frame_index = frame_index;
    }

    /// Invalidates all per-frame records: transient backings return to the
    /// free pool, external records are dropped.
    pub fn end_frame(&mut self) {
        for (_, record) in self.active.drain() {
            if record.lifetime == ResourceLifetime::External {
                continue;
            }
            let shader_views = record
                .views
                .into_iter()
                .filter(|v| v.kind.shader_visible())
                .collect();
            self.free.entry(record.desc).or_default().push(PooledResource {
                resource: record.resource,
                shader_views,
                state: record.state,
                idle_frames: 0,
            });
        }
    }

    // ── Registration ───────────────────────────────────────────────────────

    /// Creates an engine-lifetime resource (e.g. the main depth buffer).
    ///
    /// Called during producer initialization, not per frame. Re-creating an
    /// existing name replaces its backing (resize re-initialization).
    pub fn create_persistent(
        &mut self,
        name: &str,
        desc: ResourceDesc,
    ) -> Result<&mut ResourceRecord> {
        if self.persistent.contains_key(name) {
            log::debug!("replacing persistent resource `{name}`");
        }
        let resource = self.backend.create_resource(name, &desc)?;
        self.persistent.insert(
            name.to_string(),
            ResourceRecord {
                name: name.to_string(),
                resource,
                desc,
                state: ResourceState::Common,
                lifetime: ResourceLifetime::Persistent,
                views: SmallVec::new(),
            },
        );
        Ok(self
            .persistent
            .get_mut(name)
            .expect("record inserted just above"))
    }

    /// Registers a collaborator-owned resource (the back buffer) for the
    /// active frame. Its state starts at `Present` — that is how the
    /// surface hands it over.
    pub fn register_external(&mut self, name: &str, resource: GpuResource) {
        let desc = resource.desc();
        self.active.insert(
            name.to_string(),
            ResourceRecord {
                name: name.to_string(),
                resource,
                desc,
                state: ResourceState::Present,
                lifetime: ResourceLifetime::External,
                views: SmallVec::new(),
            },
        );
    }

    /// Returns the record registered under `name` for the active frame,
    /// creating a transient resource (or reusing a pooled backing) if none
    /// exists yet. Idempotent within a frame.
    pub fn create_or_get(&mut self, name: &str, desc: ResourceDesc) -> Result<&mut ResourceRecord> {
        if self.persistent.contains_key(name) {
            return Ok(self
                .persistent
                .get_mut(name)
                .expect("checked key just above"));
        }

        if !self.active.contains_key(name) {
            let (resource, views, state) = match self.free.get_mut(&desc).and_then(Vec::pop) {
                Some(pooled) => {
                    log::trace!("reusing pooled backing for `{name}`");
                    (pooled.resource, pooled.shader_views, pooled.state)
                }
                None => (
                    self.backend.create_resource(name, &desc)?,
                    SmallVec::new(),
                    ResourceState::Common,
                ),
            };
            self.active.insert(
                name.to_string(),
                ResourceRecord {
                    name: name.to_string(),
                    resource,
                    desc,
                    state,
                    lifetime: ResourceLifetime::Transient,
                    views,
                },
            );
        }

        let record = self
            .active
            .get_mut(name)
            .expect("record present or inserted just above");
        if record.desc != desc {
            log::warn!(
                "resource `{name}` requested with a different description than it was created with this frame"
            );
        }
        Ok(record)
    }

    // ── Views ──────────────────────────────────────────────────────────────

    /// Binds a view of `kind` to the named record, allocating a descriptor
    /// from the matching table. Idempotent per record and kind: repeated
    /// calls return the already-bound slot.
    pub fn create_view(
        &mut self,
        name: &str,
        kind: ViewKind,
        tables: &mut DescriptorTables,
    ) -> Result<DescriptorSlot> {
        let record = self.record_mut(name)?;
        if let Some(slot) = record.view(kind) {
            return Ok(slot);
        }
        let slot = tables.for_kind(kind).allocate()?;
        record.views.push(ResourceView { kind, slot });
        Ok(slot)
    }

    // ── State bookkeeping ──────────────────────────────────────────────────

    /// Records a state barrier into `list` and updates the record. No-op
    /// when the resource is already in the requested state.
    pub fn transition(
        &mut self,
        name: &str,
        to: ResourceState,
        list: &mut CommandList,
    ) -> Result<()> {
        let record = self.record_mut(name)?;
        if record.state != to {
            list.transition(record.resource.clone(), record.state, to);
            record.state = to;
        }
        Ok(())
    }

    // ── Lookup ─────────────────────────────────────────────────────────────

    /// The record registered under `name`, if any (active frame first,
    /// then persistent).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceRecord> {
        self.active.get(name).or_else(|| self.persistent.get(name))
    }

    /// `true` when `name` resolves for the active frame.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.active.contains_key(name) || self.persistent.contains_key(name)
    }

    /// Names of all persistent records (seed set for ordering validation).
    pub fn persistent_names(&self) -> impl Iterator<Item = &str> {
        self.persistent.keys().map(String::as_str)
    }

    /// The frame index passed to the last [`begin_frame`](Self::begin_frame).
    #[inline]
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    // ── Pool maintenance ───────────────────────────────────────────────────

    /// Releases pooled backings idle for more than `max_idle_frames`
    /// frames. Call after resolution changes to drop stale sizes.
    pub fn trim(&mut self, max_idle_frames: u32) {
        for bucket in self.free.values_mut() {
            for pooled in bucket.iter_mut() {
                pooled.idle_frames += 1;
            }
            bucket.retain(|pooled| pooled.idle_frames <= max_idle_frames);
        }
        self.free.retain(|_, bucket| !bucket.is_empty());
    }

    /// Drops every persistent record (resize re-initialization path).
    pub fn clear_persistent(&mut self) {
        self.persistent.clear();
    }

    /// Total number of pooled (idle) backings.
    #[must_use]
    pub fn pooled_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    fn record_mut(&mut self, name: &str) -> Result<&mut ResourceRecord> {
        if self.active.contains_key(name) {
            return Ok(self
                .active
                .get_mut(name)
                .expect("checked key just above"));
        }
        self.persistent
            .get_mut(name)
            .ok_or_else(|| KilnError::UnknownResource(name.to_string()))
    }
}
