//! Renderer Settings
//!
//! This module defines the startup configuration consumed by
//! [`RenderCore::new`](crate::renderer::RenderCore::new).
//!
//! Settings are plain data: the embedding application (the configuration
//! collaborator) can construct them directly or deserialize them from JSON
//! via [`RenderSettings::from_json`].
//!
//! # Quick Start
//!
//! ```rust
//! use kiln::settings::RenderSettings;
//!
//! // Default: double-buffered pipelining, raytracing off, 1280×720
//! let settings = RenderSettings::default();
//!
//! // Triple-buffered with raytracing-dependent producers enabled
//! let settings = RenderSettings {
//!     max_frames_in_flight: 3,
//!     enable_raytracing: true,
//!     ..Default::default()
//! };
//! # let _ = settings;
//! ```

use serde::{Deserialize, Serialize};

use crate::errors::{KilnError, Result};

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Double-precision RGBA color used for clear operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };

    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    /// Returns the color as an `[r, g, b, a]` array.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [f64; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    #[inline]
    fn default() -> Self {
        Self::BLACK
    }
}

// ---------------------------------------------------------------------------
// RenderSettings
// ---------------------------------------------------------------------------

/// Global configuration for frame-core initialization.
///
/// This struct is consumed once during [`RenderCore::new`] to size the
/// fixed-capacity tables and the frame-pipelining depth. Capacity fields are
/// hard ceilings: exceeding them at runtime is a fatal configuration error,
/// not a recoverable one (see [`KilnError::DescriptorTableFull`]).
///
/// # Fields
///
/// | Field                   | Description                                  | Default    |
/// |-------------------------|----------------------------------------------|------------|
/// | `max_frames_in_flight`  | Depth of CPU/GPU pipelining (1–3 typical)    | `2`        |
/// | `enable_raytracing`     | Gates raytracing-dependent producers         | `false`    |
/// | `resolution`            | Sizes transient render resources             | `1280×720` |
/// | `clear_color`           | Used by the frame-clear producer             | Black      |
/// | `upload_page_size`      | Byte capacity of one upload arena page       | `2 MiB`    |
/// | `view_table_capacity`   | CPU-only view table (RTV/DSV) slot count     | `256`      |
/// | `shader_table_capacity` | Shader-visible view table slot count         | `4096`     |
///
/// [`RenderCore::new`]: crate::renderer::RenderCore::new
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    // === Frame Pipelining ===
    /// Number of frames the CPU may run ahead of the GPU.
    ///
    /// Per-frame resources (upload arenas, transient registrations) are
    /// indexed by `frame % max_frames_in_flight`; reusing a slot waits for
    /// the GPU to finish that slot's previous frame. Higher values trade
    /// latency for throughput.
    pub max_frames_in_flight: u32,

    // === Feature Gates ===
    /// Enables producers that depend on raytracing support.
    ///
    /// When `false`, such producers report themselves disabled and are
    /// skipped entirely (no resource or command cost).
    pub enable_raytracing: bool,

    // === Rendering Defaults ===
    /// Output resolution in pixels, `(width, height)`.
    ///
    /// Transient frame resources (depth, lighting targets) are sized from
    /// this; changing it requires [`RenderCore::resize`].
    ///
    /// [`RenderCore::resize`]: crate::renderer::RenderCore::resize
    pub resolution: (u32, u32),

    /// Background clear color for the back buffer.
    ///
    /// May be overridden per frame through
    /// [`FrameInputs::background`](crate::graph::context::FrameInputs).
    pub clear_color: Color,

    // === Capacity Configuration ===
    /// Byte capacity of a single upload-arena page.
    ///
    /// Requests larger than this get a dedicated oversized page; the page
    /// pool otherwise grows on demand, so this is a granularity knob rather
    /// than a hard limit.
    pub upload_page_size: u64,

    /// Capacity of the CPU-only view table (render-target / depth-stencil
    /// views). Hard ceiling — must cover one frame's worth of views.
    pub view_table_capacity: u32,

    /// Capacity of the shader-visible view table (shader-resource /
    /// constant-buffer / unordered-access views). Hard ceiling for the
    /// lifetime of the core; indices handed out from it are stable.
    pub shader_table_capacity: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            max_frames_in_flight: 2,
            enable_raytracing: false,
            resolution: (1280, 720),
            clear_color: Color::BLACK,
            upload_page_size: 2 * 1024 * 1024,
            view_table_capacity: 256,
            shader_table_capacity: 4096,
        }
    }
}

impl RenderSettings {
    /// Parses settings from a JSON document.
    ///
    /// Missing fields fall back to their defaults, so a partial document
    /// such as `{"max_frames_in_flight": 3}` is valid.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects configurations the core cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.max_frames_in_flight == 0 {
            return Err(KilnError::InvalidSettings(
                "max_frames_in_flight must be at least 1".into(),
            ));
        }
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err(KilnError::InvalidSettings(format!(
                "resolution must be non-zero, got {}x{}",
                self.resolution.0, self.resolution.1
            )));
        }
        if self.upload_page_size == 0 {
            return Err(KilnError::InvalidSettings(
                "upload_page_size must be non-zero".into(),
            ));
        }
        if self.view_table_capacity == 0 || self.shader_table_capacity == 0 {
            return Err(KilnError::InvalidSettings(
                "descriptor table capacities must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let settings = RenderSettings::from_json(r#"{"max_frames_in_flight": 3}"#).unwrap();
        assert_eq!(settings.max_frames_in_flight, 3);
        assert_eq!(settings.resolution, (1280, 720));
        assert!(!settings.enable_raytracing);
    }

    #[test]
    fn zero_frames_in_flight_is_rejected() {
        let err = RenderSettings::from_json(r#"{"max_frames_in_flight": 0}"#).unwrap_err();
        assert!(matches!(err, KilnError::InvalidSettings(_)));
    }
}
