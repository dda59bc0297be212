//! Renderer Settings & Feature Flags
//!
//! This module defines the configuration surface of the frame pipeline.
//!
//! The core abstraction is [`RenderFlags`], a bitmask of optional passes and
//! gizmo categories. Each pass queries the mask when it executes, so toggling
//! a flag takes effect on the next frame and never in the middle of a pass.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_deferred::renderer::{RendererSettings, RenderFlags, ToneMapping};
//!
//! // Default: TAA, SSAO, bloom, motion blur, sharpening, dithering
//! let settings = RendererSettings::default();
//!
//! // Minimal chain: only the unconditional gamma stage runs
//! let settings = RendererSettings {
//!     flags: RenderFlags::empty(),
//!     tone_mapping: ToneMapping::Off,
//!     ..Default::default()
//! };
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Largest accepted width or height, matching the common 2D texture limit.
pub const DEFAULT_MAX_RESOLUTION: u32 = 16384;

// ---------------------------------------------------------------------------
// RenderFlags
// ---------------------------------------------------------------------------

bitflags! {
    /// Optional features queried by the passes at execution time.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct RenderFlags: u32 {
        const TAA                       = 1 << 0;
        const SSAO                      = 1 << 1;
        const BLOOM                     = 1 << 2;
        const MOTION_BLUR               = 1 << 3;
        const SHARPENING                = 1 << 4;
        const DITHERING                 = 1 << 5;
        const CHROMATIC_ABERRATION      = 1 << 6;
        const FXAA                      = 1 << 7;
        const SSR                       = 1 << 8;

        const GIZMO_TRANSFORM           = 1 << 16;
        const GIZMO_GRID                = 1 << 17;
        const GIZMO_LIGHTS              = 1 << 18;
        const GIZMO_PHYSICS             = 1 << 19;
        const GIZMO_AABB                = 1 << 20;
        const GIZMO_PICKING_RAY         = 1 << 21;
        const GIZMO_PERFORMANCE_METRICS = 1 << 22;
    }
}

impl Default for RenderFlags {
    /// Chromatic aberration is a stylistic effect and FXAA is superseded by
    /// TAA, so both start disabled.
    fn default() -> Self {
        Self::GIZMO_TRANSFORM
            | Self::GIZMO_GRID
            | Self::GIZMO_LIGHTS
            | Self::GIZMO_PHYSICS
            | Self::BLOOM
            | Self::SSAO
            | Self::MOTION_BLUR
            | Self::TAA
            | Self::SHARPENING
            | Self::DITHERING
            | Self::SSR
    }
}

// ---------------------------------------------------------------------------
// ToneMapping
// ---------------------------------------------------------------------------

/// Tone mapping operator applied before gamma correction.
///
/// [`Off`](ToneMapping::Off) skips the tone mapping stage entirely; the
/// post-process chain behaves as if the stage were absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToneMapping {
    Off,
    #[default]
    Aces,
    Reinhard,
    Uncharted2,
}

impl ToneMapping {
    /// Value written into the frame uniform block.
    #[inline]
    #[must_use]
    pub fn shader_value(self) -> f32 {
        match self {
            Self::Off => 0.0,
            Self::Aces => 1.0,
            Self::Reinhard => 2.0,
            Self::Uncharted2 => 3.0,
        }
    }
}

// ---------------------------------------------------------------------------
// DebugBuffer
// ---------------------------------------------------------------------------

/// Intermediate buffer shown full-screen by the debug overlay pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DebugBuffer {
    #[default]
    None,
    Albedo,
    Normal,
    Material,
    Velocity,
    Depth,
    Ssao,
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Tunable parameters of the frame pipeline.
///
/// Everything here is plain data. The renderer reads it through the render
/// context every frame, so edits between frames are always safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub flags: RenderFlags,
    pub tone_mapping: ToneMapping,
    pub debug_buffer: DebugBuffer,

    pub gamma: f32,
    pub bloom_intensity: f32,
    pub sharpen_strength: f32,
    pub sharpen_clamp: f32,
    pub motion_blur_strength: f32,

    pub fxaa_sub_pixel: f32,
    pub fxaa_edge_threshold: f32,
    pub fxaa_edge_threshold_min: f32,

    /// Upper bound for either dimension passed to `set_resolution`.
    pub max_resolution: u32,
    pub fps_target: f32,

    pub gizmo_transform_size: f32,
    pub gizmo_transform_speed: f32,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            flags: RenderFlags::default(),
            tone_mapping: ToneMapping::default(),
            debug_buffer: DebugBuffer::default(),

            gamma: 2.2,
            bloom_intensity: 0.2,
            sharpen_strength: 1.0,
            sharpen_clamp: 0.35,
            motion_blur_strength: 1.0,

            fxaa_sub_pixel: 1.25,
            fxaa_edge_threshold: 0.125,
            fxaa_edge_threshold_min: 0.0312,

            max_resolution: DEFAULT_MAX_RESOLUTION,
            fps_target: 60.0,

            gizmo_transform_size: 0.015,
            gizmo_transform_speed: 12.0,
        }
    }
}

impl RendererSettings {
    #[inline]
    #[must_use]
    pub fn is_enabled(&self, flag: RenderFlags) -> bool {
        self.flags.contains(flag)
    }

    #[inline]
    pub fn set_enabled(&mut self, flag: RenderFlags, enabled: bool) {
        self.flags.set(flag, enabled);
    }
}
