//! Frame State
//!
//! Per-frame data rebuilt from the scene snapshot: visibility buckets,
//! camera matrices, TAA jitter, the frame uniform block and queued debug
//! lines. The passes only read it; the renderer mutates it once at the
//! start of each frame.
//!
//! A few fields intentionally survive across frames: the frame counter, the
//! previous jitter (for the jitter delta in the uniform block) and the
//! queued debug lines until the lines pass consumes them.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

use super::settings::RendererSettings;
use crate::rhi::TextureId;
use crate::scene::{BoundingBox, EntityId, RenderCamera};

/// Length of the Halton jitter cycle.
pub const TAA_SAMPLES: u64 = 16;

// ─── Buckets ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Opaque,
    Transparent,
    Light,
    Camera,
}

impl Bucket {
    pub const COUNT: usize = 4;
}

// ─── Uniform Block ───────────────────────────────────────────────────────────

/// Global constant buffer layout shared by every pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub mvp: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
    pub projection_ortho: Mat4,
    pub view_projection: Mat4,
    pub view_projection_ortho: Mat4,

    pub camera_position: Vec3,
    pub camera_near: f32,

    pub camera_far: f32,
    pub resolution: Vec2,
    pub fxaa_sub_pixel: f32,

    pub fxaa_edge_threshold: f32,
    pub fxaa_edge_threshold_min: f32,
    pub blur_direction: Vec2,

    pub blur_sigma: f32,
    pub bloom_intensity: f32,
    pub sharpen_strength: f32,
    pub sharpen_clamp: f32,

    pub taa_jitter_offset: Vec2,
    pub motion_blur_strength: f32,
    pub fps_current: f32,

    pub fps_target: f32,
    pub gamma: f32,
    pub tonemapping: f32,
    _padding: f32,
}

impl FrameUniforms {
    #[must_use]
    pub fn with_blur(mut self, direction: Vec2, sigma: f32) -> Self {
        self.blur_direction = direction;
        self.blur_sigma = sigma;
        self
    }
}

/// Debug line vertex.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: Vec3,
    pub color: Vec4,
}

/// Counters for the metrics overlay.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    pub frame_number: u64,
    pub meshes_rendered: u32,
    pub draw_calls: u32,
    pub fps: f32,
}

// ─── FrameState ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FrameState {
    pub frame_number: u64,
    pub resolution: Vec2,

    buckets: [Vec<EntityId>; Bucket::COUNT],
    pub camera: Option<RenderCamera>,
    pub camera_entity: Option<EntityId>,
    pub skybox: Option<TextureId>,

    pub view: Mat4,
    /// Jittered when TAA is enabled.
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub view_projection_unjittered: Mat4,
    /// Last frame's unjittered view-projection, for motion vectors.
    pub view_projection_previous: Mat4,
    pub projection_ortho: Mat4,
    pub view_projection_ortho: Mat4,

    pub jitter: Vec2,
    pub jitter_previous: Vec2,

    /// Mean direction of the shadow-casting directional lights drawn this
    /// frame; zero when there are none.
    pub directional_light_avg_dir: Vec3,

    pub(crate) lines_depth: Vec<LineVertex>,
    pub(crate) lines_overlay: Vec<LineVertex>,

    pub stats: FrameStats,
}

impl Default for FrameState {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            frame_number: 0,
            resolution: Vec2::ZERO,
            buckets: Default::default(),
            camera: None,
            camera_entity: None,
            skybox: None,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            view_projection_unjittered: Mat4::IDENTITY,
            view_projection_previous: Mat4::IDENTITY,
            projection_ortho: Mat4::IDENTITY,
            view_projection_ortho: Mat4::IDENTITY,
            jitter: Vec2::ZERO,
            jitter_previous: Vec2::ZERO,
            directional_light_avg_dir: Vec3::ZERO,
            lines_depth: Vec::new(),
            lines_overlay: Vec::new(),
            stats: FrameStats::default(),
        }
    }

    // === Buckets ===

    #[inline]
    #[must_use]
    pub fn bucket(&self, bucket: Bucket) -> &[EntityId] {
        &self.buckets[bucket as usize]
    }

    #[inline]
    pub(crate) fn bucket_mut(&mut self, bucket: Bucket) -> &mut Vec<EntityId> {
        &mut self.buckets[bucket as usize]
    }

    /// Drops last frame's buckets, camera and sky.
    pub(crate) fn reset_scene(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.camera = None;
        self.camera_entity = None;
        self.skybox = None;
    }

    #[must_use]
    pub fn has_renderables(&self) -> bool {
        !self.bucket(Bucket::Opaque).is_empty() || !self.bucket(Bucket::Transparent).is_empty()
    }

    // === Per-frame setup ===

    /// Advances the frame counter and derives every matrix the passes use.
    pub fn begin_frame(&mut self, camera: &RenderCamera, resolution: Vec2, taa_enabled: bool) {
        self.frame_number += 1;
        self.resolution = resolution;
        self.stats = FrameStats { frame_number: self.frame_number, ..FrameStats::default() };
        self.directional_light_avg_dir = Vec3::ZERO;

        self.view = camera.view_matrix;
        self.projection = camera.projection_matrix;

        if taa_enabled && resolution.x > 0.0 && resolution.y > 0.0 {
            self.jitter_previous = self.jitter;
            let index = self.frame_number % TAA_SAMPLES;
            let sample = halton_2d(index) * 2.0 - Vec2::ONE;
            self.jitter = sample / resolution;
            self.projection =
                Mat4::from_translation(self.jitter.extend(0.0)) * camera.projection_matrix;
        } else {
            self.jitter = Vec2::ZERO;
            self.jitter_previous = Vec2::ZERO;
        }

        self.view_projection = self.projection * self.view;
        self.view_projection_previous = if self.frame_number == 1 {
            camera.view_projection_matrix
        } else {
            self.view_projection_unjittered
        };
        self.view_projection_unjittered = camera.view_projection_matrix;

        let half = resolution * 0.5;
        self.projection_ortho =
            Mat4::orthographic_rh(-half.x, half.x, -half.y, half.y, camera.near, camera.far);
        let base_view = Mat4::from_translation(Vec3::new(0.0, 0.0, -camera.near));
        self.view_projection_ortho = self.projection_ortho * base_view;
    }

    /// Fills the global uniform block for a target of `target_size`.
    #[must_use]
    pub fn uniforms(&self, settings: &RendererSettings, target_size: Vec2, mvp: Mat4) -> FrameUniforms {
        let (camera_position, camera_near, camera_far) = self
            .camera
            .as_ref()
            .map_or((Vec3::ZERO, 0.0, 0.0), |c| (c.position, c.near, c.far));

        FrameUniforms {
            mvp,
            view: self.view,
            projection: self.projection,
            projection_ortho: self.projection_ortho,
            view_projection: self.view_projection,
            view_projection_ortho: self.view_projection_ortho,
            camera_position,
            camera_near,
            camera_far,
            resolution: target_size,
            fxaa_sub_pixel: settings.fxaa_sub_pixel,
            fxaa_edge_threshold: settings.fxaa_edge_threshold,
            fxaa_edge_threshold_min: settings.fxaa_edge_threshold_min,
            blur_direction: Vec2::ZERO,
            blur_sigma: 0.0,
            bloom_intensity: settings.bloom_intensity,
            sharpen_strength: settings.sharpen_strength,
            sharpen_clamp: settings.sharpen_clamp,
            taa_jitter_offset: self.jitter - self.jitter_previous,
            motion_blur_strength: settings.motion_blur_strength,
            fps_current: self.stats.fps,
            fps_target: settings.fps_target,
            gamma: settings.gamma,
            tonemapping: settings.tone_mapping.shader_value(),
            _padding: 0.0,
        }
    }

    // === Debug lines ===

    pub fn push_line(&mut self, from: Vec3, to: Vec3, color_from: Vec4, color_to: Vec4, depth: bool) {
        let list = if depth { &mut self.lines_depth } else { &mut self.lines_overlay };
        list.push(LineVertex { position: from, color: color_from });
        list.push(LineVertex { position: to, color: color_to });
    }

    /// Queues the 12 edges of `aabb`.
    pub fn push_box(&mut self, aabb: &BoundingBox, color: Vec4, depth: bool) {
        let corners = aabb.corners();
        // Corner index bits select max on x (4), y (2) and z (1); an edge
        // joins two corners that differ in exactly one bit.
        for axis in [4, 2, 1] {
            for (i, &from) in corners.iter().enumerate() {
                if i & axis == 0 {
                    self.push_line(from, corners[i | axis], color, color, depth);
                }
            }
        }
    }

    #[must_use]
    pub fn queued_line_vertices(&self) -> (usize, usize) {
        (self.lines_depth.len(), self.lines_overlay.len())
    }

    pub(crate) fn clear_lines(&mut self) {
        self.lines_depth.clear();
        self.lines_overlay.clear();
    }
}

// ─── Low-discrepancy jitter ──────────────────────────────────────────────────

/// Radical inverse of `index` in `base`.
#[must_use]
pub fn halton(mut index: u64, base: u64) -> f32 {
    let mut fraction = 1.0f64;
    let mut result = 0.0f64;
    while index > 0 {
        fraction /= base as f64;
        result += fraction * (index % base) as f64;
        index /= base;
    }
    result as f32
}

/// Halton(2, 3) point in `[0, 1)²`.
#[inline]
#[must_use]
pub fn halton_2d(index: u64) -> Vec2 {
    Vec2::new(halton(index, 2), halton(index, 3))
}
