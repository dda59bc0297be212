use glam::{Mat4, Vec3};
use log::debug;

use super::camera::RenderCamera;
use super::shadow_utils::{self, CUBE_FACES, MAX_CASCADES};
use super::Transform;
use crate::errors::Result;
use crate::rhi::{RenderDevice, TextureDescriptor, TextureId};

/// Slots in the per-light matrix arrays (cube faces or cascades).
pub const MAX_SHADOW_SLICES: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadowConfig {
    pub bias: f32,
    pub normal_bias: f32,
    pub map_size: u32,
    /// Directional lights only, clamped to `1..=MAX_CASCADES`.
    pub cascade_count: u32,
    pub cascade_split_lambda: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            bias: 0.0008,
            normal_bias: 120.0,
            map_size: 2048,
            cascade_count: 3,
            cascade_split_lambda: 0.5,
        }
    }
}

/// Depth texture array owned by a shadow-casting light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowMap {
    pub texture: TextureId,
    pub array_size: u32,
    pub resolution: u32,
}

/// Light component.
///
/// Light-space matrices are cached and recomputed only when the light is
/// dirty: its transform changed, or (for directional cascades, which follow
/// the view frustum) the camera moved.
#[derive(Debug, Clone)]
pub struct Light {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    /// Spot cone half-angle in radians.
    pub angle: f32,
    pub cast_shadows: bool,
    pub shadow: ShadowConfig,

    shadow_map: Option<ShadowMap>,
    views: [Mat4; MAX_SHADOW_SLICES],
    projections: [Mat4; MAX_SHADOW_SLICES],
    position: Vec3,
    direction: Vec3,

    dirty: bool,
    last_world: Option<Mat4>,
    last_camera: Option<(Vec3, Vec3)>,
}

impl Light {
    #[must_use]
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            color: Vec3::ONE,
            intensity: 2.0,
            range: 10.0,
            angle: 0.5,
            cast_shadows: true,
            shadow: ShadowConfig::default(),
            shadow_map: None,
            views: [Mat4::IDENTITY; MAX_SHADOW_SLICES],
            projections: [Mat4::IDENTITY; MAX_SHADOW_SLICES],
            position: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            dirty: true,
            last_world: None,
            last_camera: None,
        }
    }

    #[must_use]
    pub fn new_directional() -> Self {
        Self::new(LightKind::Directional)
    }

    #[must_use]
    pub fn new_point(range: f32) -> Self {
        Self { range, ..Self::new(LightKind::Point) }
    }

    #[must_use]
    pub fn new_spot(range: f32, angle: f32) -> Self {
        Self { range, angle, ..Self::new(LightKind::Spot) }
    }

    #[must_use]
    pub fn with_cast_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }

    #[must_use]
    pub fn with_cascades(mut self, cascade_count: u32) -> Self {
        self.shadow.cascade_count = cascade_count;
        self.dirty = true;
        self
    }

    // === Queries ===

    /// Array slices a shadow map for this light needs.
    #[must_use]
    pub fn shadow_array_size(&self) -> u32 {
        match self.kind {
            LightKind::Directional => self.shadow.cascade_count.clamp(1, MAX_CASCADES),
            LightKind::Point => CUBE_FACES,
            LightKind::Spot => 1,
        }
    }

    #[inline]
    #[must_use]
    pub fn shadow_map(&self) -> Option<&ShadowMap> {
        self.shadow_map.as_ref()
    }

    /// World-space direction the light points in, as of the last update.
    #[inline]
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn view_matrix(&self, slice: usize) -> Mat4 {
        self.views.get(slice).copied().unwrap_or(Mat4::IDENTITY)
    }

    #[must_use]
    pub fn projection_matrix(&self, slice: usize) -> Mat4 {
        self.projections.get(slice).copied().unwrap_or(Mat4::IDENTITY)
    }

    /// Light-space view-projection for one array slice.
    #[must_use]
    pub fn view_projection(&self, slice: usize) -> Mat4 {
        self.projection_matrix(slice) * self.view_matrix(slice)
    }

    // === Maintenance ===

    /// Creates, resizes or releases the shadow map to match the current
    /// configuration. A light that stops casting shadows gives its map back.
    pub fn sync_shadow_map(&mut self, device: &mut dyn RenderDevice) -> Result<()> {
        if !self.cast_shadows {
            if let Some(map) = self.shadow_map.take() {
                device.destroy_texture(map.texture);
            }
            return Ok(());
        }

        let array_size = self.shadow_array_size();
        let resolution = self.shadow.map_size;
        if let Some(map) = &self.shadow_map
            && map.array_size == array_size
            && map.resolution == resolution
        {
            return Ok(());
        }

        let desc = TextureDescriptor::render_target(
            "Shadow Map",
            resolution,
            resolution,
            wgpu::TextureFormat::Depth32Float,
        )
        .with_array_layers(array_size);
        let texture = device.create_texture(&desc)?;

        if let Some(old) = self.shadow_map.replace(ShadowMap { texture, array_size, resolution }) {
            device.destroy_texture(old.texture);
        }
        debug!("Shadow map allocated: {array_size} slice(s) at {resolution}px");
        self.dirty = true;
        Ok(())
    }

    /// Refreshes the cached matrices if the light or the camera moved.
    pub fn update(&mut self, transform: &Transform, camera: Option<&RenderCamera>) {
        let world = transform.world_matrix();
        if self.last_world != Some(world) {
            self.last_world = Some(world);
            self.position = transform.position;
            self.direction = transform.forward();
            self.dirty = true;
        }

        if self.kind == LightKind::Directional
            && let Some(camera) = camera
        {
            let key = (camera.position, camera.forward);
            if self.last_camera != Some(key) {
                self.last_camera = Some(key);
                self.dirty = true;
            }
        }

        if !self.dirty {
            return;
        }

        match self.kind {
            LightKind::Directional => {
                // Cascades follow the view frustum; without a camera keep the old ones
                let Some(camera) = camera else { return };
                let cascades = shadow_utils::build_directional_cascades(
                    self.direction,
                    camera,
                    self.shadow.cascade_count,
                    self.shadow.cascade_split_lambda,
                    self.shadow.map_size,
                );
                for (i, (view, projection)) in cascades.into_iter().enumerate() {
                    self.views[i] = view;
                    self.projections[i] = projection;
                }
            }
            LightKind::Point => {
                let faces = shadow_utils::build_point_faces(self.position, self.range);
                for (i, (view, projection)) in faces.into_iter().enumerate() {
                    self.views[i] = view;
                    self.projections[i] = projection;
                }
            }
            LightKind::Spot => {
                let (view, projection) =
                    shadow_utils::build_spot(self.position, self.direction, self.angle, self.range);
                self.views[0] = view;
                self.projections[0] = projection;
            }
        }

        self.dirty = false;
    }
}
