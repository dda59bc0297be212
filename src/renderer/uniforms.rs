//! GPU data layouts uploaded by the passes, besides the global block in
//! [`FrameUniforms`](super::frame::FrameUniforms).
//!
//! Every struct is `#[repr(C)]` and padded by hand to 16-byte rows so the
//! byte image matches the shader-side declaration.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::scene::light::MAX_SHADOW_SLICES;
use crate::scene::{Light, LightKind};

/// Upper bound on lights evaluated by the lighting pass.
pub const MAX_LIGHTS: usize = 100;

/// Per-object block for the G-buffer, shadow-depth and transparent passes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: Mat4,
    pub view_projection: Mat4,
    pub view_projection_previous: Mat4,
    pub albedo: Vec4,
    pub camera_position: Vec3,
    pub roughness: f32,
    pub light_direction: Vec3,
    pub _padding: f32,
}

/// Light-space data for one shadow-mapping draw.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ShadowUniforms {
    pub view_projection: [Mat4; MAX_SHADOW_SLICES],
    pub position: Vec3,
    pub bias: f32,
    pub direction: Vec3,
    pub normal_bias: f32,
    pub range: f32,
    pub slice_count: f32,
    pub map_size: f32,
    pub _padding: f32,
}

impl ShadowUniforms {
    #[must_use]
    pub fn from_light(light: &Light) -> Self {
        let mut view_projection = [Mat4::IDENTITY; MAX_SHADOW_SLICES];
        for (i, vp) in view_projection.iter_mut().enumerate() {
            *vp = light.view_projection(i);
        }
        Self {
            view_projection,
            position: light.position(),
            bias: light.shadow.bias,
            direction: light.direction(),
            normal_bias: light.shadow.normal_bias,
            range: light.range,
            slice_count: light.shadow_array_size() as f32,
            map_size: light.shadow.map_size as f32,
            _padding: 0.0,
        }
    }
}

/// One entry of the lighting pass light array.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightRecord {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    pub range: f32,
    pub direction: Vec3,
    pub angle: f32,
    pub kind: u32,
    pub cast_shadows: u32,
    pub _padding: [u32; 2],
}

impl LightRecord {
    #[must_use]
    pub fn from_light(light: &Light) -> Self {
        Self {
            color: light.color,
            intensity: light.intensity,
            position: light.position(),
            range: light.range,
            direction: light.direction(),
            angle: light.angle,
            kind: match light.kind {
                LightKind::Directional => 0,
                LightKind::Point => 1,
                LightKind::Spot => 2,
            },
            cast_shadows: u32::from(light.cast_shadows),
            _padding: [0; 2],
        }
    }
}

/// Light array header followed by up to [`MAX_LIGHTS`] records.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LightsUniforms {
    pub count: u32,
    pub _padding: [u32; 3],
    pub lights: [LightRecord; MAX_LIGHTS],
}

impl LightsUniforms {
    /// Packs `records`, dropping anything past [`MAX_LIGHTS`].
    #[must_use]
    pub fn pack(records: impl IntoIterator<Item = LightRecord>) -> Self {
        let mut packed = Self::zeroed();
        for (slot, record) in packed.lights.iter_mut().zip(records) {
            *slot = record;
            packed.count += 1;
        }
        packed
    }
}

/// Transform and tint of one gizmo handle.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GizmoUniforms {
    pub transform: Mat4,
    pub color: Vec4,
}

/// Vertex of the screen quad and the light icons.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: Vec3,
    pub uv: Vec2,
}

/// Vertex of a text glyph.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FontVertex {
    pub position: Vec2,
    pub uv: Vec2,
}

/// Text overlay block.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TextUniforms {
    pub transform: Mat4,
    pub color: Vec4,
}

/// Unit quad centred on the origin.
pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { position: Vec3::new(-0.5, 0.5, 0.0), uv: Vec2::new(0.0, 0.0) },
    QuadVertex { position: Vec3::new(0.5, 0.5, 0.0), uv: Vec2::new(1.0, 0.0) },
    QuadVertex { position: Vec3::new(-0.5, -0.5, 0.0), uv: Vec2::new(0.0, 1.0) },
    QuadVertex { position: Vec3::new(0.5, -0.5, 0.0), uv: Vec2::new(1.0, 1.0) },
];
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 1, 3];
