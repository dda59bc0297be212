//! Scene Data
//!
//! The entity store the frame pipeline reads from. It is a tagged-component
//! store: an entity is a key, and each capability (renderable, light,
//! camera, skybox) lives in its own secondary map. Scene acquisition probes
//! those maps once per entity and never needs virtual dispatch.
//!
//! Materials and geometry are shared assets addressed by their own keys, so
//! two entities using the same material compare equal by [`MaterialId`].
//!
//! A [`SceneSnapshot`] is the per-frame event handed to the renderer: a
//! timestamp plus the entity keys to consider. Keys are non-owning; the
//! renderer re-resolves them against the [`World`] every frame.

pub mod bounds;
pub mod camera;
pub mod light;
pub mod shadow_utils;

use std::borrow::Cow;

use glam::{Mat4, Quat, Vec3, Vec4};
use slotmap::{SecondaryMap, SlotMap, new_key_type};

use crate::rhi::{BufferId, ShaderId, TextureId};

pub use bounds::BoundingBox;
pub use camera::{Camera, Frustum, Ray, RenderCamera};
pub use light::{Light, LightKind, ShadowConfig, ShadowMap};

new_key_type! {
    pub struct EntityId;
    pub struct MaterialId;
    pub struct GeometryId;
}

// ─── Components ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self { position: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Transform {
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }

    /// Places the transform at `position`, facing `target` (-Z forward).
    #[must_use]
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let forward = (target - position).normalize_or(Vec3::NEG_Z);
        let up = if forward.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
        let view = Mat4::look_to_rh(position, forward, up);
        let (_, rotation, _) = view.inverse().to_scale_rotation_translation();
        Self { position, rotation, scale: Vec3::ONE }
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    #[inline]
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

/// GPU-side geometry buffers plus the local-space bounds.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    pub vertex_buffer: Option<BufferId>,
    pub index_buffer: Option<BufferId>,
    pub index_count: u32,
    pub index_offset: u32,
    pub vertex_offset: i32,
    pub aabb: BoundingBox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    Back,
    Front,
    None,
}

/// Texture slots bound by the G-buffer pass, in binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Albedo,
    Roughness,
    Metallic,
    Normal,
    Height,
    Occlusion,
    Emission,
    Mask,
}

impl TextureSlot {
    pub const COUNT: usize = 8;
}

#[derive(Debug, Clone)]
pub struct Material {
    pub name: Cow<'static, str>,
    pub albedo: Vec4,
    pub roughness: f32,
    pub cull_mode: CullMode,
    pub shader: Option<ShaderId>,
    pub textures: [Option<TextureId>; TextureSlot::COUNT],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("Material"),
            albedo: Vec4::ONE,
            roughness: 1.0,
            cull_mode: CullMode::Back,
            shader: None,
            textures: [None; TextureSlot::COUNT],
        }
    }
}

impl Material {
    #[must_use]
    pub fn new(shader: ShaderId) -> Self {
        Self { shader: Some(shader), ..Default::default() }
    }

    #[must_use]
    pub fn with_albedo(mut self, albedo: Vec4) -> Self {
        self.albedo = albedo;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.albedo.w < 1.0
    }

    pub fn set_texture(&mut self, slot: TextureSlot, texture: Option<TextureId>) {
        self.textures[slot as usize] = texture;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Renderable {
    pub geometry: Option<GeometryId>,
    pub material: Option<MaterialId>,
    pub cast_shadows: bool,
}

impl Renderable {
    #[must_use]
    pub fn new(geometry: GeometryId, material: MaterialId) -> Self {
        Self { geometry: Some(geometry), material: Some(material), cast_shadows: true }
    }

    #[must_use]
    pub fn with_cast_shadows(mut self, cast_shadows: bool) -> Self {
        self.cast_shadows = cast_shadows;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Skybox {
    pub texture: TextureId,
}

/// Capability kinds probed during scene acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Renderable,
    Light,
    Skybox,
    Camera,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// The per-frame scene event: which entities exist right now.
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub timestamp: f64,
    pub entities: Vec<EntityId>,
}

// ─── World ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct EntityInfo {
    name: Cow<'static, str>,
}

/// Tagged-component entity store.
#[derive(Debug, Default)]
pub struct World {
    entities: SlotMap<EntityId, EntityInfo>,
    transforms: SecondaryMap<EntityId, Transform>,
    renderables: SecondaryMap<EntityId, Renderable>,
    lights: SecondaryMap<EntityId, Light>,
    cameras: SecondaryMap<EntityId, Camera>,
    skyboxes: SecondaryMap<EntityId, Skybox>,

    materials: SlotMap<MaterialId, Material>,
    geometries: SlotMap<GeometryId, Geometry>,
}

impl World {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Entities ===

    pub fn spawn(&mut self, name: impl Into<Cow<'static, str>>, transform: Transform) -> EntityId {
        let id = self.entities.insert(EntityInfo { name: name.into() });
        self.transforms.insert(id, transform);
        id
    }

    pub fn despawn(&mut self, id: EntityId) {
        self.entities.remove(id);
        self.transforms.remove(id);
        self.renderables.remove(id);
        self.lights.remove(id);
        self.cameras.remove(id);
        self.skyboxes.remove(id);
    }

    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(id)
    }

    #[must_use]
    pub fn name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(id).map(|info| info.name.as_ref())
    }

    /// Snapshot of every live entity.
    #[must_use]
    pub fn snapshot(&self, timestamp: f64) -> SceneSnapshot {
        SceneSnapshot { timestamp, entities: self.entities.keys().collect() }
    }

    #[must_use]
    pub fn has(&self, id: EntityId, capability: Capability) -> bool {
        match capability {
            Capability::Renderable => self.renderables.contains_key(id),
            Capability::Light => self.lights.contains_key(id),
            Capability::Skybox => self.skyboxes.contains_key(id),
            Capability::Camera => self.cameras.contains_key(id),
        }
    }

    // === Components ===

    pub fn set_transform(&mut self, id: EntityId, transform: Transform) {
        if self.contains(id) {
            self.transforms.insert(id, transform);
        }
    }

    pub fn set_renderable(&mut self, id: EntityId, renderable: Renderable) {
        if self.contains(id) {
            self.renderables.insert(id, renderable);
        }
    }

    pub fn set_light(&mut self, id: EntityId, light: Light) {
        if self.contains(id) {
            self.lights.insert(id, light);
        }
    }

    pub fn set_camera(&mut self, id: EntityId, camera: Camera) {
        if self.contains(id) {
            self.cameras.insert(id, camera);
        }
    }

    pub fn set_skybox(&mut self, id: EntityId, skybox: Skybox) {
        if self.contains(id) {
            self.skyboxes.insert(id, skybox);
        }
    }

    #[must_use]
    pub fn transform(&self, id: EntityId) -> Option<&Transform> {
        self.transforms.get(id)
    }

    #[must_use]
    pub fn renderable(&self, id: EntityId) -> Option<&Renderable> {
        self.renderables.get(id)
    }

    #[must_use]
    pub fn light(&self, id: EntityId) -> Option<&Light> {
        self.lights.get(id)
    }

    pub fn light_mut(&mut self, id: EntityId) -> Option<&mut Light> {
        self.lights.get_mut(id)
    }

    #[must_use]
    pub fn camera(&self, id: EntityId) -> Option<&Camera> {
        self.cameras.get(id)
    }

    pub fn camera_mut(&mut self, id: EntityId) -> Option<&mut Camera> {
        self.cameras.get_mut(id)
    }

    #[must_use]
    pub fn skybox(&self, id: EntityId) -> Option<&Skybox> {
        self.skyboxes.get(id)
    }

    // === Assets ===

    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.insert(geometry)
    }

    #[must_use]
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    #[must_use]
    pub fn geometry(&self, id: GeometryId) -> Option<&Geometry> {
        self.geometries.get(id)
    }

    // === Derived ===

    /// Material of an entity's renderable, if both exist.
    #[must_use]
    pub fn material_of(&self, id: EntityId) -> Option<&Material> {
        self.renderable(id)?.material.and_then(|m| self.material(m))
    }

    #[must_use]
    pub fn geometry_of(&self, id: EntityId) -> Option<&Geometry> {
        self.renderable(id)?.geometry.and_then(|g| self.geometry(g))
    }

    /// World-space bounds of an entity's geometry.
    #[must_use]
    pub fn world_aabb(&self, id: EntityId) -> Option<BoundingBox> {
        let geometry = self.geometry_of(id)?;
        let transform = self.transform(id)?;
        Some(geometry.aabb.transform(&transform.world_matrix()))
    }
}
