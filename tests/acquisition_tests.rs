//! Scene Acquisition Tests
//!
//! Tests for:
//! - Bucket classification (opaque, transparent, light, camera, sky)
//! - Front-to-back ordering and material grouping
//! - Shadow map allocation during acquisition
//! - Settings persistence

use glam::{Vec2, Vec3, Vec4};

use myth_deferred::renderer::acquire::{acquire, sort_renderables};
use myth_deferred::renderer::{Bucket, FrameState, RenderFlags, RendererSettings, ToneMapping};
use myth_deferred::rhi::{RecordingDevice, RenderDevice, ShaderDescriptor, ShaderId, ShaderStage, TextureDescriptor};
use myth_deferred::scene::{
    BoundingBox, Camera, EntityId, Geometry, GeometryId, Light, Material, MaterialId, Renderable, Skybox, Transform,
    World,
};

const RESOLUTION: Vec2 = Vec2::new(800.0, 600.0);

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Scene {
    world: World,
    device: RecordingDevice,
    frame: FrameState,
    shader: ShaderId,
    geometry: GeometryId,
}

impl Scene {
    fn new() -> Self {
        init_logger();
        let mut device = RecordingDevice::new();
        let shader = device
            .create_shader(&ShaderDescriptor {
                label: "Standard".into(),
                source: "gbuffer",
                stage: ShaderStage::Pixel,
                defines: Default::default(),
            })
            .unwrap();
        let mut world = World::new();
        let geometry = world.add_geometry(Geometry { aabb: BoundingBox::unit(), ..Default::default() });
        Self { world, device, frame: FrameState::new(), shader, geometry }
    }

    fn material(&mut self, albedo: Vec4) -> MaterialId {
        self.world.add_material(Material::new(self.shader).with_albedo(albedo))
    }

    fn mesh(&mut self, position: Vec3, material: MaterialId) -> EntityId {
        let entity = self.world.spawn("Mesh", Transform::from_position(position));
        self.world.set_renderable(entity, Renderable::new(self.geometry, material));
        entity
    }

    fn camera_at(&mut self, position: Vec3) -> EntityId {
        let entity = self.world.spawn("Camera", Transform::looking_at(position, Vec3::new(0.0, 0.0, -100.0)));
        self.world.set_camera(entity, Camera::default());
        entity
    }

    fn acquire(&mut self) {
        let snapshot = self.world.snapshot(0.0);
        acquire(&mut self.world, &snapshot, &mut self.device, RESOLUTION, &mut self.frame);
    }
}

// ============================================================================
// Classification Tests
// ============================================================================

#[test]
fn alpha_below_one_is_transparent() {
    let mut scene = Scene::new();
    let solid = scene.material(Vec4::ONE);
    let glass = scene.material(Vec4::new(1.0, 1.0, 1.0, 0.5));
    let a = scene.mesh(Vec3::ZERO, solid);
    let b = scene.mesh(Vec3::X, glass);
    scene.acquire();

    assert_eq!(scene.frame.bucket(Bucket::Opaque), &[a]);
    assert_eq!(scene.frame.bucket(Bucket::Transparent), &[b]);
    assert!(scene.frame.has_renderables());
}

#[test]
fn skybox_is_not_a_renderable() {
    let mut scene = Scene::new();
    let texture = scene
        .device
        .create_texture(&TextureDescriptor::sampled("Sky", 64, 64, wgpu::TextureFormat::Rgba16Float))
        .unwrap();
    let material = scene.material(Vec4::ONE);
    let sky = scene.mesh(Vec3::ZERO, material);
    scene.world.set_skybox(sky, Skybox { texture });
    scene.acquire();

    assert!(scene.frame.bucket(Bucket::Opaque).is_empty());
    assert_eq!(scene.frame.skybox, Some(texture));
    assert!(!scene.frame.has_renderables());
}

#[test]
fn lights_and_cameras_get_their_own_buckets() {
    let mut scene = Scene::new();
    let camera = scene.camera_at(Vec3::ZERO);
    let sun = scene.world.spawn("Sun", Transform::looking_at(Vec3::Y, Vec3::ZERO));
    scene.world.set_light(sun, Light::new_directional());
    scene.acquire();

    assert_eq!(scene.frame.bucket(Bucket::Light), &[sun]);
    assert_eq!(scene.frame.bucket(Bucket::Camera), &[camera]);
    assert_eq!(scene.frame.camera_entity, Some(camera));
    assert!(scene.frame.camera.is_some());
}

#[test]
fn despawned_entities_are_skipped() {
    let mut scene = Scene::new();
    let material = scene.material(Vec4::ONE);
    let kept = scene.mesh(Vec3::ZERO, material);
    let gone = scene.mesh(Vec3::X, material);
    let snapshot = scene.world.snapshot(0.0);
    scene.world.despawn(gone);

    acquire(&mut scene.world, &snapshot, &mut scene.device, RESOLUTION, &mut scene.frame);

    assert_eq!(scene.frame.bucket(Bucket::Opaque), &[kept]);
}

#[test]
fn acquisition_replaces_previous_buckets() {
    let mut scene = Scene::new();
    let material = scene.material(Vec4::ONE);
    let mesh = scene.mesh(Vec3::ZERO, material);
    scene.camera_at(Vec3::new(0.0, 0.0, 5.0));
    scene.acquire();
    assert_eq!(scene.frame.bucket(Bucket::Opaque).len(), 1);

    scene.world.despawn(mesh);
    scene.acquire();
    assert!(scene.frame.bucket(Bucket::Opaque).is_empty());
    assert!(scene.frame.camera.is_some());
}

#[test]
fn no_camera_leaves_camera_empty() {
    let mut scene = Scene::new();
    let material = scene.material(Vec4::ONE);
    scene.mesh(Vec3::ZERO, material);
    scene.acquire();

    assert!(scene.frame.camera.is_none());
    assert!(scene.frame.camera_entity.is_none());
}

// ============================================================================
// Ordering Tests
// ============================================================================

#[test]
fn opaque_sorted_front_to_back() {
    let mut scene = Scene::new();
    let material = scene.material(Vec4::ONE);
    let far = scene.mesh(Vec3::new(0.0, 0.0, -20.0), material);
    let near = scene.mesh(Vec3::new(0.0, 0.0, -2.0), material);
    let mid = scene.mesh(Vec3::new(0.0, 0.0, -8.0), material);
    scene.camera_at(Vec3::ZERO);
    scene.acquire();

    assert_eq!(scene.frame.bucket(Bucket::Opaque), &[near, mid, far]);
}

#[test]
fn materials_grouped_with_depth_order_inside_each_group() {
    let mut scene = Scene::new();
    let red = scene.material(Vec4::new(1.0, 0.0, 0.0, 1.0));
    let blue = scene.material(Vec4::new(0.0, 0.0, 1.0, 1.0));
    let blue_near = scene.mesh(Vec3::new(0.0, 0.0, -1.0), blue);
    let red_far = scene.mesh(Vec3::new(0.0, 0.0, -9.0), red);
    let red_near = scene.mesh(Vec3::new(0.0, 0.0, -3.0), red);
    let blue_far = scene.mesh(Vec3::new(0.0, 0.0, -7.0), blue);
    scene.camera_at(Vec3::ZERO);
    scene.acquire();

    // Material keys order by creation; distance breaks ties
    assert_eq!(scene.frame.bucket(Bucket::Opaque), &[red_near, red_far, blue_near, blue_far]);
}

#[test]
fn moving_a_mesh_reorders_the_bucket() {
    let mut scene = Scene::new();
    let material = scene.material(Vec4::ONE);
    let a = scene.mesh(Vec3::new(0.0, 0.0, -2.0), material);
    let b = scene.mesh(Vec3::new(0.0, 0.0, -6.0), material);
    scene.camera_at(Vec3::ZERO);
    scene.acquire();
    assert_eq!(scene.frame.bucket(Bucket::Opaque), &[a, b]);

    scene.world.set_transform(a, Transform::from_position(Vec3::new(0.0, 0.0, -12.0)));
    scene.acquire();
    assert_eq!(scene.frame.bucket(Bucket::Opaque), &[b, a]);
}

#[test]
fn fading_a_material_moves_its_meshes_to_transparent() {
    let mut scene = Scene::new();
    let material = scene.material(Vec4::ONE);
    let mesh = scene.mesh(Vec3::ZERO, material);
    scene.acquire();
    assert_eq!(scene.frame.bucket(Bucket::Opaque), &[mesh]);

    scene.world.material_mut(material).unwrap().albedo.w = 0.25;
    scene.acquire();
    assert!(scene.frame.bucket(Bucket::Opaque).is_empty());
    assert_eq!(scene.frame.bucket(Bucket::Transparent), &[mesh]);
}

#[test]
fn sort_without_camera_only_groups() {
    let mut scene = Scene::new();
    let a = scene.material(Vec4::ONE);
    let b = scene.material(Vec4::ONE);
    let first_b = scene.mesh(Vec3::ZERO, b);
    let first_a = scene.mesh(Vec3::X, a);
    let second_b = scene.mesh(Vec3::Y, b);

    let mut entities = vec![first_b, first_a, second_b];
    sort_renderables(&scene.world, &mut entities, None);

    assert_eq!(entities, [first_a, first_b, second_b]);
}

// ============================================================================
// Light Preparation Tests
// ============================================================================

#[test]
fn shadow_maps_allocated_for_casting_lights() {
    let mut scene = Scene::new();
    scene.camera_at(Vec3::new(0.0, 2.0, 5.0));
    let sun = scene.world.spawn("Sun", Transform::looking_at(Vec3::Y, Vec3::ZERO));
    scene.world.set_light(sun, Light::new_directional());
    let lamp = scene.world.spawn("Lamp", Transform::from_position(Vec3::Y));
    scene.world.set_light(lamp, Light::new_point(5.0));
    let fill = scene.world.spawn("Fill", Transform::from_position(Vec3::Y));
    scene.world.set_light(fill, Light::new_spot(5.0, 0.4).with_cast_shadows(false));
    scene.acquire();

    let array_size = |entity| scene.world.light(entity).and_then(|l| l.shadow_map()).map(|m| m.array_size);
    assert_eq!(array_size(sun), Some(3));
    assert_eq!(array_size(lamp), Some(6));
    assert_eq!(array_size(fill), None);

    for light in [sun, lamp, fill] {
        assert!(!scene.world.light(light).unwrap().is_dirty());
    }
}

#[test]
fn shadow_allocation_failure_is_not_fatal() {
    let mut scene = Scene::new();
    scene.device.set_texture_budget(Some(0));
    let lamp = scene.world.spawn("Lamp", Transform::from_position(Vec3::Y));
    scene.world.set_light(lamp, Light::new_spot(5.0, 0.4));
    scene.acquire();

    assert_eq!(scene.frame.bucket(Bucket::Light), &[lamp]);
    assert!(scene.world.light(lamp).unwrap().shadow_map().is_none());
}

// ============================================================================
// Settings Tests
// ============================================================================

#[test]
fn settings_roundtrip_through_json() {
    let mut settings = RendererSettings::default();
    settings.set_enabled(RenderFlags::FXAA, true);
    settings.set_enabled(RenderFlags::TAA, false);
    settings.tone_mapping = ToneMapping::Uncharted2;
    settings.gamma = 2.4;

    let json = serde_json::to_string(&settings).unwrap();
    let restored: RendererSettings = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, settings);
    assert!(restored.is_enabled(RenderFlags::FXAA));
    assert!(!restored.is_enabled(RenderFlags::TAA));
}

#[test]
fn settings_fill_missing_fields_with_defaults() {
    let restored: RendererSettings = serde_json::from_str(r#"{ "gamma": 1.8 }"#).unwrap();
    assert_eq!(restored.gamma, 1.8);
    assert_eq!(restored.flags, RenderFlags::default());
    assert_eq!(restored.tone_mapping, ToneMapping::Aces);
}
