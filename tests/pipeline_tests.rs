//! Frame Pipeline Tests
//!
//! Tests for:
//! - Frame orchestration (not initialized, no camera, nothing to draw)
//! - Pass ordering and scope grouping
//! - Post-process chain ping-pong roles and the unconditional gamma stage
//! - TAA history hand-over and jitter
//! - SSAO blur placement and lighting inputs
//! - Degraded passes (uncompiled shaders)
//! - Resolution changes
//! - Debug lines and the rendering probe

use glam::{Vec3, Vec4};

use myth_deferred::renderer::{DebugBuffer, RenderFlags, Renderer, RendererSettings, ShaderKind, ToneMapping};
use myth_deferred::rhi::recording::{draw_count, scopes, top_level_scopes};
use myth_deferred::rhi::{
    BufferDescriptor, Command, RecordingDevice, RenderDevice, ShaderDescriptor, ShaderStage, ShaderState,
    StateDescriptor, StateId, TextureId,
};
use myth_deferred::scene::{
    BoundingBox, Camera, CullMode, EntityId, Geometry, Light, Material, Ray, Renderable, Transform, World,
};
use myth_deferred::DeferredError;

const EPSILON: f32 = 1e-6;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    renderer: Renderer<RecordingDevice>,
    world: World,
    cube: EntityId,
    camera: EntityId,
    sun: EntityId,
    material: myth_deferred::scene::MaterialId,
    geometry: myth_deferred::scene::GeometryId,
}

impl Fixture {
    /// Camera looking at a unit cube at the origin, lit by one sun.
    fn new(settings: RendererSettings) -> Self {
        let mut renderer = Renderer::new(RecordingDevice::new(), settings, 640, 480).unwrap();
        let mut world = World::new();

        let device = renderer.device_mut();
        let shader = device
            .create_shader(&ShaderDescriptor {
                label: "Standard".into(),
                source: "gbuffer",
                stage: ShaderStage::Pixel,
                defines: Default::default(),
            })
            .unwrap();
        let vertex_buffer = device.create_buffer(&BufferDescriptor::vertex::<[f32; 8]>("Cube", 24)).unwrap();
        let index_buffer = device.create_buffer(&BufferDescriptor::index("Cube", 36)).unwrap();

        let geometry = world.add_geometry(Geometry {
            vertex_buffer: Some(vertex_buffer),
            index_buffer: Some(index_buffer),
            index_count: 36,
            aabb: BoundingBox::unit(),
            ..Default::default()
        });
        let material = world.add_material(Material::new(shader));

        let cube = world.spawn("Cube", Transform::default());
        world.set_renderable(cube, Renderable::new(geometry, material));

        let camera = world.spawn("Camera", Transform::looking_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO));
        world.set_camera(camera, Camera::default());

        let sun = world.spawn("Sun", Transform::looking_at(Vec3::new(3.0, 5.0, 3.0), Vec3::ZERO));
        world.set_light(sun, Light::new_directional());

        Self { renderer, world, cube, camera, sun, material, geometry }
    }

    fn spawn_cube(&mut self, position: Vec3, albedo: Vec4) -> EntityId {
        let shader = self.world.material(self.material).and_then(|m| m.shader).unwrap();
        let material = self.world.add_material(Material::new(shader).with_albedo(albedo));
        let cube = self.world.spawn("Cube", Transform::from_position(position));
        self.world.set_renderable(cube, Renderable::new(self.geometry, material));
        cube
    }

    /// Acquires the whole world, renders, and drains the recorded stream.
    fn frame(&mut self) -> Vec<Command> {
        let snapshot = self.world.snapshot(0.0);
        self.renderer.acquire(&mut self.world, &snapshot);
        self.renderer.render(&self.world);
        self.renderer.device_mut().take_commands()
    }
}

fn settings_with(flags: RenderFlags) -> RendererSettings {
    RendererSettings { flags, ..Default::default() }
}

/// The color target of the last `SetRenderTargets` in `commands`.
fn last_render_target(commands: &[Command]) -> Option<TextureId> {
    commands.iter().rev().find_map(|c| match c {
        Command::SetRenderTargets { colors, .. } => colors.first().copied(),
        _ => None,
    })
}

/// Textures bound to slot 0 onwards by the last `SetTextures` in `commands`.
fn last_textures(commands: &[Command]) -> Vec<Option<TextureId>> {
    commands
        .iter()
        .rev()
        .find_map(|c| match c {
            Command::SetTextures { slot: 0, textures } => Some(textures.to_vec()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Depth-stencil and rasterizer state in effect at each draw inside the
/// first `pass` scope. State set by earlier passes carries over.
fn states_at_draws(commands: &[Command], pass: &str) -> Vec<(Option<StateId>, Option<StateId>)> {
    let (mut depth, mut rasterizer) = (None, None);
    let mut inside = 0u32;
    let mut states = Vec::new();
    for command in commands {
        match command {
            Command::SetDepthStencilState(id) => depth = Some(*id),
            Command::SetRasterizerState(id) => rasterizer = Some(*id),
            Command::BeginPass(name) if inside > 0 || name == pass => inside += 1,
            Command::EndPass if inside > 0 => {
                inside -= 1;
                if inside == 0 {
                    break;
                }
            }
            Command::Draw { .. } | Command::DrawIndexed { .. } if inside > 0 => states.push((depth, rasterizer)),
            _ => {}
        }
    }
    states
}

fn scope<'a>(commands: &'a [Command], name: &str) -> &'a [Command] {
    scopes(commands, name).into_iter().next().unwrap_or_else(|| panic!("no {name} scope"))
}

// ============================================================================
// Orchestration
// ============================================================================

#[test]
fn uninitialized_device_records_nothing() {
    let mut f = Fixture::new(RendererSettings::default());
    f.renderer.device_mut().set_initialized(false);

    let snapshot = f.world.snapshot(0.0);
    f.renderer.acquire(&mut f.world, &snapshot);
    f.renderer.render(&f.world);

    let device = f.renderer.device();
    assert!(device.submissions().is_empty());
    assert!(device.backbuffer_clears().is_empty());
    assert_eq!(device.present_count(), 0);
}

#[test]
fn no_camera_clears_backbuffer_to_black() {
    let mut f = Fixture::new(RendererSettings::default());
    f.world.despawn(f.camera);

    let snapshot = f.world.snapshot(0.0);
    f.renderer.acquire(&mut f.world, &snapshot);
    f.renderer.render(&f.world);

    let device = f.renderer.device();
    assert_eq!(device.backbuffer_clears(), &[Vec4::new(0.0, 0.0, 0.0, 1.0)]);
    assert!(device.submissions().is_empty());
    assert_eq!(f.renderer.frame().frame_number, 0);
}

#[test]
fn empty_scene_clears_to_camera_color_and_presents() {
    let mut renderer = Renderer::new(RecordingDevice::new(), RendererSettings::default(), 640, 480).unwrap();
    let mut world = World::new();
    let clear = Vec4::new(0.2, 0.3, 0.4, 1.0);
    let camera = world.spawn("Camera", Transform::default());
    world.set_camera(camera, Camera::default().with_clear_color(clear));

    let snapshot = world.snapshot(0.0);
    renderer.acquire(&mut world, &snapshot);
    renderer.render(&world);

    let device = renderer.device();
    assert_eq!(device.backbuffer_clears(), &[clear]);
    assert_eq!(device.present_count(), 1);
    assert!(device.submissions().is_empty());
}

#[test]
fn frame_submits_once_and_presents() {
    let mut f = Fixture::new(RendererSettings::default());
    f.frame();

    assert_eq!(f.renderer.frame().frame_number, 1);
    assert_eq!(f.renderer.device().present_count(), 1);
    assert!(!f.renderer.is_rendering());
}

// ============================================================================
// Pass Ordering
// ============================================================================

#[test]
fn default_frame_pass_order() {
    let mut f = Fixture::new(RendererSettings::default());
    let commands = f.frame();

    assert_eq!(
        top_level_scopes(&commands),
        [
            "Pass_LightDepth",
            "Pass_GBuffer",
            "Pass_PreLight",
            "Pass_Light",
            "Pass_PostLight",
            "Pass_Lines",
            "Pass_Gizmos",
        ]
    );
}

#[test]
fn every_pass_runs_in_fixed_order() {
    let mut settings = RendererSettings::default();
    settings.set_enabled(RenderFlags::GIZMO_PERFORMANCE_METRICS, true);
    settings.debug_buffer = DebugBuffer::Albedo;
    let mut f = Fixture::new(settings);
    f.spawn_cube(Vec3::new(1.0, 0.0, 0.0), Vec4::new(1.0, 1.0, 1.0, 0.5));

    let commands = f.frame();

    assert_eq!(
        top_level_scopes(&commands),
        [
            "Pass_LightDepth",
            "Pass_GBuffer",
            "Pass_PreLight",
            "Pass_Light",
            "Pass_Transparent",
            "Pass_PostLight",
            "Pass_Lines",
            "Pass_Gizmos",
            "Pass_DebugBuffer",
            "Pass_PerformanceMetrics",
        ]
    );
}

#[test]
fn shadow_depth_renders_every_cascade() {
    let mut f = Fixture::new(RendererSettings::default());
    let commands = f.frame();

    let light_depth = scope(&commands, "Pass_LightDepth");
    let slices = top_level_scopes(light_depth);
    assert_eq!(slices, ["Array_1", "Array_2", "Array_3"]);
    // One caster per cascade
    assert_eq!(draw_count(light_depth), 3);
}

#[test]
fn gbuffer_draws_each_opaque_mesh_once() {
    let mut f = Fixture::new(RendererSettings::default());
    f.spawn_cube(Vec3::new(-1.0, 0.0, 0.0), Vec4::ONE);
    let commands = f.frame();

    assert_eq!(draw_count(scope(&commands, "Pass_GBuffer")), 2);
    assert_eq!(f.renderer.frame().stats.meshes_rendered, 2);
}

#[test]
fn transparent_only_scene_clears_gbuffer_without_drawing() {
    let mut f = Fixture::new(RendererSettings::default());
    f.world.despawn(f.cube);
    f.spawn_cube(Vec3::ZERO, Vec4::new(1.0, 0.0, 0.0, 0.25));

    let commands = f.frame();

    let gbuffer = scope(&commands, "Pass_GBuffer");
    assert_eq!(draw_count(gbuffer), 0);
    assert!(gbuffer.iter().any(|c| matches!(c, Command::ClearDepth { depth, .. } if *depth == 0.0)));
    assert_eq!(draw_count(scope(&commands, "Pass_Transparent")), 1);
}

#[test]
fn non_casting_meshes_stay_out_of_every_cascade() {
    let mut f = Fixture::new(RendererSettings::default());
    f.world.set_light(f.sun, Light::new_directional().with_cascades(2));
    for x in [-1.5, 1.5] {
        let mesh = f.spawn_cube(Vec3::new(x, 0.0, 0.0), Vec4::ONE);
        f.world.set_renderable(mesh, Renderable::new(f.geometry, f.material).with_cast_shadows(false));
    }

    let commands = f.frame();

    let light_depth = scope(&commands, "Pass_LightDepth");
    assert_eq!(top_level_scopes(light_depth), ["Array_1", "Array_2"]);
    for slice in ["Array_1", "Array_2"] {
        assert_eq!(draw_count(scope(light_depth, slice)), 1, "{slice}");
    }
    assert_eq!(draw_count(scope(&commands, "Pass_GBuffer")), 3);
}

#[test]
fn meshes_outside_the_frustum_are_culled() {
    let mut f = Fixture::new(RendererSettings::default());
    // Camera sits at (0, 2, 5) facing the origin
    f.spawn_cube(Vec3::new(0.0, 2.0, 20.0), Vec4::ONE);
    f.spawn_cube(Vec3::new(0.0, 2.0, 20.0), Vec4::new(1.0, 1.0, 1.0, 0.5));
    f.spawn_cube(Vec3::new(1.0, 0.0, 0.0), Vec4::new(1.0, 1.0, 1.0, 0.5));

    let commands = f.frame();

    assert_eq!(draw_count(scope(&commands, "Pass_GBuffer")), 1);
    assert_eq!(draw_count(scope(&commands, "Pass_Transparent")), 1);
}

#[test]
fn gbuffer_switches_cull_mode_with_the_material() {
    let mut f = Fixture::new(RendererSettings::default());
    let shader = f.world.material(f.material).and_then(|m| m.shader).unwrap();
    let front = f.world.add_material(Material { cull_mode: CullMode::Front, ..Material::new(shader) });
    let mesh = f.world.spawn("Inside Out", Transform::from_position(Vec3::new(-1.0, 0.0, 0.0)));
    f.world.set_renderable(mesh, Renderable::new(f.geometry, front));

    let commands = f.frame();

    let device = f.renderer.device();
    let mut culls: Vec<_> = states_at_draws(&commands, "Pass_GBuffer")
        .into_iter()
        .map(|(_, rasterizer)| match rasterizer.and_then(|id| device.state(id)) {
            Some(StateDescriptor::Rasterizer { cull_mode, .. }) => *cull_mode,
            other => panic!("no rasterizer state bound: {other:?}"),
        })
        .collect();
    culls.sort_by_key(|face| face.map(|face| face as u8));
    assert_eq!(culls, [Some(wgpu::Face::Front), Some(wgpu::Face::Back)]);
}

#[test]
fn transparent_draws_test_depth_without_writing() {
    let mut f = Fixture::new(RendererSettings::default());
    f.spawn_cube(Vec3::new(1.0, 0.0, 0.0), Vec4::new(1.0, 1.0, 1.0, 0.5));

    let commands = f.frame();

    let device = f.renderer.device();
    let depth_writes = |pass: &str| -> Vec<bool> {
        states_at_draws(&commands, pass)
            .into_iter()
            .map(|(depth, _)| match depth.and_then(|id| device.state(id)) {
                Some(StateDescriptor::DepthStencil { depth_test_enabled, depth_write_enabled, depth_compare }) => {
                    assert!(*depth_test_enabled);
                    assert_eq!(*depth_compare, wgpu::CompareFunction::GreaterEqual);
                    *depth_write_enabled
                }
                other => panic!("no depth state bound: {other:?}"),
            })
            .collect()
    };

    assert_eq!(depth_writes("Pass_Transparent"), [false]);
    // Opaque geometry still writes depth
    assert_eq!(depth_writes("Pass_GBuffer"), [true]);
}

// ============================================================================
// Post-Processing Chain
// ============================================================================

#[test]
fn gamma_is_the_only_unconditional_stage() {
    let mut settings = settings_with(RenderFlags::empty());
    settings.tone_mapping = ToneMapping::Off;
    let mut f = Fixture::new(settings);
    let commands = f.frame();

    let post = scope(&commands, "Pass_PostLight");
    assert_eq!(top_level_scopes(post), ["Pass_GammaCorrection"]);
    assert_eq!(draw_count(post), 1);

    // Lighting output feeds gamma directly; the frame ends in `alternate`
    let targets = f.renderer.targets();
    let light = scope(&commands, "Pass_Light");
    let gamma = scope(post, "Pass_GammaCorrection");
    assert_eq!(last_render_target(light), Some(targets.hdr.current().id));
    assert_eq!(last_textures(gamma)[0], Some(targets.hdr.current().id));
    assert_eq!(last_render_target(gamma), Some(targets.hdr.alternate().id));
}

#[test]
fn each_stage_reads_what_the_previous_wrote() {
    let flags = RenderFlags::DITHERING | RenderFlags::SHARPENING | RenderFlags::CHROMATIC_ABERRATION;
    let mut f = Fixture::new(settings_with(flags));
    let commands = f.frame();

    let post = scope(&commands, "Pass_PostLight");
    let order = [
        "Pass_Dithering",
        "Pass_ToneMapping",
        "Pass_Sharpening",
        "Pass_ChromaticAberration",
        "Pass_GammaCorrection",
    ];
    assert_eq!(top_level_scopes(post), order);

    for pair in order.windows(2) {
        let written = last_render_target(scope(post, pair[0]));
        let read = last_textures(scope(post, pair[1]))[0];
        assert_eq!(read, written, "{} should read {}'s output", pair[1], pair[0]);
    }
}

#[test]
fn final_output_is_alternate_for_any_flag_subset() {
    let subsets = [
        RenderFlags::empty(),
        RenderFlags::BLOOM,
        RenderFlags::TAA | RenderFlags::MOTION_BLUR,
        RenderFlags::FXAA,
        RenderFlags::FXAA | RenderFlags::SHARPENING | RenderFlags::DITHERING,
        RenderFlags::default(),
    ];

    for flags in subsets {
        let mut f = Fixture::new(settings_with(flags));
        let commands = f.frame();

        let gamma = scope(&commands, "Pass_GammaCorrection");
        let output = last_render_target(gamma);
        assert_eq!(output, Some(f.renderer.targets().hdr.alternate().id), "flags {flags:?}");

        // Overlays draw on the finished frame
        if let Some(lines) = scopes(&commands, "Pass_Lines").first() {
            assert_eq!(last_render_target(lines), output);
        }
    }
}

#[test]
fn tone_mapping_off_skips_the_stage() {
    let mut settings = settings_with(RenderFlags::empty());
    settings.tone_mapping = ToneMapping::Off;
    let mut f = Fixture::new(settings);
    assert!(scopes(&f.frame(), "Pass_ToneMapping").is_empty());

    f.renderer.settings_mut().tone_mapping = ToneMapping::Reinhard;
    assert_eq!(scopes(&f.frame(), "Pass_ToneMapping").len(), 1);
}

#[test]
fn fxaa_runs_luma_then_fxaa() {
    let mut f = Fixture::new(settings_with(RenderFlags::FXAA));
    let commands = f.frame();

    let fxaa = scope(&commands, "Pass_FXAA");
    assert_eq!(draw_count(fxaa), 2);
}

#[test]
fn bloom_blurs_at_quarter_resolution() {
    let mut f = Fixture::new(settings_with(RenderFlags::BLOOM));
    let commands = f.frame();

    let bloom = scope(&commands, "Pass_Bloom");
    assert_eq!(
        top_level_scopes(bloom),
        ["Downsample", "Luminance", "Pass_BlurGaussian", "Upscale", "Upscale", "Additive_Blending"]
    );
    // downsample, bright, 2 blur, 2 upsample, blend
    assert_eq!(draw_count(bloom), 7);

    let quarter = f.renderer.targets().blur;
    let blur = scope(bloom, "Pass_BlurGaussian");
    let vertical = scope(blur, "Pass_BlurGaussian_Vertical");
    assert_eq!(last_render_target(vertical), Some(quarter.alternate().id));

    let upscale = scopes(bloom, "Upscale")[0];
    assert_eq!(last_textures(upscale)[0], Some(quarter.alternate().id));
}

// ============================================================================
// Temporal Anti-Aliasing
// ============================================================================

#[test]
fn taa_history_is_last_frames_resolve() {
    let mut f = Fixture::new(settings_with(RenderFlags::TAA));

    let first = f.frame();
    let taa_1 = scope(&first, "Pass_TAA");
    let resolve_1 = taa_1.iter().find_map(|c| match c {
        Command::SetRenderTargets { colors, .. } => colors.first().copied(),
        _ => None,
    });
    assert!(resolve_1.is_some());

    let second = f.frame();
    let taa_2 = scope(&second, "Pass_TAA");
    let history_2 = taa_2.iter().find_map(|c| match c {
        Command::SetTextures { slot: 0, textures } => textures.first().copied().flatten(),
        _ => None,
    });
    assert_eq!(history_2, resolve_1);
}

#[test]
fn taa_history_kept_when_copy_shader_is_pending() {
    let mut f = Fixture::new(settings_with(RenderFlags::TAA));
    let copy = f.renderer.shaders().get(ShaderKind::Texture);
    f.renderer.device_mut().set_shader_state(copy, ShaderState::Pending);
    let before = f.renderer.targets().taa;

    let commands = f.frame();

    assert_eq!(scopes(&commands, "Pass_TAA").len(), 1);
    let after = f.renderer.targets().taa;
    assert_eq!(after.current().id, before.current().id);
    assert_eq!(after.alternate().id, before.alternate().id);
}

#[test]
fn jitter_follows_taa_flag() {
    let mut f = Fixture::new(settings_with(RenderFlags::TAA));
    f.frame();
    let frame = f.renderer.frame();
    assert!(frame.jitter.length() > 0.0);
    // Halton(2,3) at index 1 is (0.5, 1/3) → (0, -1/3) in [-1, 1]
    assert!(approx(frame.jitter.x, 0.0));
    assert!(approx(frame.jitter.y, (-1.0 / 3.0) / 480.0));

    f.renderer.settings_mut().set_enabled(RenderFlags::TAA, false);
    f.frame();
    let frame = f.renderer.frame();
    assert_eq!(frame.jitter, glam::Vec2::ZERO);
    assert_eq!(frame.jitter_previous, glam::Vec2::ZERO);
}

// ============================================================================
// Pre-Light & Lighting
// ============================================================================

#[test]
fn ssao_is_blurred_into_alternate_and_fed_to_lighting() {
    let mut f = Fixture::new(settings_with(RenderFlags::SSAO));
    let commands = f.frame();

    let prelight = scope(&commands, "Pass_PreLight");
    assert_eq!(scopes(prelight, "Pass_SSAO").len(), 1);
    let blur = scope(prelight, "Pass_BlurBilateralGaussian");
    assert_eq!(draw_count(blur), 2);

    let ssao = f.renderer.targets().ssao;
    assert_eq!(last_render_target(scope(blur, "Pass_BlurBilateralGaussian_Vertical")), Some(ssao.alternate().id));
    assert_eq!(last_textures(scope(&commands, "Pass_Light"))[5], Some(ssao.alternate().id));
}

#[test]
fn lighting_uses_white_occlusion_without_ssao() {
    let mut f = Fixture::new(settings_with(RenderFlags::empty()));
    let commands = f.frame();

    assert!(scopes(&commands, "Pass_SSAO").is_empty());
    let white = f.renderer.fallbacks().white;
    assert_eq!(last_textures(scope(&commands, "Pass_Light"))[5], Some(white));
}

#[test]
fn shadow_mapping_runs_per_casting_light() {
    let mut f = Fixture::new(RendererSettings::default());
    let lamp = f.world.spawn("Lamp", Transform::from_position(Vec3::new(0.0, 3.0, 0.0)));
    f.world.set_light(lamp, Light::new_point(8.0));
    let off = f.world.spawn("Fill", Transform::from_position(Vec3::new(0.0, 3.0, 0.0)));
    f.world.set_light(off, Light::new_point(8.0).with_cast_shadows(false));

    let commands = f.frame();
    let prelight = scope(&commands, "Pass_PreLight");
    assert_eq!(scopes(prelight, "Pass_ShadowMapping").len(), 2);
}

#[test]
fn no_casting_light_leaves_shadows_fully_lit() {
    let mut f = Fixture::new(settings_with(RenderFlags::empty()));
    f.world.set_light(f.sun, Light::new_directional().with_cast_shadows(false));

    let commands = f.frame();

    assert!(scopes(&commands, "Pass_LightDepth").is_empty());
    let prelight = scope(&commands, "Pass_PreLight");
    assert!(scopes(prelight, "Pass_ShadowMapping").is_empty());
    assert_eq!(draw_count(prelight), 0);
    let shadows = f.renderer.targets().shadows.id;
    let clears: Vec<_> = prelight.iter().filter(|c| matches!(c, Command::ClearRenderTarget { .. })).collect();
    assert_eq!(clears, [&Command::ClearRenderTarget { target: shadows, color: Vec4::ONE }]);
    assert_eq!(f.renderer.frame().directional_light_avg_dir, Vec3::ZERO);
}

#[test]
fn uncompiled_lighting_shader_skips_only_lighting() {
    let mut f = Fixture::new(RendererSettings::default());
    let lighting = f.renderer.shaders().get(ShaderKind::Lighting);
    f.renderer.device_mut().set_shader_state(lighting, ShaderState::Pending);

    let commands = f.frame();
    let passes = top_level_scopes(&commands);
    assert!(!passes.iter().any(|p| p == "Pass_Light"));
    assert!(passes.iter().any(|p| p == "Pass_PostLight"));
}

// ============================================================================
// Debug Lines & Overlays
// ============================================================================

#[test]
fn queued_lines_are_drawn_then_cleared() {
    let mut f = Fixture::new(settings_with(RenderFlags::empty()));
    f.renderer.draw_line(Vec3::ZERO, Vec3::X, Vec4::ONE, Vec4::ONE, true);
    f.renderer.draw_box(&BoundingBox::unit(), Vec4::ONE, false);

    let commands = f.frame();
    let lines = scope(&commands, "Pass_Lines");
    let draws: Vec<_> = lines
        .iter()
        .filter_map(|c| match c {
            Command::Draw { vertex_count, first_vertex } => Some((*vertex_count, *first_vertex)),
            _ => None,
        })
        .collect();
    assert_eq!(draws, [(2, 0), (24, 2)]);
    assert_eq!(f.renderer.frame().queued_line_vertices(), (0, 0));

    // Nothing queued and no line gizmos: the pass is skipped
    assert!(scopes(&f.frame(), "Pass_Lines").is_empty());
}

#[test]
fn lines_queued_on_skipped_frames_are_dropped() {
    let mut f = Fixture::new(settings_with(RenderFlags::empty()));
    f.world.despawn(f.camera);
    for _ in 0..100 {
        f.renderer.draw_line(Vec3::ZERO, Vec3::X, Vec4::ONE, Vec4::ONE, true);
        f.frame();
        assert_eq!(f.renderer.frame().queued_line_vertices(), (0, 0));
    }

    // Camera but nothing to draw
    let camera = f.world.spawn("Camera", Transform::looking_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO));
    f.world.set_camera(camera, Camera::default());
    f.world.despawn(f.cube);
    f.renderer.draw_box(&BoundingBox::unit(), Vec4::ONE, false);
    f.frame();
    assert_eq!(f.renderer.frame().queued_line_vertices(), (0, 0));

    // Only the line queued for this frame is drawn
    f.spawn_cube(Vec3::ZERO, Vec4::ONE);
    f.renderer.draw_line(Vec3::ZERO, Vec3::Y, Vec4::ONE, Vec4::ONE, true);
    let commands = f.frame();
    let lines = scope(&commands, "Pass_Lines");
    assert!(lines.contains(&Command::Draw { vertex_count: 2, first_vertex: 0 }));
    assert_eq!(draw_count(lines), 1);
}

#[test]
fn picking_ray_and_bounds_are_generated() {
    let flags = RenderFlags::GIZMO_PICKING_RAY | RenderFlags::GIZMO_AABB;
    let mut f = Fixture::new(settings_with(flags));
    let ray = Ray { start: Vec3::ZERO, direction: Vec3::NEG_Z };
    if let Some(camera) = f.world.camera_mut(f.camera) {
        camera.picking_ray = Some(ray);
    }

    let commands = f.frame();
    let lines = scope(&commands, "Pass_Lines");
    // Ray (2) + 12 edges of the cube (24), all depth-tested
    assert!(lines.contains(&Command::Draw { vertex_count: 26, first_vertex: 0 }));
}

#[test]
fn debug_buffer_ssao_falls_back_to_white() {
    let mut settings = settings_with(RenderFlags::empty());
    settings.debug_buffer = DebugBuffer::Ssao;
    let mut f = Fixture::new(settings);
    let commands = f.frame();

    let debug = scope(&commands, "Pass_DebugBuffer");
    assert_eq!(last_textures(debug), [Some(f.renderer.fallbacks().white)]);
    assert_eq!(last_render_target(debug), Some(f.renderer.targets().hdr.alternate().id));
}

#[test]
fn transform_gizmo_needs_a_selection() {
    let mut f = Fixture::new(settings_with(RenderFlags::GIZMO_TRANSFORM));
    let commands = f.frame();
    assert!(scopes(&commands, "Pass_Gizmos_Transform").is_empty());

    let cube = f.cube;
    f.renderer.select(&f.world, Some(cube)).unwrap();
    let commands = f.frame();
    assert_eq!(draw_count(scope(&commands, "Pass_Gizmos_Transform")), 3);

    f.renderer.gizmo_mut().show_combined = true;
    let commands = f.frame();
    assert_eq!(draw_count(scope(&commands, "Pass_Gizmos_Transform")), 4);
}

#[test]
fn selecting_a_despawned_entity_fails() {
    let mut f = Fixture::new(RendererSettings::default());
    let cube = f.spawn_cube(Vec3::X, Vec4::ONE);
    f.world.despawn(cube);

    assert_eq!(f.renderer.select(&f.world, Some(cube)), Err(DeferredError::UnknownEntity(cube)));
    assert!(f.renderer.select(&f.world, None).is_ok());
}

#[test]
fn light_icon_drawn_only_in_front_of_camera() {
    let mut f = Fixture::new(settings_with(RenderFlags::GIZMO_LIGHTS));
    // The sun sits off to the side of the view cone
    let commands = f.frame();
    assert_eq!(draw_count(scope(&commands, "Pass_Gizmos_Lights")), 0);

    let lamp = f.world.spawn("Lamp", Transform::from_position(Vec3::new(0.0, 0.5, 0.0)));
    f.world.set_light(lamp, Light::new_point(5.0).with_cast_shadows(false));
    let commands = f.frame();
    assert_eq!(draw_count(scope(&commands, "Pass_Gizmos_Lights")), 1);
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn invalid_resolution_is_rejected() {
    let mut f = Fixture::new(RendererSettings::default());
    assert!(matches!(f.renderer.set_resolution(0, 480), Err(DeferredError::InvalidResolution { .. })));
    assert!(matches!(f.renderer.set_resolution(640, 20_000), Err(DeferredError::InvalidResolution { .. })));
    assert_eq!(f.renderer.targets().width, 640);
}

#[test]
fn same_resolution_after_rounding_is_a_no_op() -> anyhow::Result<()> {
    let mut f = Fixture::new(RendererSettings::default());
    let albedo = f.renderer.targets().gbuffer.albedo.id;
    let live = f.renderer.device().live_textures();

    f.renderer.set_resolution(641, 481)?;

    assert_eq!(f.renderer.targets().gbuffer.albedo.id, albedo);
    assert_eq!(f.renderer.device().live_textures(), live);
    Ok(())
}

#[test]
fn resolution_change_replaces_every_target() -> anyhow::Result<()> {
    let mut f = Fixture::new(RendererSettings::default());
    let old = f.renderer.targets().clone();
    let live = f.renderer.device().live_textures();

    f.renderer.set_resolution(1281, 720)?;

    let targets = f.renderer.targets();
    assert_eq!((targets.width, targets.height), (1280, 720));
    assert_eq!((targets.shadows.width, targets.shadows.height), (640, 360));
    assert_eq!((targets.blur.current().width, targets.blur.current().height), (320, 180));
    assert_eq!(f.renderer.device().live_textures(), live);
    for id in old.texture_ids() {
        assert!(f.renderer.device().texture(id).is_none());
    }
    Ok(())
}

#[test]
fn failed_resolution_change_keeps_old_targets() {
    let mut f = Fixture::new(RendererSettings::default());
    let before = f.renderer.targets().clone();

    assert!(matches!(f.renderer.set_resolution(2, 2), Err(DeferredError::ResolutionTooSmall { .. })));
    assert_eq!(f.renderer.targets(), &before);
}

// ============================================================================
// Probe & Counters
// ============================================================================

#[test]
fn probe_publishes_last_frame_counters() {
    let mut f = Fixture::new(RendererSettings::default());
    let probe = f.renderer.probe();
    f.frame();

    let stats = probe.last_frame();
    assert_eq!(stats.frame_number, 1);
    assert_eq!(stats.meshes_rendered, 1);
    assert!(stats.draw_calls > stats.meshes_rendered);

    let remote = std::thread::spawn(move || probe.is_rendering()).join().unwrap();
    assert!(!remote);
}

#[test]
fn metrics_overlay_draws_glyphs() {
    let mut f = Fixture::new(settings_with(RenderFlags::GIZMO_PERFORMANCE_METRICS));
    let commands = f.frame();

    let metrics = scope(&commands, "Pass_PerformanceMetrics");
    assert_eq!(draw_count(metrics), 1);
    assert!(last_textures(metrics).contains(&Some(f.renderer.fallbacks().font_atlas)));
}
