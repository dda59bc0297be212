//! Gizmos Pass
//!
//! Editor gizmos drawn over the finished frame with alpha blending and no
//! depth test:
//!
//! - **Light icons**: a screen-aligned billboard per light in front of the
//!   camera, sized by distance and textured by light kind.
//! - **Transform gizmo**: one handle per axis for the selected entity, each
//!   with its own constant buffer so the handles can be recorded back to
//!   back.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use super::RenderNode;
use crate::renderer::context::{GizmoAxis, RenderContext, TransformGizmo};
use crate::renderer::frame::Bucket;
use crate::renderer::settings::RenderFlags;
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::{BlendMode, SamplerKind};
use crate::renderer::targets::{LIGHT_ICON_SIZE, RenderTarget};
use crate::renderer::uniforms::GizmoUniforms;
use crate::scene::RenderCamera;

pub const GIZMO_MAX_SIZE: f32 = 5.0;
pub const GIZMO_MIN_SIZE: f32 = 0.1;

/// Lights further than ~60° off the view direction get no icon.
const LIGHT_VISIBILITY_COS: f32 = 0.5;

/// Vertices the gizmo shader expands into one arrow handle.
const HANDLE_VERTEX_COUNT: u32 = 36;

const HOVERED_COLOR: Vec4 = Vec4::new(1.0, 1.0, 0.0, 1.0);

/// On-screen scale of a light icon at `distance` from the camera.
#[must_use]
pub fn light_icon_scale(distance: f32) -> f32 {
    (GIZMO_MAX_SIZE / (distance + f32::EPSILON)).clamp(GIZMO_MIN_SIZE, GIZMO_MAX_SIZE)
}

/// Pixel coordinates (origin top-left) to the centred orthographic space of
/// `view_projection_ortho`.
#[must_use]
pub fn screen_to_ortho(screen: Vec2, resolution: Vec2) -> Vec2 {
    Vec2::new(screen.x - resolution.x * 0.5, resolution.y * 0.5 - screen.y)
}

/// Whether `point` lies within the cone the light icons are drawn for.
#[must_use]
pub fn in_front_of(camera: &RenderCamera, point: Vec3) -> bool {
    let to_point = (point - camera.position).normalize_or_zero();
    camera.forward.dot(to_point) > LIGHT_VISIBILITY_COS
}

#[derive(Debug, Default)]
pub struct GizmoPass;

impl RenderNode for GizmoPass {
    fn name(&self) -> &'static str {
        "Pass_Gizmos"
    }

    fn run(&mut self, ctx: &mut RenderContext<'_>) {
        let render_lights = ctx.flag(RenderFlags::GIZMO_LIGHTS);
        let render_transform = ctx.flag(RenderFlags::GIZMO_TRANSFORM);
        if !(render_lights || render_transform) {
            return;
        }
        let Some(camera) = ctx.frame.camera else { return };

        ctx.cmd.begin(self.name());
        let output = *ctx.targets.hdr.alternate();
        ctx.bind_fullscreen_state(BlendMode::Enabled);
        ctx.cmd.set_viewport(output.viewport());
        ctx.cmd.set_render_target(output.id, None);

        if render_lights {
            light_icons(ctx, &camera, &output);
        }
        if render_transform && ctx.gizmo.selected.is_some() {
            transform_handles(ctx, &camera, &output);
        }

        ctx.cmd.end();
    }
}

fn light_icons(ctx: &mut RenderContext<'_>, camera: &RenderCamera, output: &RenderTarget) {
    let lights = ctx.frame.bucket(Bucket::Light).to_vec();
    if lights.is_empty() {
        return;
    }

    ctx.cmd.begin("Pass_Gizmos_Lights");
    ctx.cmd.set_sampler(0, ctx.states.sampler(SamplerKind::BilinearClamp));

    let world = ctx.world;
    let resolution = ctx.resolution();
    for entity in lights {
        let Some(light) = world.light(entity) else { continue };
        let Some(transform) = world.transform(entity) else { continue };
        let position = transform.position;
        if !in_front_of(camera, position) {
            continue;
        }
        let Some(icon) = ctx.fallbacks.light_icon(light.kind) else { continue };

        let screen = camera.world_to_screen(position, resolution);
        let center = screen_to_ortho(screen, resolution);
        let size = LIGHT_ICON_SIZE * light_icon_scale(camera.position.distance(position));

        let model = Mat4::from_translation(center.extend(0.0)) * Mat4::from_scale(Vec3::new(size, size, 1.0));
        let mvp = ctx.frame.view_projection_ortho * model;
        ctx.set_global_uniforms(resolution, mvp);
        ctx.cmd.set_texture(0, icon);
        ctx.draw_quad(ShaderKind::Texture, output);
    }

    ctx.cmd.end();
}

fn transform_handles(ctx: &mut RenderContext<'_>, camera: &RenderCamera, output: &RenderTarget) {
    let Some(selected) = ctx.gizmo.selected else { return };
    let Some(transform) = ctx.world.transform(selected).copied() else { return };
    let Some(shader) = ctx.shader(ShaderKind::GizmoTransform) else {
        log::trace!("Transform gizmo shader not compiled");
        return;
    };

    let resolution = ctx.resolution();
    let view_projection = ctx.frame.view_projection_unjittered;
    let TransformGizmo { hovered, show_combined, .. } = *ctx.gizmo;

    ctx.cmd.begin("Pass_Gizmos_Transform");
    ctx.set_global_uniforms(resolution, view_projection);
    ctx.cmd.set_vertex_shader(Some(shader));
    ctx.cmd.set_pixel_shader(Some(shader));
    ctx.cmd.set_render_target(output.id, None);

    // Constant on-screen size regardless of distance.
    let scale = camera.position.distance(transform.position) * ctx.settings.gizmo_transform_size;

    let handles = GizmoAxis::ALL
        .into_iter()
        .enumerate()
        .filter(|(_, axis)| *axis != GizmoAxis::Xyz || show_combined);
    for (slot, axis) in handles {
        let uniforms = GizmoUniforms {
            transform: view_projection * handle_matrix(transform.position, axis, scale),
            color: if hovered == Some(axis) { HOVERED_COLOR } else { axis_color(axis) },
        };
        let buffer = ctx.buffers.gizmo_handles[slot];
        ctx.cmd.update_buffer(buffer, &uniforms);
        ctx.cmd.set_constant_buffer(1, buffer);
        ctx.draw(HANDLE_VERTEX_COUNT, 0);
    }

    ctx.cmd.end();
}

/// Handles are modelled along +X and rotated onto their axis.
#[must_use]
pub fn handle_matrix(position: Vec3, axis: GizmoAxis, scale: f32) -> Mat4 {
    let rotation = Quat::from_rotation_arc(Vec3::X, axis.direction().normalize());
    Mat4::from_scale_rotation_translation(Vec3::splat(scale), rotation, position)
}

fn axis_color(axis: GizmoAxis) -> Vec4 {
    match axis {
        GizmoAxis::X => Vec4::new(1.0, 0.0, 0.0, 1.0),
        GizmoAxis::Y => Vec4::new(0.0, 1.0, 0.0, 1.0),
        GizmoAxis::Z => Vec4::new(0.0, 0.0, 1.0, 1.0),
        GizmoAxis::Xyz => Vec4::ONE,
    }
}
