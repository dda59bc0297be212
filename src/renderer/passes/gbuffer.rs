use glam::Vec4;
use log::trace;

use super::RenderNode;
use crate::renderer::context::RenderContext;
use crate::renderer::frame::Bucket;
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::{BlendMode, DepthState, FillMode, SamplerKind};
use crate::renderer::targets::CLEAR_DEPTH;
use crate::renderer::uniforms::ObjectUniforms;
use crate::rhi::{PrimitiveTopology, ShaderId, ShaderState};
use crate::scene::{CullMode, GeometryId, MaterialId};

/// Opaque geometry into albedo, normal, material, velocity and depth.
///
/// With an empty opaque bucket the targets are only cleared. Otherwise each
/// visible entity is drawn in bucket order; geometry, pixel shader and
/// material textures are re-bound only when they differ from the previous
/// draw, which pays off because acquisition grouped the bucket by material.
#[derive(Debug, Default)]
pub struct GBufferPass;

impl RenderNode for GBufferPass {
    fn name(&self) -> &'static str {
        "Pass_GBuffer"
    }

    fn run(&mut self, ctx: &mut RenderContext<'_>) {
        ctx.cmd.begin(self.name());

        let gbuffer = ctx.targets.gbuffer;
        let color_targets = gbuffer.color_targets();
        let opaque = ctx.frame.bucket(Bucket::Opaque).to_vec();

        let vertex_shader = ctx.shader(ShaderKind::GBufferVertex);
        let (Some(vertex_shader), Some(camera)) = (vertex_shader, ctx.frame.camera)
        else {
            clear(ctx);
            ctx.cmd.end();
            return;
        };
        if opaque.is_empty() {
            clear(ctx);
            ctx.cmd.end();
            return;
        }

        let size = ctx.resolution();
        let view_projection = ctx.frame.view_projection;
        ctx.set_global_uniforms(size, view_projection);

        ctx.cmd.set_rasterizer_state(ctx.states.rasterizer(CullMode::Back, FillMode::Solid));
        ctx.cmd.set_blend_state(ctx.states.blend(BlendMode::Disabled));
        ctx.cmd.set_topology(PrimitiveTopology::TriangleList);
        ctx.cmd.set_depth_stencil_state(ctx.states.depth(DepthState::Enabled));
        ctx.cmd.set_viewport(gbuffer.albedo.viewport());
        ctx.cmd.set_render_targets(&color_targets, Some(gbuffer.depth.depth_attachment()));
        for target in color_targets {
            ctx.cmd.clear_render_target(target, Vec4::ZERO);
        }
        ctx.cmd.clear_depth(gbuffer.depth.depth_attachment(), CLEAR_DEPTH);
        ctx.cmd.set_vertex_shader(Some(vertex_shader));
        ctx.cmd.set_sampler(0, ctx.states.sampler(SamplerKind::AnisotropicWrap));

        let mut bound_geometry: Option<GeometryId> = None;
        let mut bound_shader: Option<ShaderId> = None;
        let mut bound_material: Option<MaterialId> = None;

        let world = ctx.world;
        for entity in opaque {
            let Some(renderable) = world.renderable(entity) else { continue };
            let Some(material_id) = renderable.material else { continue };
            let Some(material) = world.material(material_id) else { continue };

            let Some(shader) = material.shader else { continue };
            if ctx.device.shader_state(shader) != ShaderState::Compiled {
                continue;
            }

            let Some(geometry_id) = renderable.geometry else { continue };
            let Some(geometry) = world.geometry(geometry_id) else { continue };
            let (Some(vertex_buffer), Some(index_buffer)) = (geometry.vertex_buffer, geometry.index_buffer)
            else {
                continue;
            };

            if let Some(aabb) = world.world_aabb(entity)
                && !camera.frustum.intersects_box(&aabb)
            {
                continue;
            }
            let Some(transform) = world.transform(entity) else { continue };

            if bound_geometry != Some(geometry_id) {
                ctx.cmd.set_index_buffer(index_buffer);
                ctx.cmd.set_vertex_buffer(vertex_buffer);
                bound_geometry = Some(geometry_id);
            }

            if bound_shader != Some(shader) {
                ctx.cmd.set_pixel_shader(Some(shader));
                bound_shader = Some(shader);
            }

            if bound_material != Some(material_id) {
                ctx.cmd.set_rasterizer_state(ctx.states.rasterizer(material.cull_mode, FillMode::Solid));
                ctx.cmd.set_textures(0, &material.textures);
                bound_material = Some(material_id);
            }

            let object = ObjectUniforms {
                model: transform.world_matrix(),
                view_projection,
                view_projection_previous: ctx.frame.view_projection_previous,
                albedo: material.albedo,
                camera_position: camera.position,
                roughness: material.roughness,
                ..ObjectUniforms::default()
            };
            ctx.cmd.update_buffer(ctx.buffers.object, &object);
            ctx.cmd.set_constant_buffer(2, ctx.buffers.object);

            ctx.draw_indexed(geometry.index_count, geometry.index_offset, geometry.vertex_offset);
            ctx.frame.stats.meshes_rendered += 1;
        }

        ctx.cmd.end();
    }
}

/// Leaves every G-buffer channel cleared without drawing.
fn clear(ctx: &mut RenderContext<'_>) {
    let gbuffer = ctx.targets.gbuffer;
    for target in gbuffer.color_targets() {
        ctx.cmd.clear_render_target(target, Vec4::ZERO);
    }
    ctx.cmd.clear_depth(gbuffer.depth.depth_attachment(), CLEAR_DEPTH);
}
