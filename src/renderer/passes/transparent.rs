use log::trace;

use super::RenderNode;
use crate::renderer::context::RenderContext;
use crate::renderer::frame::Bucket;
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::{BlendMode, DepthState, FillMode, SamplerKind};
use crate::renderer::uniforms::ObjectUniforms;
use crate::rhi::PrimitiveTopology;

/// Alpha-blended geometry over the lit frame, depth-tested against the
/// opaque depth buffer without writing to it.
///
/// Each draw carries its own object block: transform, camera, albedo,
/// roughness and the mean directional light direction from the shadow
/// depth pass.
#[derive(Debug, Default)]
pub struct TransparentPass;

impl RenderNode for TransparentPass {
    fn name(&self) -> &'static str {
        "Pass_Transparent"
    }

    fn run(&mut self, ctx: &mut RenderContext<'_>) {
        let transparent = ctx.frame.bucket(Bucket::Transparent).to_vec();
        if transparent.is_empty() {
            return;
        }
        let Some(camera) = ctx.frame.camera else { return };
        let Some(shader) = ctx.shader(ShaderKind::Transparent) else {
            trace!("Transparent shader not compiled");
            return;
        };

        let output = *ctx.targets.hdr.current();
        let depth = ctx.targets.gbuffer.depth;

        ctx.cmd.begin(self.name());
        ctx.cmd.set_topology(PrimitiveTopology::TriangleList);
        ctx.cmd.set_blend_state(ctx.states.blend(BlendMode::Enabled));
        ctx.cmd.set_depth_stencil_state(ctx.states.depth(DepthState::ReadOnly));
        ctx.cmd.set_render_target(output.id, Some(depth.depth_attachment()));
        ctx.cmd.set_viewport(output.viewport());
        ctx.cmd.set_textures(0, &[Some(depth.id), ctx.frame.skybox]);
        ctx.cmd.set_sampler(0, ctx.states.sampler(SamplerKind::BilinearClamp));
        ctx.cmd.set_vertex_shader(Some(shader));
        ctx.cmd.set_pixel_shader(Some(shader));

        let world = ctx.world;
        for entity in transparent {
            let Some(material) = world.material_of(entity) else { continue };
            let Some(geometry) = world.geometry_of(entity) else { continue };
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

            ctx.cmd.set_rasterizer_state(ctx.states.rasterizer(material.cull_mode, FillMode::Solid));
            ctx.cmd.set_index_buffer(index_buffer);
            ctx.cmd.set_vertex_buffer(vertex_buffer);

            let object = ObjectUniforms {
                model: transform.world_matrix(),
                view_projection: ctx.frame.view_projection,
                view_projection_previous: ctx.frame.view_projection_previous,
                albedo: material.albedo,
                camera_position: camera.position,
                roughness: material.roughness,
                light_direction: ctx.frame.directional_light_avg_dir,
                _padding: 0.0,
            };
            ctx.cmd.update_buffer(ctx.buffers.object, &object);
            ctx.cmd.set_constant_buffer(1, ctx.buffers.object);
            ctx.draw_indexed(geometry.index_count, geometry.index_offset, geometry.vertex_offset);
            ctx.frame.stats.meshes_rendered += 1;
        }

        ctx.cmd.end();
    }
}
