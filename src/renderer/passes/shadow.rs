//! Shadow Depth Pass
//!
//! Renders opaque shadow casters into every slice of each shadow-casting
//! light's depth array: cascades for directional lights, cube faces for
//! point lights, one slice for spot lights. Depth only, no pixel shader.
//!
//! While drawing, the directions of directional lights are accumulated per
//! draw. Their mean is the single dominant light direction the transparent
//! pass shades with; it stays zero when no directional light drew anything.

use glam::Vec3;
use log::trace;

use super::RenderNode;
use crate::renderer::context::RenderContext;
use crate::renderer::frame::Bucket;
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::{BlendMode, DepthState, FillMode};
use crate::renderer::targets::CLEAR_DEPTH;
use crate::renderer::uniforms::ObjectUniforms;
use crate::rhi::{DepthAttachment, PrimitiveTopology, Viewport};
use crate::scene::{CullMode, GeometryId, LightKind};

#[derive(Debug, Default)]
pub struct ShadowDepthPass;

impl RenderNode for ShadowDepthPass {
    fn name(&self) -> &'static str {
        "Pass_LightDepth"
    }

    fn run(&mut self, ctx: &mut RenderContext<'_>) {
        let mut direction_sum = Vec3::ZERO;
        let mut direction_count = 0u32;

        let Some(depth_shader) = ctx.shader(ShaderKind::Depth) else {
            trace!("Depth shader not compiled, skipping shadow depth");
            ctx.frame.directional_light_avg_dir = Vec3::ZERO;
            return;
        };

        let world = ctx.world;
        let lights = ctx.frame.bucket(Bucket::Light).to_vec();
        let opaque = ctx.frame.bucket(Bucket::Opaque).to_vec();

        for light_entity in lights {
            let Some(light) = world.light(light_entity) else { continue };
            if !light.cast_shadows {
                continue;
            }
            let Some(shadow_map) = light.shadow_map().copied() else { continue };
            if opaque.is_empty() {
                continue;
            }

            ctx.cmd.begin(self.name());
            ctx.cmd.set_pixel_shader(None);
            ctx.cmd.set_blend_state(ctx.states.blend(BlendMode::Disabled));
            ctx.cmd.set_depth_stencil_state(ctx.states.depth(DepthState::Enabled));
            ctx.cmd.set_rasterizer_state(ctx.states.rasterizer(CullMode::Back, FillMode::Solid));
            ctx.cmd.set_topology(PrimitiveTopology::TriangleList);
            ctx.cmd.set_vertex_shader(Some(depth_shader));
            ctx.cmd.set_viewport(Viewport::from_size(shadow_map.resolution, shadow_map.resolution));

            let mut bound_geometry: Option<GeometryId> = None;

            for slice in 0..shadow_map.array_size {
                let attachment = DepthAttachment { texture: shadow_map.texture, slice };
                ctx.cmd.begin(format!("Array_{}", slice + 1));
                ctx.cmd.clear_depth(attachment, CLEAR_DEPTH);
                ctx.cmd.set_depth_target(attachment);

                let light_view_projection = light.view_projection(slice as usize);

                for &entity in &opaque {
                    let Some(renderable) = world.renderable(entity) else { continue };
                    let Some(material) = world.material_of(entity) else { continue };
                    let Some(geometry_id) = renderable.geometry else { continue };
                    let Some(geometry) = world.geometry(geometry_id) else { continue };
                    let (Some(vertex_buffer), Some(index_buffer)) =
                        (geometry.vertex_buffer, geometry.index_buffer)
                    else {
                        continue;
                    };
                    if !renderable.cast_shadows || material.is_transparent() {
                        continue;
                    }
                    let Some(transform) = world.transform(entity) else { continue };

                    if bound_geometry != Some(geometry_id) {
                        ctx.cmd.set_index_buffer(index_buffer);
                        ctx.cmd.set_vertex_buffer(vertex_buffer);
                        bound_geometry = Some(geometry_id);
                    }

                    if light.kind == LightKind::Directional {
                        direction_sum += light.direction();
                        direction_count += 1;
                    }

                    let object = ObjectUniforms {
                        model: transform.world_matrix(),
                        view_projection: light_view_projection,
                        view_projection_previous: light_view_projection,
                        ..ObjectUniforms::default()
                    };
                    ctx.cmd.update_buffer(ctx.buffers.object, &object);
                    ctx.cmd.set_constant_buffer(1, ctx.buffers.object);
                    ctx.draw_indexed(geometry.index_count, geometry.index_offset, geometry.vertex_offset);
                }

                ctx.cmd.end();
            }

            ctx.cmd.end();
        }

        ctx.frame.directional_light_avg_dir = average_direction(direction_sum, direction_count);
    }
}

/// `sum / count`, or zero when nothing was accumulated.
#[must_use]
pub fn average_direction(sum: Vec3, count: u32) -> Vec3 {
    if count == 0 { Vec3::ZERO } else { sum / count as f32 }
}
