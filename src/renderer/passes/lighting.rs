use glam::Vec2;
use log::trace;

use super::RenderNode;
use crate::renderer::context::RenderContext;
use crate::renderer::frame::Bucket;
use crate::renderer::settings::RenderFlags;
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::{BlendMode, SamplerKind};
use crate::renderer::uniforms::{LightRecord, LightsUniforms};

/// Deferred lighting: one full-screen draw evaluating every light against
/// the G-buffer, written to `hdr.current()`.
///
/// Texture slots, in order: albedo, normal, depth, material, shadows,
/// occlusion (white when SSAO is off), previous frame, sky (white when
/// absent), BRDF lookup.
#[derive(Debug, Default)]
pub struct LightingPass;

impl RenderNode for LightingPass {
    fn name(&self) -> &'static str {
        "Pass_Light"
    }

    fn run(&mut self, ctx: &mut RenderContext<'_>) {
        let Some(shader) = ctx.shader(ShaderKind::Lighting) else {
            trace!("Lighting shader not compiled, skipping frame lighting");
            return;
        };

        ctx.cmd.begin(self.name());

        let output = *ctx.targets.hdr.current();
        let size = Vec2::new(output.width as f32, output.height as f32);
        let mvp = ctx.fullscreen_mvp(&output);
        ctx.set_global_uniforms(size, mvp);

        let world = ctx.world;
        let lights = LightsUniforms::pack(
            ctx.frame
                .bucket(Bucket::Light)
                .iter()
                .filter_map(|&entity| world.light(entity))
                .map(LightRecord::from_light),
        );
        ctx.cmd.update_buffer(ctx.buffers.lights, &lights);
        ctx.cmd.set_constant_buffer(1, ctx.buffers.lights);

        let gbuffer = ctx.targets.gbuffer;
        let white = ctx.fallbacks.white;
        let ssao = if ctx.flag(RenderFlags::SSAO) { ctx.targets.ssao.alternate().id } else { white };
        let previous_frame = ctx.targets.hdr.alternate().id;
        let sky = ctx.frame.skybox.unwrap_or(white);

        ctx.bind_fullscreen_state(BlendMode::Disabled);
        ctx.cmd.set_viewport(output.viewport());
        ctx.cmd.set_render_target(output.id, None);
        ctx.cmd.set_vertex_shader(Some(shader));
        ctx.cmd.set_pixel_shader(Some(shader));
        ctx.cmd.set_samplers(
            0,
            &[ctx.states.sampler(SamplerKind::TrilinearClamp), ctx.states.sampler(SamplerKind::PointClamp)],
        );
        ctx.cmd.set_textures(
            0,
            &[
                Some(gbuffer.albedo.id),
                Some(gbuffer.normal.id),
                Some(gbuffer.depth.id),
                Some(gbuffer.material.id),
                Some(ctx.targets.shadows.id),
                Some(ssao),
                Some(previous_frame),
                Some(sky),
                Some(ctx.fallbacks.lut_ibl),
            ],
        );
        ctx.cmd.set_vertex_buffer(ctx.buffers.quad.vertex);
        ctx.cmd.set_index_buffer(ctx.buffers.quad.index);
        ctx.draw_indexed(ctx.buffers.quad.index_count, 0, 0);

        ctx.cmd.end();
    }
}
