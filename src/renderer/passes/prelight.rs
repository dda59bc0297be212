//! Pre-Light Pass
//!
//! Produces the two screen-space terms the lighting pass multiplies in:
//!
//! - **Shadows** (half resolution): cleared to fully lit, then darkened by
//!   one shadow-mapping draw per shadow-casting light using a multiplicative
//!   blend. With no such light the clear value is the result.
//! - **Ambient occlusion** (half resolution, optional): SSAO estimate into
//!   `ssao.current()`, then a bilateral blur that leaves the result in
//!   `ssao.alternate()`.

use glam::Vec2;

use super::RenderNode;
use super::blur::{self, BlurTarget};
use crate::renderer::context::RenderContext;
use crate::renderer::frame::Bucket;
use crate::renderer::settings::RenderFlags;
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::{BlendMode, SamplerKind};
use crate::renderer::targets::CLEAR_ONE;
use crate::renderer::uniforms::ShadowUniforms;
use crate::scene::{Light, LightKind};

const SSAO_BLUR_SIGMA: f32 = 1.0;
const SSAO_BLUR_STRIDE: f32 = 1.0;

#[derive(Debug, Default)]
pub struct PreLightPass;

impl RenderNode for PreLightPass {
    fn name(&self) -> &'static str {
        "Pass_PreLight"
    }

    fn run(&mut self, ctx: &mut RenderContext<'_>) {
        ctx.cmd.begin(self.name());
        ctx.bind_fullscreen_state(BlendMode::Disabled);

        let shadows = ctx.targets.shadows;
        ctx.cmd.clear_render_target(shadows.id, CLEAR_ONE);

        let world = ctx.world;
        for entity in ctx.frame.bucket(Bucket::Light).to_vec() {
            let Some(light) = world.light(entity) else { continue };
            if light.cast_shadows {
                shadow_mapping(ctx, light);
            }
        }

        if ctx.flag(RenderFlags::SSAO) {
            ssao(ctx);
            blur::blur_bilateral_gaussian(ctx, BlurTarget::Ssao, SSAO_BLUR_SIGMA, SSAO_BLUR_STRIDE);
        }

        ctx.cmd.end();
    }
}

/// Projects the scene depth into `light`'s shadow space and multiplies the
/// visibility into the shadows target.
fn shadow_mapping(ctx: &mut RenderContext<'_>, light: &Light) {
    let Some(shadow_map) = light.shadow_map() else { return };

    let pixel = match light.kind {
        LightKind::Directional => ShaderKind::ShadowMappingDirectional,
        LightKind::Point => ShaderKind::ShadowMappingPoint,
        LightKind::Spot => ShaderKind::ShadowMappingSpot,
    };
    let (Some(vertex), Some(pixel)) = (ctx.shader(ShaderKind::ShadowMappingDirectional), ctx.shader(pixel)) else {
        log::trace!("Shadow mapping shader not compiled for {:?} light", light.kind);
        return;
    };

    ctx.cmd.begin("Pass_ShadowMapping");

    let output = ctx.targets.shadows;
    let size = Vec2::new(output.width as f32, output.height as f32);
    let mvp = ctx.fullscreen_mvp(&output);
    ctx.set_global_uniforms(size, mvp);
    ctx.cmd.update_buffer(ctx.buffers.shadow, &ShadowUniforms::from_light(light));
    ctx.cmd.set_constant_buffer(1, ctx.buffers.shadow);

    let gbuffer = ctx.targets.gbuffer;
    let map = Some(shadow_map.texture);
    ctx.cmd.set_textures(
        0,
        &[
            Some(gbuffer.normal.id),
            Some(gbuffer.depth.id),
            map.filter(|_| light.kind == LightKind::Directional),
            map.filter(|_| light.kind == LightKind::Point),
            map.filter(|_| light.kind == LightKind::Spot),
        ],
    );
    ctx.cmd.set_samplers(
        0,
        &[ctx.states.sampler(SamplerKind::CompareDepth), ctx.states.sampler(SamplerKind::BilinearClamp)],
    );

    ctx.cmd.set_render_target(output.id, None);
    ctx.cmd.set_blend_state(ctx.states.blend(BlendMode::ShadowMaps));
    ctx.cmd.set_viewport(output.viewport());
    ctx.cmd.set_vertex_shader(Some(vertex));
    ctx.cmd.set_pixel_shader(Some(pixel));
    ctx.cmd.set_vertex_buffer(ctx.buffers.quad.vertex);
    ctx.cmd.set_index_buffer(ctx.buffers.quad.index);
    ctx.draw_indexed(ctx.buffers.quad.index_count, 0, 0);

    ctx.cmd.set_blend_state(ctx.states.blend(BlendMode::Disabled));
    ctx.cmd.end();
}

/// Raw occlusion estimate into `ssao.current()`.
fn ssao(ctx: &mut RenderContext<'_>) {
    ctx.cmd.begin("Pass_SSAO");

    let output = *ctx.targets.ssao.current();
    let gbuffer = ctx.targets.gbuffer;
    let size = Vec2::new(output.width as f32, output.height as f32);
    let mvp = ctx.fullscreen_mvp(&output);
    ctx.set_global_uniforms(size, mvp);
    ctx.cmd.set_textures(0, &[Some(gbuffer.normal.id), Some(gbuffer.depth.id), Some(ctx.fallbacks.noise_normal)]);
    ctx.cmd.set_samplers(
        0,
        &[ctx.states.sampler(SamplerKind::BilinearClamp), ctx.states.sampler(SamplerKind::BilinearWrap)],
    );
    ctx.draw_quad(ShaderKind::Ssao, &output);

    ctx.cmd.end();
}
