//! Blur Family
//!
//! Separable blurs run on a [`PingPong`] pair: horizontal from `current`
//! into `alternate`, vertical back into `current`, then the pair swaps so
//! the result ends up in `alternate()`. Both slots must match, otherwise
//! the blur logs an error and records nothing.

use glam::Vec2;
use log::error;

use crate::renderer::context::RenderContext;
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::SamplerKind;
use crate::renderer::targets::{PingPong, RenderTargetSet};
use crate::rhi::TextureId;

/// Which ping-pong pair of the target set to blur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurTarget {
    /// Half resolution occlusion pair.
    Ssao,
    /// Quarter resolution bloom pair.
    Quarter,
}

impl BlurTarget {
    fn pair(self, targets: &mut RenderTargetSet) -> &mut PingPong {
        match self {
            BlurTarget::Ssao => &mut targets.ssao,
            BlurTarget::Quarter => &mut targets.blur,
        }
    }
}

/// Separable Gaussian blur.
pub fn blur_gaussian(ctx: &mut RenderContext<'_>, target: BlurTarget, sigma: f32, pixel_stride: f32) {
    separable(ctx, target, "Pass_BlurGaussian", ShaderKind::BlurGaussian, sigma, pixel_stride, |_, input| {
        smallvec::smallvec![Some(input)]
    });
}

/// Separable Gaussian blur weighted by depth and normal similarity, so
/// edges between surfaces stay sharp.
pub fn blur_bilateral_gaussian(ctx: &mut RenderContext<'_>, target: BlurTarget, sigma: f32, pixel_stride: f32) {
    let scope = "Pass_BlurBilateralGaussian";
    separable(ctx, target, scope, ShaderKind::BlurBilateral, sigma, pixel_stride, |targets, input| {
        smallvec::smallvec![
            Some(input),
            Some(targets.gbuffer.depth.id),
            Some(targets.gbuffer.normal.id),
        ]
    });
}

type BlurInputs = smallvec::SmallVec<[Option<TextureId>; 4]>;

fn separable(
    ctx: &mut RenderContext<'_>,
    target: BlurTarget,
    scope: &'static str,
    shader: ShaderKind,
    sigma: f32,
    pixel_stride: f32,
    inputs: impl Fn(&RenderTargetSet, TextureId) -> BlurInputs,
) {
    let pair = *target.pair(ctx.targets);
    let (input, output) = (*pair.current(), *pair.alternate());
    if let Err(e) = input.ensure_swappable(&output) {
        error!("Invalid blur parameters, targets will get swapped: {e}");
        return;
    }

    let size = Vec2::new(input.width as f32, input.height as f32);
    let base = ctx.frame.uniforms(ctx.settings, size, ctx.fullscreen_mvp(&input));

    ctx.cmd.begin(scope);
    ctx.cmd.set_viewport(output.viewport());
    ctx.cmd.set_sampler(0, ctx.states.sampler(SamplerKind::BilinearClamp));

    ctx.cmd.begin(format!("{scope}_Horizontal"));
    ctx.upload_global(&base.with_blur(Vec2::new(pixel_stride, 0.0), sigma));
    let textures = inputs(ctx.targets, input.id);
    ctx.cmd.set_textures(0, &textures);
    ctx.draw_quad(shader, &output);
    ctx.cmd.end();

    ctx.cmd.begin(format!("{scope}_Vertical"));
    ctx.upload_global(&base.with_blur(Vec2::new(0.0, pixel_stride), sigma));
    let textures = inputs(ctx.targets, output.id);
    ctx.cmd.set_textures(0, &textures);
    ctx.draw_quad(shader, &input);
    ctx.cmd.end();

    ctx.cmd.end();

    target.pair(ctx.targets).swap();
}
