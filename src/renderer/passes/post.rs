//! Post-Processing Chain
//!
//! Runs on the HDR ping-pong pair. Every enabled stage reads
//! `hdr.current()`, writes `hdr.alternate()` and the pair swaps, so the
//! next stage again reads `current()`. A disabled stage (or one whose
//! shader is still compiling) draws nothing and does not swap, which leaves
//! the roles exactly as a pass-through copy would.
//!
//! Gamma correction always runs last and does not swap: the finished frame
//! is in `hdr.alternate()`, where the overlay passes draw on top of it.
//!
//! ```text
//! TAA → Bloom → Motion Blur → Dithering → Tone Mapping → FXAA
//!     → Sharpening → Chromatic Aberration → Gamma
//! ```

use super::RenderNode;
use super::blur::{self, BlurTarget};
use crate::renderer::context::RenderContext;
use crate::renderer::settings::{RenderFlags, ToneMapping};
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::{BlendMode, SamplerKind};
use crate::renderer::targets::RenderTarget;

const BLOOM_BLUR_SIGMA: f32 = 2.0;
const BLOOM_BLUR_STRIDE: f32 = 1.0;

/// A chain stage: draws from `input` into `output` and reports whether it
/// did, i.e. whether the pair must swap.
type Stage = fn(&mut RenderContext<'_>, &RenderTarget, &RenderTarget) -> bool;

#[derive(Debug, Default)]
pub struct PostProcessPass;

impl RenderNode for PostProcessPass {
    fn name(&self) -> &'static str {
        "Pass_PostLight"
    }

    fn run(&mut self, ctx: &mut RenderContext<'_>) {
        ctx.cmd.begin(self.name());
        ctx.bind_fullscreen_state(BlendMode::Disabled);

        let stages: [(bool, &'static str, Stage); 8] = [
            (ctx.flag(RenderFlags::TAA), "Pass_TAA", taa),
            (ctx.flag(RenderFlags::BLOOM), "Pass_Bloom", bloom),
            (ctx.flag(RenderFlags::MOTION_BLUR), "Pass_MotionBlur", motion_blur),
            (ctx.flag(RenderFlags::DITHERING), "Pass_Dithering", dithering),
            (ctx.settings.tone_mapping != ToneMapping::Off, "Pass_ToneMapping", tone_mapping),
            (ctx.flag(RenderFlags::FXAA), "Pass_FXAA", fxaa),
            (ctx.flag(RenderFlags::SHARPENING), "Pass_Sharpening", sharpening),
            (ctx.flag(RenderFlags::CHROMATIC_ABERRATION), "Pass_ChromaticAberration", chromatic_aberration),
        ];

        for (enabled, scope, stage) in stages {
            if !enabled {
                continue;
            }
            let (input, output) = (*ctx.targets.hdr.current(), *ctx.targets.hdr.alternate());
            ctx.cmd.begin(scope);
            let drawn = stage(ctx, &input, &output);
            ctx.cmd.end();
            if drawn {
                ctx.targets.hdr.swap();
            }
        }

        let (input, output) = (*ctx.targets.hdr.current(), *ctx.targets.hdr.alternate());
        ctx.cmd.begin("Pass_GammaCorrection");
        gamma_correction(ctx, &input, &output);
        ctx.cmd.end();

        ctx.cmd.end();
    }
}

// ─── Stages ──────────────────────────────────────────────────────────────────

/// Resolves against the history into `taa.current()`, copies the result to
/// `output`, then swaps the TAA pair so this frame becomes next frame's
/// history. Nothing swaps unless both draws happened.
fn taa(ctx: &mut RenderContext<'_>, input: &RenderTarget, output: &RenderTarget) -> bool {
    let taa = ctx.targets.taa;
    let (resolve, history) = (*taa.current(), *taa.alternate());
    let gbuffer = ctx.targets.gbuffer;

    let inputs = [Some(history.id), Some(input.id), Some(gbuffer.velocity.id), Some(gbuffer.depth.id)];
    if !ctx.fullscreen_pass(ShaderKind::Taa, &inputs, &resolve, SamplerKind::BilinearClamp) {
        return false;
    }
    if !ctx.fullscreen_pass(ShaderKind::Texture, &[Some(resolve.id)], output, SamplerKind::PointClamp) {
        return false;
    }
    ctx.targets.taa.swap();
    true
}

fn bloom(ctx: &mut RenderContext<'_>, input: &RenderTarget, output: &RenderTarget) -> bool {
    let quarter = ctx.targets.blur;
    let (bright, scratch) = (*quarter.current(), *quarter.alternate());

    ctx.cmd.begin("Downsample");
    let downsampled =
        ctx.fullscreen_pass(ShaderKind::DownsampleBox, &[Some(input.id)], &scratch, SamplerKind::BilinearClamp);
    ctx.cmd.end();
    if !downsampled {
        return false;
    }

    ctx.cmd.begin("Luminance");
    let thresholded =
        ctx.fullscreen_pass(ShaderKind::BloomBright, &[Some(scratch.id)], &bright, SamplerKind::BilinearClamp);
    ctx.cmd.end();
    if !thresholded {
        return false;
    }

    blur::blur_gaussian(ctx, BlurTarget::Quarter, BLOOM_BLUR_SIGMA, BLOOM_BLUR_STRIDE);
    let blurred = *ctx.targets.blur.alternate();

    let (half, full) = (ctx.targets.half_spare, ctx.targets.full_spare);
    ctx.cmd.begin("Upscale");
    ctx.fullscreen_pass(ShaderKind::UpsampleBox, &[Some(blurred.id)], &half, SamplerKind::BilinearClamp);
    ctx.cmd.end();
    ctx.cmd.begin("Upscale");
    ctx.fullscreen_pass(ShaderKind::UpsampleBox, &[Some(half.id)], &full, SamplerKind::BilinearClamp);
    ctx.cmd.end();

    ctx.cmd.begin("Additive_Blending");
    let blended = ctx.fullscreen_pass(
        ShaderKind::BloomBlend,
        &[Some(input.id), Some(full.id)],
        output,
        SamplerKind::BilinearClamp,
    );
    ctx.cmd.end();
    blended
}

fn motion_blur(ctx: &mut RenderContext<'_>, input: &RenderTarget, output: &RenderTarget) -> bool {
    let velocity = ctx.targets.gbuffer.velocity.id;
    ctx.fullscreen_pass(ShaderKind::MotionBlur, &[Some(input.id), Some(velocity)], output, SamplerKind::BilinearClamp)
}

fn dithering(ctx: &mut RenderContext<'_>, input: &RenderTarget, output: &RenderTarget) -> bool {
    ctx.fullscreen_pass(ShaderKind::Dithering, &[Some(input.id)], output, SamplerKind::PointClamp)
}

fn tone_mapping(ctx: &mut RenderContext<'_>, input: &RenderTarget, output: &RenderTarget) -> bool {
    ctx.fullscreen_pass(ShaderKind::ToneMapping, &[Some(input.id)], output, SamplerKind::PointClamp)
}

/// Luma into `output`, FXAA back into `input`. The internal swap puts the
/// result in `alternate()` like any other stage.
fn fxaa(ctx: &mut RenderContext<'_>, input: &RenderTarget, output: &RenderTarget) -> bool {
    if !ctx.fullscreen_pass(ShaderKind::Luma, &[Some(input.id)], output, SamplerKind::BilinearClamp) {
        return false;
    }
    if !ctx.fullscreen_pass(ShaderKind::Fxaa, &[Some(output.id)], input, SamplerKind::BilinearClamp) {
        return false;
    }
    ctx.targets.hdr.swap();
    true
}

fn sharpening(ctx: &mut RenderContext<'_>, input: &RenderTarget, output: &RenderTarget) -> bool {
    ctx.fullscreen_pass(ShaderKind::Sharpening, &[Some(input.id)], output, SamplerKind::BilinearClamp)
}

fn chromatic_aberration(ctx: &mut RenderContext<'_>, input: &RenderTarget, output: &RenderTarget) -> bool {
    ctx.fullscreen_pass(ShaderKind::ChromaticAberration, &[Some(input.id)], output, SamplerKind::BilinearClamp)
}

fn gamma_correction(ctx: &mut RenderContext<'_>, input: &RenderTarget, output: &RenderTarget) {
    ctx.fullscreen_pass(ShaderKind::GammaCorrection, &[Some(input.id)], output, SamplerKind::PointClamp);
}
