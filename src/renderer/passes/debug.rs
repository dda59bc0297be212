use super::RenderNode;
use crate::renderer::context::RenderContext;
use crate::renderer::settings::{DebugBuffer, RenderFlags};
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::{BlendMode, SamplerKind};
use crate::rhi::TextureId;

/// Replaces the frame with one intermediate buffer, visualized full-screen.
#[derive(Debug, Default)]
pub struct DebugBufferPass;

impl RenderNode for DebugBufferPass {
    fn name(&self) -> &'static str {
        "Pass_DebugBuffer"
    }

    fn run(&mut self, ctx: &mut RenderContext<'_>) {
        let Some((texture, shader)) = debug_source(ctx) else { return };

        ctx.cmd.begin(self.name());
        let output = *ctx.targets.hdr.alternate();
        ctx.bind_fullscreen_state(BlendMode::Disabled);
        ctx.fullscreen_pass(shader, &[Some(texture)], &output, SamplerKind::BilinearClamp);
        ctx.cmd.end();
    }
}

/// Texture and visualization for the selected buffer, or `None` when the
/// overlay is off.
fn debug_source(ctx: &RenderContext<'_>) -> Option<(TextureId, ShaderKind)> {
    let gbuffer = &ctx.targets.gbuffer;
    let source = match ctx.settings.debug_buffer {
        DebugBuffer::None => return None,
        DebugBuffer::Albedo => (gbuffer.albedo.id, ShaderKind::Texture),
        DebugBuffer::Normal => (gbuffer.normal.id, ShaderKind::DebugNormal),
        DebugBuffer::Material => (gbuffer.material.id, ShaderKind::Texture),
        DebugBuffer::Velocity => (gbuffer.velocity.id, ShaderKind::DebugVelocity),
        DebugBuffer::Depth => (gbuffer.depth.id, ShaderKind::DebugDepth),
        DebugBuffer::Ssao => {
            let ssao =
                if ctx.flag(RenderFlags::SSAO) { ctx.targets.ssao.alternate().id } else { ctx.fallbacks.white };
            (ssao, ShaderKind::DebugSsao)
        }
    };
    Some(source)
}
