//! Pass Pipeline
//!
//! The frame is a fixed sequence of [`RenderNode`]s. Each node opens its own
//! named scope on the command list (or records nothing when its
//! preconditions are not met) and leaves the pipeline state consistent for
//! the next one.
//!
//! ```text
//! LightDepth → GBuffer → PreLight → Light → Transparent → PostLight
//!     → Lines → Gizmos → DebugBuffer → PerformanceMetrics
//! ```
//!
//! Outputs flow through the [`RenderTargetSet`](super::targets::RenderTargetSet):
//! lighting writes `hdr.current()`, the post chain leaves the finished frame
//! in `hdr.alternate()`, and every overlay draws on top of it.

pub mod blur;
pub mod debug;
pub mod gbuffer;
pub mod gizmos;
pub mod lighting;
pub mod lines;
pub mod metrics;
pub mod post;
pub mod prelight;
pub mod shadow;
pub mod transparent;

use super::context::RenderContext;

pub use debug::DebugBufferPass;
pub use gbuffer::GBufferPass;
pub use gizmos::GizmoPass;
pub use lighting::LightingPass;
pub use lines::LinesPass;
pub use metrics::PerformanceMetricsPass;
pub use post::PostProcessPass;
pub use prelight::PreLightPass;
pub use shadow::ShadowDepthPass;
pub use transparent::TransparentPass;

/// One stage of the frame.
pub trait RenderNode {
    /// Name for diagnostics and logs.
    fn name(&self) -> &'static str;

    /// Records the pass into `ctx.cmd`.
    fn run(&mut self, ctx: &mut RenderContext<'_>);
}

/// The passes of a frame, in execution order.
#[must_use]
pub fn standard_passes() -> Vec<Box<dyn RenderNode>> {
    vec![
        Box::new(ShadowDepthPass),
        Box::new(GBufferPass),
        Box::new(PreLightPass),
        Box::new(LightingPass),
        Box::new(TransparentPass),
        Box::new(PostProcessPass),
        Box::new(LinesPass::default()),
        Box::new(GizmoPass),
        Box::new(DebugBufferPass),
        Box::new(PerformanceMetricsPass::default()),
    ]
}
