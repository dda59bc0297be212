//! Render Context
//!
//! [`RenderContext`] is the explicit bundle every pass receives: the device,
//! the command list, the immutable state and shader tables, the render
//! targets, the frame state and the settings. It is built from disjoint
//! field borrows of the [`Renderer`](super::Renderer) for the duration of
//! one frame, so no pass can hold any of it across frames.
//!
//! [`RenderingProbe`] is the only piece that outlives a frame: a cloneable
//! read-only view of the "frame in flight" mark and the last frame's
//! counters, safe to poll from another thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::{Mat4, Vec2, Vec3};
use parking_lot::RwLock;

use super::frame::{FrameState, FrameStats, FrameUniforms};
use super::settings::{RenderFlags, RendererSettings};
use super::shaders::{ShaderKind, ShaderLibrary};
use super::state_cache::{BlendMode, DepthState, FillMode, PipelineStateCache, SamplerKind};
use super::targets::{FallbackTextures, RenderTarget, RenderTargetSet};
use super::uniforms::{
    GizmoUniforms, LightsUniforms, ObjectUniforms, QUAD_INDICES, QUAD_VERTICES, ShadowUniforms,
    TextUniforms,
};
use crate::errors::Result;
use crate::rhi::{BufferDescriptor, BufferId, CommandList, RenderDevice, ShaderId};
use crate::scene::{CullMode, World};

// ─── Shared buffers ──────────────────────────────────────────────────────────

/// Index/vertex pair for a static mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffers {
    pub vertex: BufferId,
    pub index: BufferId,
    pub index_count: u32,
}

/// Constant buffers and static meshes shared by the passes.
#[derive(Debug, Clone)]
pub struct FrameBuffers {
    pub global: BufferId,
    pub object: BufferId,
    pub shadow: BufferId,
    pub lights: BufferId,
    pub gizmo_handles: [BufferId; 4],
    pub text: BufferId,
    pub quad: MeshBuffers,
}

impl FrameBuffers {
    pub fn new(device: &mut dyn RenderDevice) -> Result<Self> {
        let mut gizmo_handles = [BufferId::default(); 4];
        for handle in &mut gizmo_handles {
            *handle = device.create_buffer(&BufferDescriptor::constant::<GizmoUniforms>("Gizmo Handle"))?;
        }

        Ok(Self {
            global: device.create_buffer(&BufferDescriptor::constant::<FrameUniforms>("Global"))?,
            object: device.create_buffer(&BufferDescriptor::constant::<ObjectUniforms>("Object"))?,
            shadow: device.create_buffer(&BufferDescriptor::constant::<ShadowUniforms>("Shadow Mapping"))?,
            lights: device.create_buffer(&BufferDescriptor::constant::<LightsUniforms>("Lights"))?,
            gizmo_handles,
            text: device.create_buffer(&BufferDescriptor::constant::<TextUniforms>("Text"))?,
            quad: MeshBuffers {
                vertex: device.create_buffer(&BufferDescriptor::vertex_init("Quad", &QUAD_VERTICES))?,
                index: device.create_buffer(&BufferDescriptor::index_init("Quad", &QUAD_INDICES))?,
                index_count: QUAD_INDICES.len() as u32,
            },
        })
    }
}

// ─── Rendering probe ─────────────────────────────────────────────────────────

/// Cross-thread view of the renderer's frame boundary.
#[derive(Debug, Clone, Default)]
pub struct RenderingProbe {
    rendering: Arc<AtomicBool>,
    stats: Arc<RwLock<FrameStats>>,
}

impl RenderingProbe {
    /// True between the start of a frame's passes and its submission.
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.rendering.load(Ordering::Acquire)
    }

    /// Counters of the last completed frame.
    #[must_use]
    pub fn last_frame(&self) -> FrameStats {
        *self.stats.read()
    }

    pub(crate) fn set_rendering(&self, rendering: bool) {
        self.rendering.store(rendering, Ordering::Release);
    }

    pub(crate) fn publish(&self, stats: FrameStats) {
        *self.stats.write() = stats;
    }
}

// ─── Transform gizmo state ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GizmoAxis {
    X,
    Y,
    Z,
    Xyz,
}

impl GizmoAxis {
    pub const ALL: [GizmoAxis; 4] = [Self::X, Self::Y, Self::Z, Self::Xyz];

    #[must_use]
    pub fn direction(self) -> Vec3 {
        match self {
            Self::X => Vec3::X,
            Self::Y => Vec3::Y,
            Self::Z => Vec3::NEG_Z,
            Self::Xyz => Vec3::ONE,
        }
    }
}

/// Selection driving the transform manipulation gizmo.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformGizmo {
    pub selected: Option<crate::scene::EntityId>,
    pub hovered: Option<GizmoAxis>,
    /// Also draw the combined (uniform) handle.
    pub show_combined: bool,
}

// ─── RenderContext ───────────────────────────────────────────────────────────

/// Everything a pass may touch while recording one frame.
pub struct RenderContext<'a> {
    pub device: &'a mut dyn RenderDevice,
    pub cmd: &'a mut CommandList,
    pub states: &'a PipelineStateCache,
    pub shaders: &'a ShaderLibrary,
    pub targets: &'a mut RenderTargetSet,
    pub fallbacks: &'a FallbackTextures,
    pub buffers: &'a FrameBuffers,
    pub frame: &'a mut FrameState,
    pub settings: &'a RendererSettings,
    pub world: &'a World,
    pub gizmo: &'a TransformGizmo,
}

impl RenderContext<'_> {
    #[inline]
    #[must_use]
    pub fn flag(&self, flag: RenderFlags) -> bool {
        self.settings.is_enabled(flag)
    }

    /// The program for `kind` if it has finished compiling.
    #[inline]
    #[must_use]
    pub fn shader(&self, kind: ShaderKind) -> Option<ShaderId> {
        self.shaders.compiled(&*self.device, kind)
    }

    #[must_use]
    pub fn resolution(&self) -> Vec2 {
        Vec2::new(self.targets.width as f32, self.targets.height as f32)
    }

    // === Uniforms ===

    /// Uploads the global block for a `width`×`height` target and binds it
    /// to slot 0.
    pub fn set_global_uniforms(&mut self, size: Vec2, mvp: Mat4) {
        let uniforms = self.frame.uniforms(self.settings, size, mvp);
        self.upload_global(&uniforms);
    }

    pub fn upload_global(&mut self, uniforms: &FrameUniforms) {
        self.cmd.update_buffer(self.buffers.global, uniforms);
        self.cmd.set_constant_buffer(0, self.buffers.global);
    }

    /// Model-view-projection that stretches the unit quad over a target.
    #[must_use]
    pub fn fullscreen_mvp(&self, target: &RenderTarget) -> Mat4 {
        self.frame.view_projection_ortho
            * Mat4::from_scale(Vec3::new(target.width as f32, target.height as f32, 1.0))
    }

    // === Common state ===

    /// Depth off, back-face solid, given blend, triangle list.
    pub fn bind_fullscreen_state(&mut self, blend: BlendMode) {
        self.cmd.set_depth_stencil_state(self.states.depth(DepthState::Disabled));
        self.cmd.set_rasterizer_state(self.states.rasterizer(CullMode::Back, FillMode::Solid));
        self.cmd.set_blend_state(self.states.blend(blend));
        self.cmd.set_topology(crate::rhi::PrimitiveTopology::TriangleList);
    }

    /// Binds `vertex`/`pixel`, renders into `output` and draws the quad.
    ///
    /// Textures and samplers are bound by the caller. Returns `false` if a
    /// shader was not ready and nothing was drawn.
    pub fn draw_quad(&mut self, pixel: ShaderKind, output: &RenderTarget) -> bool {
        let (Some(vs), Some(ps)) = (self.shader(ShaderKind::QuadVertex), self.shader(pixel)) else {
            log::trace!("{} not compiled, skipping draw", pixel.name());
            return false;
        };

        self.cmd.set_render_target(output.id, None);
        self.cmd.set_viewport(output.viewport());
        self.cmd.set_vertex_shader(Some(vs));
        self.cmd.set_pixel_shader(Some(ps));
        self.cmd.set_vertex_buffer(self.buffers.quad.vertex);
        self.cmd.set_index_buffer(self.buffers.quad.index);
        self.draw_indexed(self.buffers.quad.index_count, 0, 0);
        true
    }

    /// Standard full-screen stage: global block sized to `output`, one
    /// sampler, the given inputs.
    pub fn fullscreen_pass(
        &mut self,
        pixel: ShaderKind,
        inputs: &[Option<crate::rhi::TextureId>],
        output: &RenderTarget,
        sampler: SamplerKind,
    ) -> bool {
        let size = Vec2::new(output.width as f32, output.height as f32);
        let mvp = self.fullscreen_mvp(output);
        self.set_global_uniforms(size, mvp);
        self.cmd.set_sampler(0, self.states.sampler(sampler));
        self.cmd.set_textures(0, inputs);
        self.draw_quad(pixel, output)
    }

    // === Counted draws ===

    pub fn draw(&mut self, vertex_count: u32, first_vertex: u32) {
        self.cmd.draw(vertex_count, first_vertex);
        self.frame.stats.draw_calls += 1;
    }

    pub fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32) {
        self.cmd.draw_indexed(index_count, first_index, base_vertex);
        self.frame.stats.draw_calls += 1;
    }
}
