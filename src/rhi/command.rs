//! Command Recording
//!
//! [`CommandList`] records the ordered operations of a frame and hands them
//! to the device on [`submit`](CommandList::submit). It tracks the currently
//! bound fixed-function state and drops redundant sets, the same way a
//! tracked render pass skips re-binding an unchanged pipeline.
//!
//! Passes open a named scope with [`begin`](CommandList::begin) and close it
//! with [`end`](CommandList::end). Scopes nest; the device receives them as
//! `BeginPass` / `EndPass` markers for diagnostics and profiling.

use std::borrow::Cow;

use glam::Vec4;
use log::error;
use smallvec::SmallVec;

use super::{BufferId, RenderDevice, ShaderId, StateId, TextureId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    TriangleList,
    LineList,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[must_use]
    pub fn from_size(width: u32, height: u32) -> Self {
        Self { x: 0.0, y: 0.0, width: width as f32, height: height as f32 }
    }
}

/// Depth attachment: one array slice of a depth texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthAttachment {
    pub texture: TextureId,
    pub slice: u32,
}

/// A single recorded operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginPass(Cow<'static, str>),
    EndPass,

    SetBlendState(StateId),
    SetDepthStencilState(StateId),
    SetRasterizerState(StateId),
    SetTopology(PrimitiveTopology),
    SetViewport(Viewport),

    SetRenderTargets {
        colors: SmallVec<[TextureId; 4]>,
        depth: Option<DepthAttachment>,
    },
    ClearRenderTarget { target: TextureId, color: Vec4 },
    ClearDepth { target: DepthAttachment, depth: f32 },

    /// `None` unbinds the stage (depth-only rendering).
    SetVertexShader(Option<ShaderId>),
    SetPixelShader(Option<ShaderId>),

    SetVertexBuffer(BufferId),
    SetIndexBuffer(BufferId),
    /// Binds a contiguous texture range starting at `slot`. `None` entries
    /// leave the slot empty.
    SetTextures { slot: u32, textures: SmallVec<[Option<TextureId>; 8]> },
    SetSamplers { slot: u32, samplers: SmallVec<[StateId; 4]> },
    SetConstantBuffer { slot: u32, buffer: BufferId },
    UpdateBuffer { buffer: BufferId, data: Vec<u8> },

    Draw { vertex_count: u32, first_vertex: u32 },
    DrawIndexed { index_count: u32, first_index: u32, base_vertex: i32 },
}

/// Records commands for one submission, dropping redundant state sets.
#[derive(Debug, Default)]
pub struct CommandList {
    commands: Vec<Command>,
    scope_depth: u32,

    current_blend: Option<StateId>,
    current_depth_stencil: Option<StateId>,
    current_rasterizer: Option<StateId>,
    current_topology: Option<PrimitiveTopology>,
}

impl CommandList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // === Scopes ===

    pub fn begin(&mut self, name: impl Into<Cow<'static, str>>) {
        self.commands.push(Command::BeginPass(name.into()));
        self.scope_depth += 1;
    }

    pub fn end(&mut self) {
        if self.scope_depth == 0 {
            error!("CommandList::end called without a matching begin");
            return;
        }
        self.scope_depth -= 1;
        self.commands.push(Command::EndPass);
    }

    #[inline]
    #[must_use]
    pub fn scope_depth(&self) -> u32 {
        self.scope_depth
    }

    // === Fixed-function state ===

    pub fn set_blend_state(&mut self, state: StateId) {
        if self.current_blend != Some(state) {
            self.commands.push(Command::SetBlendState(state));
            self.current_blend = Some(state);
        }
    }

    pub fn set_depth_stencil_state(&mut self, state: StateId) {
        if self.current_depth_stencil != Some(state) {
            self.commands.push(Command::SetDepthStencilState(state));
            self.current_depth_stencil = Some(state);
        }
    }

    pub fn set_rasterizer_state(&mut self, state: StateId) {
        if self.current_rasterizer != Some(state) {
            self.commands.push(Command::SetRasterizerState(state));
            self.current_rasterizer = Some(state);
        }
    }

    pub fn set_topology(&mut self, topology: PrimitiveTopology) {
        if self.current_topology != Some(topology) {
            self.commands.push(Command::SetTopology(topology));
            self.current_topology = Some(topology);
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(Command::SetViewport(viewport));
    }

    // === Attachments ===

    pub fn set_render_target(&mut self, color: TextureId, depth: Option<DepthAttachment>) {
        self.set_render_targets(&[color], depth);
    }

    pub fn set_render_targets(&mut self, colors: &[TextureId], depth: Option<DepthAttachment>) {
        self.commands.push(Command::SetRenderTargets { colors: colors.into(), depth });
    }

    pub fn set_depth_target(&mut self, depth: DepthAttachment) {
        self.commands.push(Command::SetRenderTargets { colors: SmallVec::new(), depth: Some(depth) });
    }

    pub fn clear_render_target(&mut self, target: TextureId, color: Vec4) {
        self.commands.push(Command::ClearRenderTarget { target, color });
    }

    pub fn clear_depth(&mut self, target: DepthAttachment, depth: f32) {
        self.commands.push(Command::ClearDepth { target, depth });
    }

    // === Shaders & resources ===

    pub fn set_vertex_shader(&mut self, shader: Option<ShaderId>) {
        self.commands.push(Command::SetVertexShader(shader));
    }

    pub fn set_pixel_shader(&mut self, shader: Option<ShaderId>) {
        self.commands.push(Command::SetPixelShader(shader));
    }

    pub fn set_vertex_buffer(&mut self, buffer: BufferId) {
        self.commands.push(Command::SetVertexBuffer(buffer));
    }

    pub fn set_index_buffer(&mut self, buffer: BufferId) {
        self.commands.push(Command::SetIndexBuffer(buffer));
    }

    pub fn set_texture(&mut self, slot: u32, texture: TextureId) {
        self.set_textures(slot, &[Some(texture)]);
    }

    pub fn set_textures(&mut self, slot: u32, textures: &[Option<TextureId>]) {
        self.commands.push(Command::SetTextures { slot, textures: textures.into() });
    }

    pub fn set_sampler(&mut self, slot: u32, sampler: StateId) {
        self.set_samplers(slot, &[sampler]);
    }

    pub fn set_samplers(&mut self, slot: u32, samplers: &[StateId]) {
        self.commands.push(Command::SetSamplers { slot, samplers: samplers.into() });
    }

    pub fn set_constant_buffer(&mut self, slot: u32, buffer: BufferId) {
        self.commands.push(Command::SetConstantBuffer { slot, buffer });
    }

    pub fn update_buffer<T: bytemuck::Pod>(&mut self, buffer: BufferId, data: &T) {
        self.update_buffer_bytes(buffer, bytemuck::bytes_of(data));
    }

    pub fn update_buffer_bytes(&mut self, buffer: BufferId, bytes: &[u8]) {
        self.commands.push(Command::UpdateBuffer { buffer, data: bytes.to_vec() });
    }

    // === Draws ===

    pub fn draw(&mut self, vertex_count: u32, first_vertex: u32) {
        self.commands.push(Command::Draw { vertex_count, first_vertex });
    }

    pub fn draw_indexed(&mut self, index_count: u32, first_index: u32, base_vertex: i32) {
        self.commands.push(Command::DrawIndexed { index_count, first_index, base_vertex });
    }

    // === Submission ===

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Hands the recorded stream to the device and resets state tracking.
    ///
    /// Open scopes are closed first so the device always sees a balanced
    /// stream.
    pub fn submit(&mut self, device: &mut dyn RenderDevice) {
        if self.scope_depth != 0 {
            error!("Submitting command list with {} unclosed scope(s)", self.scope_depth);
            while self.scope_depth > 0 {
                self.end();
            }
        }

        let commands = std::mem::take(&mut self.commands);
        self.current_blend = None;
        self.current_depth_stencil = None;
        self.current_rasterizer = None;
        self.current_topology = None;

        if !commands.is_empty() {
            device.submit(commands);
        }
    }
}
