//! Render Hardware Interface
//!
//! The frame pipeline never touches device internals. Everything it needs
//! from the GPU side goes through the narrow [`RenderDevice`] trait:
//!
//! - **Capability queries**: is the device initialized, has a shader finished
//!   compiling.
//! - **Factories**: textures (render targets and fallbacks), buffers, state
//!   objects and shader programs, all returned as opaque handles.
//! - **Submission**: ordered command streams recorded through a
//!   [`CommandList`], grouped into named pass scopes.
//!
//! Descriptors reuse the plain-data vocabulary of `wgpu`
//! (`TextureFormat`, `BlendState`, `CompareFunction`, ...) so a wgpu-backed
//! device can translate them one-to-one.

pub mod command;
pub mod recording;

use std::borrow::Cow;

use glam::Vec4;
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::errors::Result;

pub use command::{Command, CommandList, DepthAttachment, PrimitiveTopology, Viewport};
pub use recording::RecordingDevice;

new_key_type! {
    pub struct TextureId;
    pub struct BufferId;
    pub struct ShaderId;
    pub struct StateId;
}

// ─── Descriptors ─────────────────────────────────────────────────────────────

/// Describes a 2D (array) texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    pub label: Cow<'static, str>,
    pub width: u32,
    pub height: u32,
    pub array_layers: u32,
    pub format: wgpu::TextureFormat,
    pub usage: wgpu::TextureUsages,
}

impl TextureDescriptor {
    /// A render target that later passes sample from.
    #[must_use]
    pub fn render_target(
        label: impl Into<Cow<'static, str>>,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            array_layers: 1,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        }
    }

    /// A read-only texture (fallbacks, lookup tables, icons).
    #[must_use]
    pub fn sampled(
        label: impl Into<Cow<'static, str>>,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            array_layers: 1,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        }
    }

    #[must_use]
    pub fn with_array_layers(mut self, layers: u32) -> Self {
        self.array_layers = layers.max(1);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Constant,
    Vertex,
    Index,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: Cow<'static, str>,
    pub kind: BufferKind,
    pub size: u64,
    /// Element stride in bytes (vertex buffers only).
    pub stride: u32,
    /// Initial contents; `None` leaves the buffer uninitialized.
    pub contents: Option<Vec<u8>>,
}

impl BufferDescriptor {
    #[must_use]
    pub fn constant<T: bytemuck::Pod>(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: label.into(),
            kind: BufferKind::Constant,
            size: std::mem::size_of::<T>() as u64,
            stride: 0,
            contents: None,
        }
    }

    /// Dynamic vertex buffer with room for `count` elements of `T`.
    #[must_use]
    pub fn vertex<T: bytemuck::Pod>(label: impl Into<Cow<'static, str>>, count: usize) -> Self {
        let stride = std::mem::size_of::<T>();
        Self {
            label: label.into(),
            kind: BufferKind::Vertex,
            size: (stride * count) as u64,
            stride: stride as u32,
            contents: None,
        }
    }

    #[must_use]
    pub fn vertex_init<T: bytemuck::Pod>(label: impl Into<Cow<'static, str>>, data: &[T]) -> Self {
        Self {
            contents: Some(bytemuck::cast_slice(data).to_vec()),
            ..Self::vertex::<T>(label, data.len())
        }
    }

    /// Dynamic `u32` index buffer with room for `count` indices.
    #[must_use]
    pub fn index(label: impl Into<Cow<'static, str>>, count: usize) -> Self {
        Self {
            label: label.into(),
            kind: BufferKind::Index,
            size: (std::mem::size_of::<u32>() * count) as u64,
            stride: std::mem::size_of::<u32>() as u32,
            contents: None,
        }
    }

    #[must_use]
    pub fn index_init(label: impl Into<Cow<'static, str>>, data: &[u32]) -> Self {
        Self { contents: Some(bytemuck::cast_slice(data).to_vec()), ..Self::index(label, data.len()) }
    }

    /// Elements of `stride` bytes that fit.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        if self.stride == 0 { 0 } else { self.size / u64::from(self.stride) }
    }
}

/// Immutable fixed-function state object.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDescriptor {
    /// `None` disables blending.
    Blend(Option<wgpu::BlendState>),
    DepthStencil {
        depth_test_enabled: bool,
        depth_write_enabled: bool,
        depth_compare: wgpu::CompareFunction,
    },
    Rasterizer {
        cull_mode: Option<wgpu::Face>,
        polygon_mode: wgpu::PolygonMode,
    },
    Sampler {
        address_mode: wgpu::AddressMode,
        mag_filter: wgpu::FilterMode,
        min_filter: wgpu::FilterMode,
        mipmap_filter: wgpu::MipmapFilterMode,
        compare: Option<wgpu::CompareFunction>,
        anisotropy_clamp: u16,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    /// One program providing both stages.
    VertexPixel,
}

/// A program variant: one source compiled with a set of defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDescriptor {
    pub label: Cow<'static, str>,
    pub source: &'static str,
    pub stage: ShaderStage,
    pub defines: SmallVec<[(&'static str, &'static str); 2]>,
}

/// Compilation state reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderState {
    #[default]
    Pending,
    Compiled,
    Failed,
}

// ─── Device ──────────────────────────────────────────────────────────────────

/// The device collaborator consumed by the frame pipeline.
pub trait RenderDevice {
    /// Whether the device can accept work at all.
    fn is_initialized(&self) -> bool;

    /// Shaders may compile asynchronously; passes skip until `Compiled`.
    fn shader_state(&self, shader: ShaderId) -> ShaderState;

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureId>;
    fn destroy_texture(&mut self, texture: TextureId);

    fn create_buffer(&mut self, desc: &BufferDescriptor) -> Result<BufferId>;
    fn destroy_buffer(&mut self, buffer: BufferId);

    fn create_state(&mut self, desc: &StateDescriptor) -> Result<StateId>;
    fn create_shader(&mut self, desc: &ShaderDescriptor) -> Result<ShaderId>;

    /// Executes an ordered command stream.
    fn submit(&mut self, commands: Vec<Command>);

    fn clear_backbuffer(&mut self, color: Vec4);
    fn present(&mut self);
}
