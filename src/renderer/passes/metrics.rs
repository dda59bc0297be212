//! Performance Metrics Overlay
//!
//! Prints the frame counters at the top-left corner. Text is laid out on
//! the CPU as one quad per glyph against a fixed-grid ASCII atlas and drawn
//! in the orthographic screen space of the frame.

use glam::{Vec2, Vec4};
use log::error;

use super::RenderNode;
use crate::renderer::context::RenderContext;
use crate::renderer::frame::FrameStats;
use crate::renderer::settings::RenderFlags;
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::{BlendMode, SamplerKind};
use crate::renderer::uniforms::{FontVertex, TextUniforms};
use crate::rhi::{BufferDescriptor, BufferId, RenderDevice};

/// Glyph cells per atlas row; the atlas covers ASCII 0..128.
const ATLAS_COLUMNS: u32 = 16;
const ATLAS_ROWS: u32 = 8;
pub const GLYPH_SIZE: Vec2 = Vec2::new(10.0, 18.0);
const MARGIN: Vec2 = Vec2::new(1.0, 1.0);
const TEXT_COLOR: Vec4 = Vec4::ONE;

#[must_use]
pub fn metrics_text(stats: &FrameStats) -> String {
    format!(
        "FPS: {:.2}\nFrame: {}\nMeshes rendered: {}\nDraw calls: {}",
        stats.fps, stats.frame_number, stats.meshes_rendered, stats.draw_calls
    )
}

/// Lays `text` out from `origin` (top-left of the first glyph, y up).
///
/// Returns four vertices and six indices per printable character.
/// Whitespace advances the pen without emitting geometry; characters
/// outside the atlas render as `?`.
#[must_use]
pub fn layout_text(text: &str, origin: Vec2) -> (Vec<FontVertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(text.len() * 4);
    let mut indices = Vec::with_capacity(text.len() * 6);
    let mut pen = origin;

    for c in text.chars() {
        match c {
            '\n' => {
                pen = Vec2::new(origin.x, pen.y - GLYPH_SIZE.y);
                continue;
            }
            ' ' | '\t' => {
                pen.x += GLYPH_SIZE.x;
                continue;
            }
            _ => {}
        }

        let code = if c.is_ascii() { c as u32 } else { '?' as u32 };
        let cell = Vec2::new((code % ATLAS_COLUMNS) as f32, (code / ATLAS_COLUMNS) as f32);
        let uv_size = Vec2::new(1.0 / ATLAS_COLUMNS as f32, 1.0 / ATLAS_ROWS as f32);
        let uv_min = cell * uv_size;
        let uv_max = uv_min + uv_size;

        let base = vertices.len() as u32;
        let (left, right) = (pen.x, pen.x + GLYPH_SIZE.x);
        let (top, bottom) = (pen.y, pen.y - GLYPH_SIZE.y);
        vertices.extend_from_slice(&[
            FontVertex { position: Vec2::new(left, top), uv: Vec2::new(uv_min.x, uv_min.y) },
            FontVertex { position: Vec2::new(right, top), uv: Vec2::new(uv_max.x, uv_min.y) },
            FontVertex { position: Vec2::new(left, bottom), uv: Vec2::new(uv_min.x, uv_max.y) },
            FontVertex { position: Vec2::new(right, bottom), uv: Vec2::new(uv_max.x, uv_max.y) },
        ]);
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 1, base + 3]);
        pen.x += GLYPH_SIZE.x;
    }

    (vertices, indices)
}

#[derive(Debug, Clone, Copy)]
struct TextBuffers {
    vertex: BufferId,
    index: BufferId,
    glyphs: usize,
}

#[derive(Debug, Default)]
pub struct PerformanceMetricsPass {
    buffers: Option<TextBuffers>,
}

impl PerformanceMetricsPass {
    fn reserve(&mut self, device: &mut dyn RenderDevice, glyphs: usize) -> Option<TextBuffers> {
        if let Some(buffers) = self.buffers
            && buffers.glyphs >= glyphs
        {
            return Some(buffers);
        }

        let glyphs = glyphs.next_power_of_two();
        let vertex = device.create_buffer(&BufferDescriptor::vertex::<FontVertex>("Text", glyphs * 4));
        let index = device.create_buffer(&BufferDescriptor::index("Text", glyphs * 6));
        match (vertex, index) {
            (Ok(vertex), Ok(index)) => {
                if let Some(old) = self.buffers.replace(TextBuffers { vertex, index, glyphs }) {
                    device.destroy_buffer(old.vertex);
                    device.destroy_buffer(old.index);
                }
                self.buffers
            }
            (vertex, index) => {
                for created in [vertex.as_ref().ok(), index.as_ref().ok()].into_iter().flatten() {
                    device.destroy_buffer(*created);
                }
                if let Err(e) = vertex.and(index) {
                    error!("Failed to grow text buffers to {glyphs} glyphs: {e}");
                }
                None
            }
        }
    }
}

impl RenderNode for PerformanceMetricsPass {
    fn name(&self) -> &'static str {
        "Pass_PerformanceMetrics"
    }

    fn run(&mut self, ctx: &mut RenderContext<'_>) {
        if !ctx.flag(RenderFlags::GIZMO_PERFORMANCE_METRICS) {
            return;
        }
        let Some(shader) = ctx.shader(ShaderKind::Font) else {
            log::trace!("Font shader not compiled");
            return;
        };

        let resolution = ctx.resolution();
        let origin = Vec2::new(-resolution.x * 0.5 + MARGIN.x, resolution.y * 0.5 - MARGIN.y);
        let (vertices, indices) = layout_text(&metrics_text(&ctx.frame.stats), origin);
        if indices.is_empty() {
            return;
        }
        let Some(buffers) = self.reserve(ctx.device, vertices.len() / 4) else { return };

        ctx.cmd.begin(self.name());
        let output = *ctx.targets.hdr.alternate();
        let view_projection_ortho = ctx.frame.view_projection_ortho;

        ctx.bind_fullscreen_state(BlendMode::Enabled);
        ctx.cmd.set_render_target(output.id, None);
        ctx.cmd.set_viewport(output.viewport());
        ctx.set_global_uniforms(resolution, view_projection_ortho);
        ctx.cmd.update_buffer(ctx.buffers.text, &TextUniforms { transform: view_projection_ortho, color: TEXT_COLOR });
        ctx.cmd.set_constant_buffer(1, ctx.buffers.text);
        ctx.cmd.set_vertex_shader(Some(shader));
        ctx.cmd.set_pixel_shader(Some(shader));
        ctx.cmd.set_texture(0, ctx.fallbacks.font_atlas);
        ctx.cmd.set_sampler(0, ctx.states.sampler(SamplerKind::BilinearClamp));
        ctx.cmd.update_buffer_bytes(buffers.vertex, bytemuck::cast_slice(&vertices));
        ctx.cmd.update_buffer_bytes(buffers.index, bytemuck::cast_slice(&indices));
        ctx.cmd.set_vertex_buffer(buffers.vertex);
        ctx.cmd.set_index_buffer(buffers.index);
        ctx.draw_indexed(indices.len() as u32, 0, 0);
        ctx.cmd.end();
    }
}
