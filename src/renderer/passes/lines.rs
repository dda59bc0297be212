//! Lines Pass
//!
//! Debug line rendering on top of the finished frame (`hdr.alternate()`).
//!
//! Two batches share one dynamic vertex buffer: depth-tested lines first,
//! against the G-buffer depth, then overlay lines with depth disabled. The
//! renderer generates the picking ray and entity bounds into the depth
//! batch when those gizmos are enabled; everything else comes from
//! `draw_line` / `draw_box`. Both lists are cleared once drawn.
//!
//! The vertex buffer grows to fit the largest frame seen and never shrinks.

use glam::{Mat4, Vec3, Vec4};
use log::{error, trace};

use super::RenderNode;
use crate::renderer::context::{MeshBuffers, RenderContext};
use crate::renderer::frame::{Bucket, LineVertex};
use crate::renderer::settings::RenderFlags;
use crate::renderer::shaders::ShaderKind;
use crate::renderer::state_cache::{BlendMode, DepthState, FillMode, SamplerKind};
use crate::rhi::{BufferDescriptor, BufferId, PrimitiveTopology, RenderDevice};
use crate::scene::CullMode;

pub const PICKING_RAY_COLOR: Vec4 = Vec4::new(0.0, 1.0, 0.0, 1.0);
pub const AABB_COLOR: Vec4 = Vec4::new(0.41, 0.86, 1.0, 1.0);

const GRID_HALF_EXTENT: i32 = 100;
const GRID_SPACING: f32 = 1.0;
const GRID_COLOR: Vec4 = Vec4::new(1.0, 1.0, 1.0, 0.2);

// ─── Grid ────────────────────────────────────────────────────────────────────

/// Ground-plane grid on XZ, re-centred under the camera every frame.
#[derive(Debug, Clone, Copy)]
struct Grid {
    mesh: MeshBuffers,
}

impl Grid {
    fn new(device: &mut dyn RenderDevice) -> crate::errors::Result<Self> {
        let (vertices, indices) = grid_lines(GRID_HALF_EXTENT, GRID_SPACING, GRID_COLOR);
        Ok(Self {
            mesh: MeshBuffers {
                vertex: device.create_buffer(&BufferDescriptor::vertex_init("Grid", &vertices))?,
                index: device.create_buffer(&BufferDescriptor::index_init("Grid", &indices))?,
                index_count: indices.len() as u32,
            },
        })
    }
}

/// Snaps the grid origin to whole cells under the camera so it appears
/// infinite without sliding.
#[must_use]
pub fn grid_world_matrix(camera_position: Vec3) -> Mat4 {
    let snapped = (camera_position / GRID_SPACING).floor() * GRID_SPACING;
    Mat4::from_translation(Vec3::new(snapped.x, 0.0, snapped.z))
}

fn grid_lines(half_extent: i32, spacing: f32, color: Vec4) -> (Vec<LineVertex>, Vec<u32>) {
    let edge = half_extent as f32 * spacing;
    let mut vertices = Vec::with_capacity((half_extent as usize * 2 + 1) * 4);
    for i in -half_extent..=half_extent {
        let offset = i as f32 * spacing;
        vertices.push(LineVertex { position: Vec3::new(offset, 0.0, -edge), color });
        vertices.push(LineVertex { position: Vec3::new(offset, 0.0, edge), color });
        vertices.push(LineVertex { position: Vec3::new(-edge, 0.0, offset), color });
        vertices.push(LineVertex { position: Vec3::new(edge, 0.0, offset), color });
    }
    let indices = (0..vertices.len() as u32).collect();
    (vertices, indices)
}

// ─── Dynamic vertex buffer ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct LineBuffer {
    id: BufferId,
    capacity: usize,
}

// ─── Pass ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct LinesPass {
    buffer: Option<LineBuffer>,
    grid: Option<Grid>,
}

impl LinesPass {
    /// Vertices the dynamic buffer can currently hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.map_or(0, |b| b.capacity)
    }

    /// Returns a buffer with room for `required` vertices, replacing the
    /// current one if it is too small.
    fn reserve(&mut self, device: &mut dyn RenderDevice, required: usize) -> Option<BufferId> {
        if let Some(buffer) = self.buffer
            && buffer.capacity >= required
        {
            return Some(buffer.id);
        }

        let capacity = required.next_power_of_two();
        match device.create_buffer(&BufferDescriptor::vertex::<LineVertex>("Lines", capacity)) {
            Ok(id) => {
                if let Some(old) = self.buffer.replace(LineBuffer { id, capacity }) {
                    device.destroy_buffer(old.id);
                }
                Some(id)
            }
            Err(e) => {
                error!("Failed to grow line vertex buffer to {capacity} vertices: {e}");
                None
            }
        }
    }

    fn grid(&mut self, device: &mut dyn RenderDevice) -> Option<Grid> {
        if self.grid.is_none() {
            match Grid::new(device) {
                Ok(grid) => self.grid = Some(grid),
                Err(e) => error!("Failed to create grid gizmo: {e}"),
            }
        }
        self.grid
    }
}

impl RenderNode for LinesPass {
    fn name(&self) -> &'static str {
        "Pass_Lines"
    }

    fn run(&mut self, ctx: &mut RenderContext<'_>) {
        let draw_picking_ray = ctx.flag(RenderFlags::GIZMO_PICKING_RAY);
        let draw_aabb = ctx.flag(RenderFlags::GIZMO_AABB);
        let draw_grid = ctx.flag(RenderFlags::GIZMO_GRID);
        let (depth_queued, overlay_queued) = ctx.frame.queued_line_vertices();
        if !(draw_picking_ray || draw_aabb || draw_grid || depth_queued > 0 || overlay_queued > 0) {
            return;
        }

        let Some(camera) = ctx.frame.camera else { return };
        let Some(shader) = ctx.shader(ShaderKind::Color) else {
            trace!("Color shader not compiled, dropping queued lines");
            ctx.frame.clear_lines();
            return;
        };

        if draw_picking_ray && let Some(ray) = camera.picking_ray {
            let end = ray.start + ray.direction * camera.far;
            ctx.frame.push_line(ray.start, end, PICKING_RAY_COLOR, PICKING_RAY_COLOR, true);
        }
        if draw_aabb {
            let world = ctx.world;
            let entities = [Bucket::Opaque, Bucket::Transparent].map(|b| ctx.frame.bucket(b).to_vec());
            for entity in entities.iter().flatten() {
                if let Some(aabb) = world.world_aabb(*entity) {
                    ctx.frame.push_box(&aabb, AABB_COLOR, true);
                }
            }
        }

        ctx.cmd.begin(self.name());

        let output = *ctx.targets.hdr.alternate();
        let depth = ctx.targets.gbuffer.depth;
        let view_projection = ctx.frame.view_projection_unjittered;
        let size = ctx.resolution();

        ctx.cmd.set_rasterizer_state(ctx.states.rasterizer(CullMode::Back, FillMode::Wireframe));
        ctx.cmd.set_blend_state(ctx.states.blend(BlendMode::Disabled));
        ctx.cmd.set_topology(PrimitiveTopology::LineList);
        ctx.cmd.set_viewport(output.viewport());
        ctx.cmd.set_vertex_shader(Some(shader));
        ctx.cmd.set_pixel_shader(Some(shader));
        ctx.cmd.set_sampler(0, ctx.states.sampler(SamplerKind::PointClamp));

        // Depth-tested
        ctx.cmd.set_depth_stencil_state(ctx.states.depth(DepthState::Enabled));
        ctx.cmd.set_render_target(output.id, Some(depth.depth_attachment()));

        if draw_grid && let Some(grid) = self.grid(ctx.device) {
            ctx.set_global_uniforms(size, view_projection * grid_world_matrix(camera.position));
            ctx.cmd.set_blend_state(ctx.states.blend(BlendMode::Enabled));
            ctx.cmd.set_index_buffer(grid.mesh.index);
            ctx.cmd.set_vertex_buffer(grid.mesh.vertex);
            ctx.draw_indexed(grid.mesh.index_count, 0, 0);
            ctx.cmd.set_blend_state(ctx.states.blend(BlendMode::Disabled));
        }

        let depth_count = ctx.frame.lines_depth.len();
        let overlay_count = ctx.frame.lines_overlay.len();
        let total = depth_count + overlay_count;
        if total > 0
            && let Some(buffer) = self.reserve(ctx.device, total)
        {
            let mut vertices = Vec::with_capacity(total);
            vertices.extend_from_slice(&ctx.frame.lines_depth);
            vertices.extend_from_slice(&ctx.frame.lines_overlay);
            ctx.cmd.update_buffer_bytes(buffer, bytemuck::cast_slice(&vertices));
            ctx.cmd.set_vertex_buffer(buffer);
            ctx.set_global_uniforms(size, view_projection);

            if depth_count > 0 {
                ctx.draw(depth_count as u32, 0);
            }

            // Overlay
            ctx.cmd.set_depth_stencil_state(ctx.states.depth(DepthState::Disabled));
            ctx.cmd.set_render_target(output.id, None);
            if overlay_count > 0 {
                ctx.draw(overlay_count as u32, depth_count as u32);
            }
        }

        ctx.frame.clear_lines();
        ctx.cmd.end();
    }
}
