use glam::{Mat4, Vec2, Vec3, Vec4};

use super::Transform;
use super::bounds::BoundingBox;

/// Camera component.
///
/// Projection uses reverse-Z: the near plane maps to depth 1 and the far
/// plane to depth 0, so depth targets clear to `0.0` and test with
/// `Greater`.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub clear_color: Vec4,
    /// Ray from the last pick query, in world space.
    pub picking_ray: Option<Ray>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new_perspective(60.0, 0.3, 1000.0)
    }
}

impl Camera {
    /// `fov` is given in degrees.
    #[must_use]
    pub fn new_perspective(fov: f32, near: f32, far: f32) -> Self {
        Self {
            fov: fov.to_radians(),
            near,
            far,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            picking_ray: None,
        }
    }

    #[must_use]
    pub fn with_clear_color(mut self, color: Vec4) -> Self {
        self.clear_color = color;
        self
    }

    #[must_use]
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        // Swapping near and far yields reverse-Z
        Mat4::perspective_rh(self.fov, aspect.max(f32::EPSILON), self.far, self.near)
    }

    /// Snapshot of everything the passes need from this camera for one frame.
    #[must_use]
    pub fn extract(&self, transform: &Transform, resolution: Vec2) -> RenderCamera {
        let world = transform.world_matrix();
        let view_matrix = world.inverse();
        let aspect = if resolution.y > 0.0 { resolution.x / resolution.y } else { 1.0 };
        let projection_matrix = self.projection_matrix(aspect);
        let view_projection_matrix = projection_matrix * view_matrix;

        RenderCamera {
            position: transform.position,
            forward: transform.forward(),
            view_matrix,
            projection_matrix,
            view_projection_matrix,
            frustum: Frustum::from_matrix(view_projection_matrix),
            near: self.near,
            far: self.far,
            clear_color: self.clear_color,
            picking_ray: self.picking_ray,
        }
    }
}

/// Per-frame camera data, read-only for the passes.
#[derive(Debug, Clone, Copy)]
pub struct RenderCamera {
    pub position: Vec3,
    pub forward: Vec3,
    pub view_matrix: Mat4,
    pub projection_matrix: Mat4,
    pub view_projection_matrix: Mat4,
    pub frustum: Frustum,
    pub near: f32,
    pub far: f32,
    pub clear_color: Vec4,
    pub picking_ray: Option<Ray>,
}

impl RenderCamera {
    /// Projects a world-space point to pixel coordinates (origin top-left).
    #[must_use]
    pub fn world_to_screen(&self, point: Vec3, resolution: Vec2) -> Vec2 {
        let clip = self.view_projection_matrix * point.extend(1.0);
        if clip.w.abs() < f32::EPSILON {
            return Vec2::ZERO;
        }
        let ndc = clip.truncate() / clip.w;
        Vec2::new(
            (ndc.x * 0.5 + 0.5) * resolution.x,
            (0.5 - ndc.y * 0.5) * resolution.y,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub start: Vec3,
    pub direction: Vec3,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl Frustum {
    /// Gribb-Hartmann plane extraction for a `[0, 1]` depth range.
    #[must_use]
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0],
            rows[3] - rows[0],
            rows[3] + rows[1],
            rows[3] - rows[1],
            rows[2],
            rows[3] - rows[2],
        ];

        for plane in &mut planes {
            let length = plane.truncate().length();
            if length > 0.0 {
                *plane /= length;
            }
        }

        Self { planes }
    }

    #[must_use]
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes.iter().all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }

    /// False only when the box lies entirely outside one plane.
    #[must_use]
    pub fn intersects_box(&self, aabb: &BoundingBox) -> bool {
        for plane in &self.planes {
            let normal = plane.truncate();
            // Corner furthest along the plane normal
            let positive = Vec3::select(normal.cmpge(Vec3::ZERO), aabb.max, aabb.min);
            if normal.dot(positive) + plane.w < 0.0 {
                return false;
            }
        }
        true
    }
}
