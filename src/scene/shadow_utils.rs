//! Light-Space Matrices
//!
//! Pure functions shared by [`Light`](super::Light) when it refreshes its
//! cached shadow matrices:
//!
//! - cascade split distances for directional lights
//! - world-space corners of one camera frustum slice
//! - the orthographic fit of a cascade, texel-snapped
//! - perspective views for spot lights and point-light cube faces
//!
//! Every projection is reverse-Z (near → 1, far → 0), matching the depth
//! state shared with the camera passes.

use glam::{Mat4, Vec2, Vec3};

use super::camera::RenderCamera;

/// Maximum cascade count per directional light.
pub const MAX_CASCADES: u32 = 4;

/// Number of cube faces rendered for a point light.
pub const CUBE_FACES: u32 = 6;

/// Near plane of spot and point light projections.
pub const SHADOW_NEAR: f32 = 0.1;

// ─── Cascades ────────────────────────────────────────────────────────────────

/// Far distance of each cascade, blending a uniform and a logarithmic
/// partition of `near..far` by `lambda` (0 = uniform, 1 = logarithmic).
///
/// Entries past `cascade_count` stay zero; the last used entry is exactly
/// `far`.
#[must_use]
pub fn compute_cascade_splits(cascade_count: u32, near: f32, far: f32, lambda: f32) -> [f32; MAX_CASCADES as usize] {
    let count = cascade_count.min(MAX_CASCADES) as usize;
    let ratio = far / near;

    std::array::from_fn(|i| {
        if i >= count {
            return 0.0;
        }
        if i + 1 == count {
            return far;
        }
        let t = (i + 1) as f32 / count as f32;
        let uniform = near + (far - near) * t;
        let logarithmic = near * ratio.powf(t);
        uniform + (logarithmic - uniform) * lambda
    })
}

/// World-space corners of the camera frustum between `slice_near` and
/// `slice_far`: the near quad first, then the far quad, each wound
/// bottom-left, bottom-right, top-right, top-left.
#[must_use]
pub fn compute_frustum_corners_world(camera: &RenderCamera, slice_near: f32, slice_far: f32) -> [Vec3; 8] {
    // View-volume half extents at unit distance
    let projection = camera.projection_matrix;
    let half = Vec2::new(1.0 / projection.x_axis.x, 1.0 / projection.y_axis.y);
    let quad = [Vec2::new(-1.0, -1.0), Vec2::new(1.0, -1.0), Vec2::ONE, Vec2::new(-1.0, 1.0)];
    let view_to_world = camera.view_matrix.inverse();

    std::array::from_fn(|i| {
        let distance = if i < 4 { slice_near } else { slice_far };
        let xy = quad[i % 4] * half * distance;
        view_to_world.transform_point3(xy.extend(-distance))
    })
}

fn safe_direction(direction: Vec3) -> Vec3 {
    if direction.length_squared() > 1e-6 { direction.normalize() } else { Vec3::NEG_Z }
}

fn up_for(direction: Vec3) -> Vec3 {
    if direction.y.abs() > 0.99 { Vec3::X } else { Vec3::Y }
}

/// Orthographic light view and projection enclosing one frustum slice.
///
/// The bounds snap to whole shadow-map texels so the fit is stable while
/// the camera moves.
#[must_use]
pub fn build_cascade(
    light_direction: Vec3,
    frustum_corners: &[Vec3; 8],
    shadow_map_size: u32,
) -> (Mat4, Mat4) {
    let dir = safe_direction(light_direction);

    let center = frustum_corners.iter().copied().sum::<Vec3>() / 8.0;
    let light_view = Mat4::look_at_rh(center - dir, center, up_for(dir));

    let (mut ls_min, mut ls_max) = frustum_corners
        .iter()
        .map(|&corner| light_view.transform_point3(corner))
        .fold((Vec3::MAX, Vec3::MIN), |(lo, hi), p| (lo.min(p), hi.max(p)));

    // Pull the near plane back so casters between camera and light survive
    let z_range = (ls_max.z - ls_min.z).max(1.0);
    ls_max.z += z_range.max(50.0);
    ls_min.z -= z_range;

    let texel_x = (ls_max.x - ls_min.x) / shadow_map_size.max(1) as f32;
    let texel_y = (ls_max.y - ls_min.y) / shadow_map_size.max(1) as f32;
    if texel_x > 0.0 {
        ls_min.x = (ls_min.x / texel_x).floor() * texel_x;
        ls_max.x = (ls_max.x / texel_x).ceil() * texel_x;
    }
    if texel_y > 0.0 {
        ls_min.y = (ls_min.y / texel_y).floor() * texel_y;
        ls_max.y = (ls_max.y / texel_y).ceil() * texel_y;
    }

    // Positive distances, passed far-then-near for reverse-Z like the camera
    let projection =
        Mat4::orthographic_rh(ls_min.x, ls_max.x, ls_min.y, ls_max.y, -ls_min.z, -ls_max.z);

    (light_view, projection)
}

/// View/projection pairs for every cascade of a directional light.
#[must_use]
pub fn build_directional_cascades(
    light_direction: Vec3,
    camera: &RenderCamera,
    cascade_count: u32,
    split_lambda: f32,
    shadow_map_size: u32,
) -> Vec<(Mat4, Mat4)> {
    let cascade_count = cascade_count.clamp(1, MAX_CASCADES);
    let near = camera.near.max(0.1);
    let far = camera.far.max(near + 1.0);
    let splits = compute_cascade_splits(cascade_count, near, far, split_lambda);

    let mut prev_split = near;
    (0..cascade_count as usize)
        .map(|c| {
            let corners = compute_frustum_corners_world(camera, prev_split, splits[c]);
            prev_split = splits[c];
            build_cascade(light_direction, &corners, shadow_map_size)
        })
        .collect()
}

// ─── Spot & Point ────────────────────────────────────────────────────────────

/// Perspective light view and projection for a spot light.
#[must_use]
pub fn build_spot(position: Vec3, direction: Vec3, angle: f32, range: f32) -> (Mat4, Mat4) {
    let dir = safe_direction(direction);
    let view = Mat4::look_at_rh(position, position + dir, up_for(dir));
    let fov = (angle * 2.0).clamp(0.1, std::f32::consts::PI - 0.01);
    let projection = Mat4::perspective_rh(fov, 1.0, range.max(1.0), SHADOW_NEAR);
    (view, projection)
}

/// One 90° view per cube face, in +X, -X, +Y, -Y, +Z, -Z order.
#[must_use]
pub fn build_point_faces(position: Vec3, range: f32) -> [(Mat4, Mat4); CUBE_FACES as usize] {
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, range.max(1.0), SHADOW_NEAR);
    let faces = [
        (Vec3::X, Vec3::NEG_Y),
        (Vec3::NEG_X, Vec3::NEG_Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::NEG_Z),
        (Vec3::Z, Vec3::NEG_Y),
        (Vec3::NEG_Z, Vec3::NEG_Y),
    ];
    faces.map(|(dir, up)| (Mat4::look_at_rh(position, position + dir, up), projection))
}
