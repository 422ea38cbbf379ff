//! Projection and view matrix construction

use glam::{Mat4, Vec3};

/// Perspective projection from a vertical FOV in degrees
pub fn perspective(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh_gl(fov_deg.to_radians(), aspect, near, far)
}

/// Symmetric orthographic projection over the given half extents
pub fn orthographic(half_width: f32, half_height: f32, near: f32, far: f32) -> Mat4 {
    Mat4::orthographic_rh_gl(
        -half_width,
        half_width,
        -half_height,
        half_height,
        near,
        far,
    )
}

/// View matrix from a camera position and Euler angles (radians),
/// rotations applied about X, then Y, then Z
pub fn euler_view(position: Vec3, rotation: Vec3) -> Mat4 {
    let rot = Mat4::from_rotation_z(rotation.z)
        * Mat4::from_rotation_y(rotation.y)
        * Mat4::from_rotation_x(rotation.x);
    rot * Mat4::from_translation(-position)
}

/// Focal length for a vertical FOV in degrees: `1 / tan(fov/2)`
pub fn focal_length(fov_deg: f32) -> f32 {
    1.0 / (fov_deg.to_radians() * 0.5).tan()
}
