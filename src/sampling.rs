use crate::{Float, Point2f, Vec2f, Vec3f};
use std::f32;

pub fn concentric_sample_disk(u: Point2f) -> Point2f {
    // map sample from [0, 1] to [-1, 1]
    let u_offset = u * 2.0 - Vec2f::new(1.0, 1.0);
    if u_offset == Point2f::new(0.0, 0.0) {
        return Point2f::new(0.0, 0.0);
    }

    let (r, theta) = if u_offset.x.abs() > u_offset.y.abs() {
        (u_offset.x, f32::consts::FRAC_PI_4 * (u_offset.y / u_offset.x))
    } else {
        (u_offset.y, f32::consts::FRAC_PI_2 - f32::consts::FRAC_PI_4 * (u_offset.x / u_offset.y))
    };

    Point2f::new(theta.cos(), theta.sin()) * r
}

pub fn uniform_sample_sphere(u: Point2f) -> Vec3f {
    let z = 1.0 - 2.0 * u.x;
    let r = Float::sqrt(Float::max(0.0, 1.0 - z * z));
    let phi = 2.0 * f32::consts::PI * u.y;
    Vec3f::new(r * phi.cos(), r * phi.sin(), z)
}

/// Maps a uniform variate to barycentric coordinates (b0, b1) uniform over
/// the area of a triangle.
pub fn uniform_sample_triangle(u: Point2f) -> Point2f {
    let su0 = u.x.sqrt();
    Point2f::new(1.0 - su0, u.y * su0)
}

pub fn uniform_cone_pdf(cos_theta_max: Float) -> Float {
    1.0 / (2.0 * f32::consts::PI * (1.0 - cos_theta_max))
}
