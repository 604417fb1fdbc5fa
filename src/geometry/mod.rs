use crate::{ComponentWiseExt, Float, Point3f, Vec3f};
use cgmath::prelude::*;
use cgmath::{Deg, Matrix3, Matrix4, Transform as cgTransform};
use std::ops::{Deref, Neg};

pub mod bounds;

pub use bounds::*;
use crate::err_float::{gamma, next_float_down, next_float_up};
use crate::interaction::{DiffGeom, HitPoint, SurfaceInteraction};

pub fn distance(p1: Point3f, p2: Point3f) -> Float {
    (p1 - p2).magnitude()
}

pub fn distance_squared(p1: Point3f, p2: Point3f) -> Float {
    (p1 - p2).magnitude2()
}

/// Completes a right-handed orthonormal basis around `v1`, which must be
/// normalized.
pub fn coordinate_system(v1: Vec3f) -> (Vec3f, Vec3f) {
    let v2 = if v1.x.abs() > v1.y.abs() {
        Vec3f::new(-v1.z, 0.0, v1.x) / (v1.x * v1.x + v1.z * v1.z).sqrt()
    } else {
        Vec3f::new(0.0, v1.z, -v1.y) / (v1.y * v1.y + v1.z * v1.z).sqrt()
    };
    (v2, v1.cross(v2))
}

pub fn spherical_direction(sin_theta: Float, cos_theta: Float, phi: Float, x: Vec3f, y: Vec3f, z: Vec3f) -> Vec3f {
    x * (sin_theta * phi.cos()) + y * (sin_theta * phi.sin()) + z * cos_theta
}

/// Offsets a ray origin away from a surface point along its normal, far
/// enough to escape the point's error bounds so that the new ray does not
/// re-intersect the surface it left.
pub fn offset_ray_origin(p: &Point3f, p_err: &Vec3f, n: &Normal3, dir: &Vec3f) -> Point3f {
    let d = n.map(|v| v.abs()).dot(*p_err);
    let mut offset = d * n.0;
    if dir.dot(n.0) < 0.0 {
        offset = -offset;
    }
    let mut po: Point3f = p + offset;
    for i in 0..3 {
        if offset[i] > 0.0 { po[i] = next_float_up(po[i]) }
        else if offset[i] < 0.0 { po[i] = next_float_down(po[i]) }
    }

    po
}

#[derive(Debug)]
pub struct Ray {
    pub origin: Point3f,
    pub dir: Vec3f,
    pub t_max: f32,
    pub time: f32,
}

impl Ray {
    pub fn new(origin: Point3f, dir: Vec3f) -> Self {
        Self {
            origin, dir, t_max: std::f32::INFINITY, time: 0.0
        }
    }

    pub fn at(&self, t: f32) -> Point3f {
        self.origin + (self.dir * t)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct Normal3(pub Vec3f);

impl Normal3 {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Self(Vec3f::new(x, y, z))
    }

    pub fn faceforward(self, v: Vec3f) -> Self {
        if self.dot(v) < 0.0 {
            Self(-self.0)
        } else {
            self
        }
    }
}

impl Deref for Normal3 {
    type Target = Vec3f;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Neg for Normal3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl From<Vec3f> for Normal3 {
    fn from(v: Vec3f) -> Self {
        Self(v)
    }
}

impl From<Normal3> for Vec3f {
    fn from(n: Normal3) -> Self {
        n.0
    }
}

/// An affine transform and its cached inverse. The pair is immutable once
/// built, so the two matrices can never drift apart.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub t: Matrix4<Float>,
    pub invt: Matrix4<Float>
}

impl Transform {

    pub fn from_mat(mat: Matrix4<Float>) -> Self {
        let m_inv = mat.invert().expect("Could not invert matrix");
        Self::new(mat, m_inv)
    }

    pub fn new(mat: Matrix4<Float>, mat_inv: Matrix4<Float>) -> Self {
        let t = mat;
        let invt = mat_inv;
        Self { t, invt }
    }

    pub fn identity() -> Self {
        Self::new(Matrix4::identity(), Matrix4::identity())
    }

    pub fn translate(delta: Vec3f) -> Self {
        let m = Matrix4::from_translation(delta);
        let m_inv = Matrix4::from_translation(-delta);
        Self::new(m, m_inv)
    }

    pub fn scale(sx: Float, sy: Float, sz: Float) -> Self {
        let m = Matrix4::from_nonuniform_scale(sx, sy, sz);
        let m_inv = Matrix4::from_nonuniform_scale(1.0 / sx, 1.0 / sy, 1.0 / sz);
        Self::new(m, m_inv)
    }

    /// Rotation about the x axis; `theta` in degrees. The inverse of a
    /// rotation is its transpose.
    pub fn rotate_x(theta: Float) -> Self {
        let m = Matrix4::from_angle_x(Deg(theta));
        Self::new(m, m.transpose())
    }

    pub fn rotate(axis: Vec3f, theta: Float) -> Self {
        let m = Matrix4::from_axis_angle(axis.normalize(), Deg(theta));
        Self::new(m, m.transpose())
    }

    pub fn inverse(&self) -> Self {
        Self::new(self.invt, self.t)
    }

    /// True when the linear part of the transform flips chirality, i.e. its
    /// determinant is negative.
    pub fn swaps_handedness(&self) -> bool {
        let m = Matrix3::from_cols(
            self.t.x.truncate(),
            self.t.y.truncate(),
            self.t.z.truncate(),
        );
        m.determinant() < 0.0
    }

    pub fn transform_normal(&self, n: &Normal3) -> Normal3 {
        // transform by the transpose of the inverse. cgmath matrices are
        // column-major, so invt[c][r] reads element (row r, column c) and the
        // transpose application is a dot with each column of the inverse.
        let x = self.invt[0][0]*n.x + self.invt[0][1]*n.y + self.invt[0][2]*n.z;
        let y = self.invt[1][0]*n.x + self.invt[1][1]*n.y + self.invt[1][2]*n.z;
        let z = self.invt[2][0]*n.x + self.invt[2][1]*n.y + self.invt[2][2]*n.z;
        Normal3(vec3f!(x, y, z))
    }
}

impl std::ops::Mul for Transform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(self.t * rhs.t, rhs.invt * self.invt)
    }
}

pub trait Transformable<O=Self> {
    fn transform(&self, t: Transform) -> O;
}

impl Transformable for Vec3f {
    fn transform(&self, t: Transform) -> Self {
        t.t.transform_vector(*self)
    }
}

impl Transformable for Point3f {
    fn transform(&self, t: Transform) -> Self { t.t.transform_point(*self) }
}

impl Transformable for Normal3 {
    fn transform(&self, t: Transform) -> Self {
        t.transform_normal(self)
    }
}

impl Transformable<(Self, Vec3f)> for Point3f {
    /// Transform a Point, giving the transformed point and a vector of the absolute error
    /// introduced by the transformation
    fn transform(&self, t: Transform) -> (Point3f, Vec3f) {
        let pt = t.t.transform_point(*self);
        let m = t.t;
        let x = self.x;
        let y = self.y;
        let z = self.z;

        let x_abs_sum = (m[0][0] * x).abs() + (m[1][0] * y).abs() + (m[2][0] * z).abs() + m[3][0].abs();
        let y_abs_sum = (m[0][1] * x).abs() + (m[1][1] * y).abs() + (m[2][1] * z).abs() + m[3][1].abs();
        let z_abs_sum = (m[0][2] * x).abs() + (m[1][2] * y).abs() + (m[2][2] * z).abs() + m[3][2].abs();

        let p_error = vec3f!(x_abs_sum, y_abs_sum, z_abs_sum) * gamma(3);
        (pt, p_error)
    }
}

impl Transformable<(Point3f, Vec3f)> for (Point3f, Vec3f) {
    /// Transform a point given its existing absolute error, producing the transformed point
    /// and its new absolute error
    fn transform(&self, t: Transform) -> (Point3f, Vec3f) {
        let (p, perr) = self;
        let pt = t.t.transform_point(*p);
        let m = t.t;

        let xerr = (gamma(3) + 1.0) *
            ((m[0][0] * perr.x).abs() + (m[1][0] * perr.y).abs() + (m[2][0] * perr.z).abs()) +
            gamma(3) * ((m[0][0] * p.x).abs() + (m[1][0] * p.y).abs() + (m[2][0] * p.z).abs() + m[3][0].abs());

        let yerr = (gamma(3) + 1.0) *
            ((m[0][1] * perr.x).abs() + (m[1][1] * perr.y).abs() + (m[2][1] * perr.z).abs()) +
            gamma(3) * ((m[0][1] * p.x).abs() + (m[1][1] * p.y).abs() + (m[2][1] * p.z).abs() + m[3][1].abs());

        let zerr = (gamma(3) + 1.0) *
            ((m[0][2] * perr.x).abs() + (m[1][2] * perr.y).abs() + (m[2][2] * perr.z).abs()) +
            gamma(3) * ((m[0][2] * p.x).abs() + (m[1][2] * p.y).abs() + (m[2][2] * p.z).abs() + m[3][2].abs());

        let p_error = vec3f!(xerr, yerr, zerr);
        (pt, p_error)
    }
}

impl Transformable<(Vec3f, Vec3f)> for Vec3f {
    fn transform(&self, t: Transform) -> (Vec3f, Vec3f) {
        let vt = t.t.transform_vector(*self);
        let m = t.t;
        let x = self.x;
        let y = self.y;
        let z = self.z;

        let x_abs_sum = (m[0][0] * x).abs() + (m[1][0] * y).abs() + (m[2][0] * z).abs();
        let y_abs_sum = (m[0][1] * x).abs() + (m[1][1] * y).abs() + (m[2][1] * z).abs();
        let z_abs_sum = (m[0][2] * x).abs() + (m[1][2] * y).abs() + (m[2][2] * z).abs();

        let v_error = vec3f!(x_abs_sum, y_abs_sum, z_abs_sum) * gamma(3);
        (vt, v_error)
    }
}

impl Transformable<(Ray, Vec3f, Vec3f)> for Ray {
    /// Transform a ray, producing the transformed ray and the absolute error
    /// bounds of its origin and direction
    fn transform(&self, t: Transform) -> (Ray, Vec3f, Vec3f) {
        let (mut ot, o_err): (Point3f, Vec3f) = self.origin.transform(t);
        let (dir_t, dir_err): (Vec3f, Vec3f) = self.dir.transform(t);
        let t_max = self.t_max;

        // advance the origin past its error bounds along the ray direction
        let len_sq = dir_t.magnitude2();
        if len_sq > 0.0 {
            let dt = dir_t.abs().dot(o_err) / len_sq;
            ot += dir_t * dt;
        }
        let ray_t = Ray { origin: ot, dir: dir_t, t_max, time: self.time };
        (ray_t, o_err, dir_err)
    }
}

impl Transformable for Bounds3f {
    fn transform(&self, t: Transform) -> Self {
        (0..8).fold(Bounds3f::empty(), |b, i| {
            let corner: Point3f = self.corner(i).transform(t);
            b.union_point(corner)
        })
    }
}

impl Transformable for HitPoint {
    fn transform(&self, t: Transform) -> Self {
        let (pt, pterr) = (self.p, self.p_err).transform(t);
        HitPoint { p: pt, p_err: pterr, time: self.time }
    }
}

impl Transformable for DiffGeom {
    fn transform(&self, t: Transform) -> Self {
        Self {
            dpdu: self.dpdu.transform(t),
            dpdv: self.dpdv.transform(t),
            dndu: self.dndu.transform(t),
            dndv: self.dndv.transform(t)
        }
    }
}

impl Transformable for SurfaceInteraction {
    fn transform(&self, t: Transform) -> Self {
        Self {
            hit: self.hit.transform(t),
            uv: self.uv,
            wo: Transformable::<Vec3f>::transform(&self.wo, t).normalize(),
            n: self.n.transform(t).normalize().into(),
            geom: self.geom.transform(t),

            shading_n: self.shading_n.transform(t).normalize().into(),
            shading_geom: self.shading_geom.transform(t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Point2f;
    use crate::interaction::SurfaceInteraction;
    use approx::assert_abs_diff_eq;

    #[test]
    fn swaps_handedness_follows_determinant_sign() {
        assert!(Transform::scale(-1.0, 1.0, 1.0).swaps_handedness());
        assert!(Transform::scale(-1.0, -2.0, -3.0).swaps_handedness());
        assert!(!Transform::scale(2.0, 3.0, 4.0).swaps_handedness());
        assert!(!Transform::translate(vec3f!(1, 2, 3)).swaps_handedness());
        assert!(!Transform::rotate_x(37.0).swaps_handedness());
        assert!(!Transform::identity().swaps_handedness());
    }

    #[test]
    fn inverse_round_trips_points() {
        let t = Transform::translate(vec3f!(1, -2, 3)) * Transform::rotate_x(30.0) * Transform::scale(2.0, 2.0, 2.0);
        let p = point3f!(0.3, -1.7, 4.2);
        let pt: Point3f = p.transform(t);
        let back: Point3f = pt.transform(t.inverse());
        for i in 0..3 {
            assert_abs_diff_eq!(back[i], p[i], epsilon = 1e-5);
        }
    }

    #[test]
    fn normals_stay_perpendicular_under_nonuniform_scale() {
        let t = Transform::scale(2.0, 1.0, 0.5);
        // surface tangent and normal, perpendicular in object space
        let tangent = vec3f!(1, 1, 0).normalize();
        let n = Normal3(vec3f!(1, -1, 0).normalize());

        let tangent_t: Vec3f = tangent.transform(t);
        let n_t = t.transform_normal(&n);
        assert_abs_diff_eq!(n_t.dot(tangent_t), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn transformed_point_error_bounds_contain_true_point() {
        let t = Transform::translate(vec3f!(10, 20, 30)) * Transform::rotate_x(45.0);
        let p = point3f!(1.1, 2.2, 3.3);
        let (pt, p_err): (Point3f, Vec3f) = p.transform(t);
        // the exact transformed point must lie within the error box
        let exact = t.t.transform_point(p);
        for i in 0..3 {
            assert!((exact[i] - pt[i]).abs() <= p_err[i] + 1e-6);
        }
    }

    #[test]
    fn surface_interaction_transform_preserves_uv() {
        let t = Transform::translate(vec3f!(0, 0, 5));
        let si = SurfaceInteraction::new(
            point3f!(0, 0, -1),
            vec3f!(0, 0, 0),
            0.0,
            Point2f::new(0.25, 0.75),
            vec3f!(0, 0, -1),
            Normal3::new(0.0, 0.0, -1.0),
            DiffGeom {
                dpdu: vec3f!(1, 0, 0),
                dpdv: vec3f!(0, 1, 0),
                dndu: Normal3::new(0.0, 0.0, 0.0),
                dndv: Normal3::new(0.0, 0.0, 0.0),
            },
        );
        let si_t = si.transform(t);
        assert_eq!(si_t.uv, si.uv);
        assert_abs_diff_eq!(si_t.hit.p.z, 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(si_t.n.z, -1.0, epsilon = 1e-6);
    }
}
