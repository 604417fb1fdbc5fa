use crate::geometry::Normal3;
use crate::{offset_ray_origin, Float, Point2f, Point3f, Ray, Vec3f, SHADOW_EPSILON};
use cgmath::Zero;

#[derive(Clone, Copy, Debug)]
pub struct HitPoint {
    pub p: Point3f,
    pub p_err: Vec3f,
    pub time: Float,
}

/// A point on (or near) geometry that rays are spawned from and sampling
/// densities are measured at. A zero normal marks a bare reference point in
/// space rather than a point on a surface.
#[derive(Clone, Copy, Debug)]
pub struct Interaction {
    pub p: Point3f,
    pub p_err: Vec3f,
    pub time: Float,
    pub wo: Vec3f,
    pub n: Normal3,
}

impl Interaction {
    pub fn from_point(p: Point3f) -> Self {
        Self {
            p,
            p_err: Vec3f::zero(),
            time: 0.0,
            wo: Vec3f::zero(),
            n: Normal3(Vec3f::zero()),
        }
    }

    pub fn is_surface_interaction(&self) -> bool {
        self.n.0 != Vec3f::zero()
    }

    pub fn spawn_ray(&self, dir: Vec3f) -> Ray {
        let o = offset_ray_origin(&self.p, &self.p_err, &self.n, &dir);
        Ray { origin: o, dir, t_max: std::f32::INFINITY, time: self.time }
    }

    pub fn spawn_ray_to(&self, p2: Point3f) -> Ray {
        let d = p2 - self.p;
        let o = offset_ray_origin(&self.p, &self.p_err, &self.n, &d);
        Ray { origin: o, dir: d, t_max: 1.0 - SHADOW_EPSILON, time: self.time }
    }
}

pub struct SurfaceInteraction {
    pub hit: HitPoint,

    /// (u, v) coordinates from the parametrization of the surface
    pub uv: Point2f,

    pub wo: Vec3f,

    pub n: Normal3,

    pub geom: DiffGeom,

    pub shading_n: Normal3,

    pub shading_geom: DiffGeom,
}

impl SurfaceInteraction {
    pub fn new(
        p: Point3f,
        p_err: Vec3f,
        time: Float,
        uv: Point2f,
        wo: Vec3f,
        n: Normal3,
        geom: DiffGeom
    ) -> Self {
        Self {
            hit: HitPoint { p, p_err, time },
            uv,
            wo,
            n,
            geom,

            shading_n: n,
            shading_geom: geom
        }
    }

    /// Installs shading geometry that differs from the true geometric one
    /// (e.g. interpolated vertex normals). When the shading normal is
    /// authoritative the geometric normal is flipped into its hemisphere;
    /// otherwise the shading normal follows the geometric one.
    pub fn set_shading_geometry(
        &mut self,
        shading_n: Normal3,
        shading_geom: DiffGeom,
        orientation_is_authoritative: bool,
    ) {
        self.shading_n = shading_n;
        self.shading_geom = shading_geom;
        if orientation_is_authoritative {
            self.n = self.n.faceforward(self.shading_n.0);
        } else {
            self.shading_n = self.shading_n.faceforward(self.n.0);
        }
    }

    /// The surface hit as a plain interaction, for the sampling and
    /// ray-spawning APIs.
    pub fn general(&self) -> Interaction {
        Interaction {
            p: self.hit.p,
            p_err: self.hit.p_err,
            time: self.hit.time,
            wo: self.wo,
            n: self.n,
        }
    }

    pub fn spawn_ray(&self, dir: Vec3f) -> Ray {
        let o = offset_ray_origin(&self.hit.p, &self.hit.p_err, &self.n, &dir);
        Ray { origin: o, dir, t_max: std::f32::INFINITY, time: self.hit.time }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DiffGeom {
    pub dpdu: Vec3f,
    pub dpdv: Vec3f,
    pub dndu: Normal3,
    pub dndv: Normal3
}
