use crate::geometry::bounds::Bounds3f;
use crate::geometry::{Normal3, Ray, Transform, Transformable};
use crate::interaction::{DiffGeom, Interaction, SurfaceInteraction};
use crate::sampling::concentric_sample_disk;
use crate::shapes::Shape;
use crate::{Float, Point2f, Point3f, Vec3f};
use cgmath::{InnerSpace, Zero};
use std::f32::consts::PI;

/// An annulus in the object-space z = `height` plane, swept up to `phi_max`.
pub struct Disk<'t> {
    object_to_world: &'t Transform,
    world_to_object: &'t Transform,
    reverse_orientation: bool,
    transform_swaps_handedness: bool,

    height: Float,
    radius: Float,
    inner_radius: Float,
    phi_max: Float,
}

impl<'t> Disk<'t> {
    pub fn new(
        object_to_world: &'t Transform,
        world_to_object: &'t Transform,
        reverse_orientation: bool,
        height: Float,
        radius: Float,
        inner_radius: Float,
        phi_max: Float,
    ) -> Self {
        debug_assert!(radius > 0.0 && inner_radius >= 0.0 && inner_radius < radius);
        Self {
            object_to_world,
            world_to_object,
            reverse_orientation,
            transform_swaps_handedness: object_to_world.swaps_handedness(),
            height,
            radius,
            inner_radius,
            phi_max: phi_max.clamp(0.0, 360.0).to_radians(),
        }
    }

    /// Plane intersection plus the radius/phi clip tests shared by both
    /// intersection queries. Returns the hit parameter, hit point, its
    /// squared distance from the axis, and phi.
    fn plane_hit(&self, ray: &Ray) -> Option<(Float, Point3f, Float, Float)> {
        // a ray parallel to the disk plane never hits it
        if ray.dir.z == 0.0 {
            return None;
        }
        let t_shape_hit = (self.height - ray.origin.z) / ray.dir.z;
        if t_shape_hit <= 0.0 || t_shape_hit >= ray.t_max {
            return None;
        }

        let p_hit = ray.at(t_shape_hit);
        let dist2 = p_hit.x * p_hit.x + p_hit.y * p_hit.y;
        if dist2 > self.radius * self.radius || dist2 < self.inner_radius * self.inner_radius {
            return None;
        }

        let mut phi = Float::atan2(p_hit.y, p_hit.x);
        if phi < 0.0 {
            phi += 2.0 * PI;
        }
        if phi > self.phi_max {
            return None;
        }

        Some((t_shape_hit, p_hit, dist2, phi))
    }
}

impl<'t> Shape for Disk<'t> {
    fn object_bound(&self) -> Bounds3f {
        bounds3f!(
            (-self.radius, -self.radius, self.height),
            (self.radius, self.radius, self.height)
        )
    }

    fn object_to_world(&self) -> &Transform {
        self.object_to_world
    }

    fn world_to_object(&self) -> &Transform {
        self.world_to_object
    }

    fn reverse_orientation(&self) -> bool {
        self.reverse_orientation
    }

    fn transform_swaps_handedness(&self) -> bool {
        self.transform_swaps_handedness
    }

    fn intersect(&self, ray: &Ray, _test_alpha_texture: bool) -> Option<(Float, SurfaceInteraction)> {
        let (ray, _origin_err, _dir_err): (Ray, Vec3f, Vec3f) = ray.transform(*self.world_to_object);

        let (t_shape_hit, mut p_hit, dist2, phi) = self.plane_hit(&ray)?;

        let u = phi / self.phi_max;
        let r_hit = dist2.sqrt();
        let v = (self.radius - r_hit) / (self.radius - self.inner_radius);

        let dpdu = vec3f!(-self.phi_max * p_hit.y, self.phi_max * p_hit.x, 0.0);
        let dpdv = vec3f!(p_hit.x, p_hit.y, 0.0) * ((self.inner_radius - self.radius) / r_hit);

        let mut n = Normal3::new(0.0, 0.0, 1.0);
        if self.flips_normal_orientation() {
            n = -n;
        }

        // the hit lies exactly in the z = height plane
        p_hit.z = self.height;
        let p_err = Vec3f::zero();

        let interact = SurfaceInteraction::new(
            p_hit,
            p_err,
            ray.time,
            Point2f::new(u, v),
            -ray.dir,
            n,
            DiffGeom {
                dpdu,
                dpdv,
                dndu: Normal3::new(0.0, 0.0, 0.0),
                dndv: Normal3::new(0.0, 0.0, 0.0),
            },
        );

        let world_interact = interact.transform(*self.object_to_world);

        Some((t_shape_hit, world_interact))
    }

    fn intersect_test(&self, ray: &Ray, _test_alpha_texture: bool) -> bool {
        let (ray, _origin_err, _dir_err): (Ray, Vec3f, Vec3f) = ray.transform(*self.world_to_object);
        self.plane_hit(&ray).is_some()
    }

    fn area(&self) -> Float {
        self.phi_max * 0.5 * (self.radius * self.radius - self.inner_radius * self.inner_radius)
    }

    fn sample(&self, u: Point2f) -> (Interaction, Float) {
        let pd = concentric_sample_disk(u);
        let p_obj = Point3f::new(pd.x * self.radius, pd.y * self.radius, self.height);

        let mut n: Normal3 = Normal3::new(0.0, 0.0, 1.0)
            .transform(*self.object_to_world)
            .normalize()
            .into();
        if self.reverse_orientation {
            n = -n;
        }

        let (p, p_err): (Point3f, Vec3f) = (p_obj, Vec3f::zero()).transform(*self.object_to_world);
        let it = Interaction { p, p_err, time: 0.0, wo: Vec3f::zero(), n };
        (it, 1.0 / self.area())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn axial_ray_hits_disk() {
        let t = Transform::identity();
        let t_inv = t.inverse();
        let disk = Disk::new(&t, &t_inv, false, 0.0, 1.0, 0.0, 360.0);

        let ray = Ray::new(point3f!(0.5, 0, -3), vec3f!(0, 0, 1));
        let (t_hit, isect) = disk.intersect(&ray, true).expect("must hit");
        assert_abs_diff_eq!(t_hit, 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(isect.hit.p.z, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(isect.n.z, 1.0, epsilon = 1e-6);
        // halfway from rim to center
        assert_abs_diff_eq!(isect.uv.y, 0.5, epsilon = 1e-5);
        assert!(disk.intersect_test(&ray, true));
    }

    #[test]
    fn annulus_hole_misses() {
        let t = Transform::identity();
        let t_inv = t.inverse();
        let disk = Disk::new(&t, &t_inv, false, 0.0, 1.0, 0.25, 360.0);

        let through_hole = Ray::new(point3f!(0.1, 0, -3), vec3f!(0, 0, 1));
        assert!(disk.intersect(&through_hole, true).is_none());
        assert!(!disk.intersect_test(&through_hole, true));

        let on_ring = Ray::new(point3f!(0.5, 0, -3), vec3f!(0, 0, 1));
        assert!(disk.intersect(&on_ring, true).is_some());
    }

    #[test]
    fn parallel_ray_misses() {
        let t = Transform::identity();
        let t_inv = t.inverse();
        let disk = Disk::new(&t, &t_inv, false, 0.0, 1.0, 0.0, 360.0);

        let ray = Ray::new(point3f!(-3, 0, 0.5), vec3f!(1, 0, 0));
        assert!(disk.intersect(&ray, true).is_none());
        assert!(!disk.intersect_test(&ray, true));
    }

    #[test]
    fn partial_sweep_clips_hits() {
        let t = Transform::identity();
        let t_inv = t.inverse();
        // half disk covering phi in [0, 180]
        let disk = Disk::new(&t, &t_inv, false, 0.0, 1.0, 0.0, 180.0);

        let upper = Ray::new(point3f!(0, 0.5, -3), vec3f!(0, 0, 1));
        assert!(disk.intersect(&upper, true).is_some());

        let lower = Ray::new(point3f!(0, -0.5, -3), vec3f!(0, 0, 1));
        assert!(disk.intersect(&lower, true).is_none());
    }

    #[test]
    fn area_of_annulus() {
        let t = Transform::identity();
        let t_inv = t.inverse();
        let disk = Disk::new(&t, &t_inv, false, 0.0, 2.0, 1.0, 360.0);
        assert_relative_eq!(disk.area(), PI * (4.0 - 1.0), epsilon = 1e-4);
    }

    #[test]
    fn samples_lie_on_disk_with_area_pdf() {
        let t = Transform::translate(vec3f!(0, 0, 4));
        let t_inv = t.inverse();
        let disk = Disk::new(&t, &t_inv, false, 0.0, 1.0, 0.0, 360.0);

        let (it, pdf) = disk.sample(Point2f::new(0.3, 0.8));
        assert_abs_diff_eq!(it.p.z, 4.0, epsilon = 1e-5);
        assert!(it.p.x * it.p.x + it.p.y * it.p.y <= 1.0 + 1e-5);
        assert_relative_eq!(pdf, 1.0 / disk.area(), epsilon = 1e-6);
        assert_abs_diff_eq!(it.n.z, 1.0, epsilon = 1e-6);
    }
}
