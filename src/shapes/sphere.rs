use crate::err_float::gamma;
use crate::geometry::bounds::Bounds3f;
use crate::geometry::{
    coordinate_system, distance, distance_squared, offset_ray_origin, spherical_direction,
    Normal3, Ray, Transform, Transformable,
};
use crate::interaction::{DiffGeom, Interaction, SurfaceInteraction};
use crate::math::{lerp, quadratic};
use crate::sampling::{uniform_cone_pdf, uniform_sample_sphere};
use crate::shapes::{pdf_by_ray_cast, sample_by_area, Shape};
use crate::{ComponentWiseExt, EFloat, Float, Point2f, Point3f, Vec3f};
use cgmath::{EuclideanSpace, InnerSpace, Zero};
use std::f32::consts::PI;

/// A sphere of given radius about the object-space origin, optionally
/// clipped to `[z_min, z_max]` and to a maximum sweep angle `phi_max`.
pub struct Sphere<'t> {
    object_to_world: &'t Transform,
    world_to_object: &'t Transform,
    reverse_orientation: bool,
    transform_swaps_handedness: bool,

    radius: Float,
    z_min: Float,
    z_max: Float,
    theta_min: Float,
    theta_max: Float,
    phi_max: Float
}

impl<'t> Sphere<'t> {
    pub fn new(
        object_to_world: &'t Transform,
        world_to_object: &'t Transform,
        reverse_orientation: bool,
        radius: Float,
        z_min: Float,
        z_max: Float,
        phi_max: Float
    ) -> Self {
        debug_assert!(radius > 0.0);
        Self {
            object_to_world,
            world_to_object,
            reverse_orientation,
            transform_swaps_handedness: object_to_world.swaps_handedness(),
            radius,
            z_min: Float::min(z_min, z_max).clamp(-radius, radius),
            z_max: Float::max(z_min, z_max).clamp(-radius, radius),
            theta_min: Float::clamp(Float::min(z_min, z_max) / radius, -1.0, 1.0).acos(),
            theta_max: Float::clamp(Float::max(z_min, z_max) / radius, -1.0, 1.0).acos(),
            phi_max: phi_max.clamp(0.0, 360.0).to_radians()
        }
    }

    /// A whole sphere, no clipping.
    pub fn full(
        object_to_world: &'t Transform,
        world_to_object: &'t Transform,
        reverse_orientation: bool,
        radius: Float,
    ) -> Self {
        Self::new(object_to_world, world_to_object, reverse_orientation, radius, -radius, radius, 360.0)
    }

    /// Solves the sphere quadratic for an object-space ray carrying
    /// transform error bounds, then applies the z/phi clip tests. Produces
    /// the accepted hit parameter, the reprojected hit point, and its phi
    /// angle.
    fn clip_hit(&self, ray: &Ray, origin_err: Vec3f, dir_err: Vec3f) -> Option<(EFloat, Point3f, Float)> {
        let (t0, t1) = self.quadratic_roots(ray, origin_err, dir_err)?;

        if t0.upper_bound() > ray.t_max || t1.lower_bound() <= 0.0 {
            return None;
        }

        // find the closest valid intersection t value
        let mut t_shape_hit = t0;
        if t_shape_hit.lower_bound() <= 0.0 {
            t_shape_hit = t1;
            if t_shape_hit.upper_bound() > ray.t_max {
                return None;
            }
        }

        let (mut p_hit, mut phi) = self.refine_hit(ray, t_shape_hit);

        // test against clipping parameters
        if self.hit_clipped_away(p_hit, phi) {
            if t_shape_hit == t1 { return None; }
            if t1.upper_bound() > ray.t_max { return None; }

            t_shape_hit = t1;
            let refined = self.refine_hit(ray, t_shape_hit);
            p_hit = refined.0;
            phi = refined.1;

            // the second root can be clipped away too
            if self.hit_clipped_away(p_hit, phi) {
                return None;
            }
        }

        Some((t_shape_hit, p_hit, phi))
    }

    fn quadratic_roots(&self, ray: &Ray, origin_err: Vec3f, dir_err: Vec3f) -> Option<(EFloat, EFloat)> {
        let ox = EFloat::with_err(ray.origin.x, origin_err.x);
        let oy = EFloat::with_err(ray.origin.y, origin_err.y);
        let oz = EFloat::with_err(ray.origin.z, origin_err.z);
        let dx = EFloat::with_err(ray.dir.x, dir_err.x);
        let dy = EFloat::with_err(ray.dir.y, dir_err.y);
        let dz = EFloat::with_err(ray.dir.z, dir_err.z);

        let a = dx * dx + dy * dy + dz * dz;
        let b = 2.0 * (dx * ox + dy * oy + dz * oz);
        let c = ox * ox + oy * oy + oz * oz - EFloat::new(self.radius) * EFloat::new(self.radius);

        quadratic(a, b, c)
    }

    /// Reprojects the hit onto the sphere and computes its phi angle.
    fn refine_hit(&self, ray: &Ray, t: EFloat) -> (Point3f, Float) {
        let mut p_hit = ray.at(t.into());
        p_hit *= self.radius / distance(p_hit, Point3f::origin());
        if p_hit.x == 0.0 && p_hit.y == 0.0 { p_hit.x = 1.0e-5 * self.radius }
        let mut phi = Float::atan2(p_hit.y, p_hit.x);
        if phi < 0.0 { phi += 2.0 * PI }
        (p_hit, phi)
    }

    fn hit_clipped_away(&self, p_hit: Point3f, phi: Float) -> bool {
        (self.z_min > -self.radius && p_hit.z < self.z_min)
            || (self.z_max < self.radius && p_hit.z > self.z_max)
            || phi > self.phi_max
    }

    fn world_center(&self) -> Point3f {
        Point3f::origin().transform(*self.object_to_world)
    }
}

impl<'t> Shape for Sphere<'t> {
    fn object_bound(&self) -> Bounds3f {
        bounds3f!((-self.radius, -self.radius, self.z_min), (self.radius, self.radius, self.z_max))
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

    #[allow(non_snake_case)]
    fn intersect(&self, ray: &Ray, _test_alpha_texture: bool) -> Option<(Float, SurfaceInteraction)> {
        let (ray, origin_err, dir_err): (Ray, Vec3f, Vec3f) = ray.transform(*self.world_to_object);

        let (t_shape_hit, p_hit, phi) = self.clip_hit(&ray, origin_err, dir_err)?;

        let u = phi / self.phi_max;
        let theta = Float::acos((p_hit.z / self.radius).clamp(-1.0, 1.0));
        let v = (theta - self.theta_min) / (self.theta_max - self.theta_min);

        let z_radius = (p_hit.x * p_hit.x + p_hit.y * p_hit.y).sqrt();
        let inv_z_radius = 1.0 / z_radius;
        let cos_phi = p_hit.x * inv_z_radius;
        let sin_phi = p_hit.y * inv_z_radius;

        let dpdu = vec3f!(-self.phi_max * p_hit.y, self.phi_max * p_hit.x, 0.0);
        let dpdv = (self.theta_max - self.theta_min) *
            vec3f!(p_hit.z * cos_phi, p_hit.z * sin_phi, -self.radius * theta.sin());

        let d2pduu = (-self.phi_max * self.phi_max) * vec3f!(p_hit.x, p_hit.y, 0.0);
        let d2pduv = (self.theta_max - self.theta_min) * p_hit.z * self.phi_max * vec3f!(-sin_phi, cos_phi, 0.0);
        let d2pdvv = -(self.theta_max - self.theta_min) * (self.theta_max - self.theta_min) *
            vec3f!(p_hit.x, p_hit.y, p_hit.z);

        // first and second fundamental forms give the normal derivatives
        let E = dpdu.dot(dpdu);
        let F = dpdu.dot(dpdv);
        let G = dpdv.dot(dpdv);

        let N = dpdu.cross(dpdv).normalize();

        let e = N.dot(d2pduu);
        let f = N.dot(d2pduv);
        let g = N.dot(d2pdvv);

        let invEGF2 = 1.0 / (E * G - F * F);

        let dndu = Normal3((f * F - e * G) * invEGF2 * dpdu + (e * F - f * E) * invEGF2 * dpdv);
        let dndv = Normal3((g * F - f * G) * invEGF2 * dpdu + (f * F - g * E) * invEGF2 * dpdv);

        let mut n = Normal3(N);
        if self.flips_normal_orientation() {
            n = -n;
        }

        let p_err: Vec3f = (p_hit - Point3f::origin()).abs() * gamma(5);

        let interact = SurfaceInteraction::new(
            p_hit,
            p_err,
            ray.time,
            Point2f::new(u, v),
            -ray.dir,
            n,
            DiffGeom { dpdu, dpdv, dndu, dndv }
        );

        let world_interact = interact.transform(*self.object_to_world);

        Some((t_shape_hit.into(), world_interact))
    }

    fn intersect_test(&self, ray: &Ray, _test_alpha_texture: bool) -> bool {
        let (ray, origin_err, dir_err): (Ray, Vec3f, Vec3f) = ray.transform(*self.world_to_object);
        self.clip_hit(&ray, origin_err, dir_err).is_some()
    }

    fn area(&self) -> Float {
        self.phi_max * self.radius * (self.z_max - self.z_min)
    }

    fn sample(&self, u: Point2f) -> (Interaction, Float) {
        let mut p_obj = Point3f::origin() + uniform_sample_sphere(u) * self.radius;

        let mut n: Normal3 = Normal3(p_obj.to_vec())
            .transform(*self.object_to_world)
            .normalize()
            .into();
        if self.reverse_orientation {
            n = -n;
        }

        // reproject onto the sphere; the residual is bounded by gamma(5)
        p_obj *= self.radius / distance(p_obj, Point3f::origin());
        let p_obj_err = p_obj.to_vec().abs() * gamma(5);
        let (p, p_err): (Point3f, Vec3f) = (p_obj, p_obj_err).transform(*self.object_to_world);

        let it = Interaction { p, p_err, time: 0.0, wo: Vec3f::zero(), n };
        (it, 1.0 / self.area())
    }

    fn sample_from(&self, reference: &Interaction, u: Point2f) -> (Interaction, Float) {
        let p_center = self.world_center();

        // from inside the sphere the whole surface is visible, so fall back
        // to area sampling
        let p_origin = offset_ray_origin(
            &reference.p,
            &reference.p_err,
            &reference.n,
            &(p_center - reference.p),
        );
        if distance_squared(p_origin, p_center) <= self.radius * self.radius {
            return sample_by_area(self, reference, u);
        }

        // otherwise sample uniformly inside the cone the sphere subtends
        let dc = distance(reference.p, p_center);
        let inv_dc = 1.0 / dc;
        let wc = (p_center - reference.p) * inv_dc;
        let (wc_x, wc_y) = coordinate_system(wc);

        let sin_theta_max2 = self.radius * self.radius * inv_dc * inv_dc;
        let cos_theta_max = Float::sqrt(Float::max(0.0, 1.0 - sin_theta_max2));
        let cos_theta = lerp(u.x, 1.0, cos_theta_max);
        let sin_theta = Float::sqrt(Float::max(0.0, 1.0 - cos_theta * cos_theta));
        let phi = u.y * 2.0 * PI;

        // distance to the sampled point and the sphere-surface angle alpha
        let ds = dc * cos_theta
            - Float::sqrt(Float::max(0.0, self.radius * self.radius - dc * dc * sin_theta * sin_theta));
        let cos_alpha = (dc * dc + self.radius * self.radius - ds * ds) / (2.0 * dc * self.radius);
        let sin_alpha = Float::sqrt(Float::max(0.0, 1.0 - cos_alpha * cos_alpha));

        let n_world = spherical_direction(sin_alpha, cos_alpha, phi, -wc_x, -wc_y, -wc);
        let p_world = p_center + n_world * self.radius;

        let mut n = Normal3(n_world);
        if self.reverse_orientation {
            n = -n;
        }
        let p_err = p_world.to_vec().abs() * gamma(5);

        let it = Interaction {
            p: p_world,
            p_err,
            time: reference.time,
            wo: Vec3f::zero(),
            n,
        };
        (it, uniform_cone_pdf(cos_theta_max))
    }

    fn pdf_from(&self, reference: &Interaction, wi: Vec3f) -> Float {
        let p_center = self.world_center();
        let p_origin = offset_ray_origin(
            &reference.p,
            &reference.p_err,
            &reference.n,
            &(p_center - reference.p),
        );
        if distance_squared(p_origin, p_center) <= self.radius * self.radius {
            return pdf_by_ray_cast(self, reference, wi);
        }

        let sin_theta_max2 = self.radius * self.radius / distance_squared(reference.p, p_center);
        let cos_theta_max = Float::sqrt(Float::max(0.0, 1.0 - sin_theta_max2));
        uniform_cone_pdf(cos_theta_max)
    }

    fn solid_angle(&self, p: Point3f, _n_samples: u32) -> Float {
        let p_center = self.world_center();
        if distance_squared(p, p_center) <= self.radius * self.radius {
            return 4.0 * PI;
        }
        let sin_theta_max2 = self.radius * self.radius / distance_squared(p, p_center);
        let cos_theta_max = Float::sqrt(Float::max(0.0, 1.0 - sin_theta_max2));
        2.0 * PI * (1.0 - cos_theta_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn axial_ray_hits_unit_sphere() {
        let t = Transform::identity();
        let t_inv = t.inverse();
        let sphere = Sphere::full(&t, &t_inv, false, 1.0);

        let ray = Ray::new(point3f!(0, 0, -5), vec3f!(0, 0, 1));
        let (t_hit, isect) = sphere.intersect(&ray, true).expect("ray must hit");

        assert_abs_diff_eq!(t_hit, 4.0, epsilon = 1e-4);
        assert_abs_diff_eq!(isect.hit.p.x, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(isect.hit.p.y, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(isect.hit.p.z, -1.0, epsilon = 1e-4);
        // outward normal faces the ray origin
        assert_abs_diff_eq!(isect.n.z, -1.0, epsilon = 1e-3);
        assert!(sphere.intersect_test(&ray, true));
    }

    #[test]
    fn reverse_orientation_negates_normal() {
        let t = Transform::identity();
        let t_inv = t.inverse();
        let sphere = Sphere::full(&t, &t_inv, true, 1.0);

        let ray = Ray::new(point3f!(0, 0, -5), vec3f!(0, 0, 1));
        let (_, isect) = sphere.intersect(&ray, true).unwrap();
        assert_abs_diff_eq!(isect.n.z, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn translated_sphere_hit_distance_is_analytic() {
        let t = Transform::translate(vec3f!(0, 0, 10));
        let t_inv = t.inverse();
        let sphere = Sphere::full(&t, &t_inv, false, 2.0);

        let ray = Ray::new(point3f!(0, 0, 0), vec3f!(0, 0, 1));
        let (t_hit, isect) = sphere.intersect(&ray, true).unwrap();
        assert_abs_diff_eq!(t_hit, 8.0, epsilon = 1e-3);
        assert_abs_diff_eq!(isect.hit.p.z, 8.0, epsilon = 1e-3);
    }

    #[test]
    fn clipped_sphere_lets_axial_ray_through() {
        let t = Transform::identity();
        let t_inv = t.inverse();
        // band around the equator; both poles are open
        let sphere = Sphere::new(&t, &t_inv, false, 1.0, -0.5, 0.5, 360.0);

        let polar = Ray::new(point3f!(0, 0, -5), vec3f!(0, 0, 1));
        assert!(sphere.intersect(&polar, true).is_none());
        assert!(!sphere.intersect_test(&polar, true));

        let equatorial = Ray::new(point3f!(-5, 0, 0), vec3f!(1, 0, 0));
        assert!(sphere.intersect(&equatorial, true).is_some());
        assert!(sphere.intersect_test(&equatorial, true));
    }

    #[test]
    fn ray_behind_sphere_misses() {
        let t = Transform::identity();
        let t_inv = t.inverse();
        let sphere = Sphere::full(&t, &t_inv, false, 1.0);

        let ray = Ray::new(point3f!(0, 0, 5), vec3f!(0, 0, 1));
        assert!(sphere.intersect(&ray, true).is_none());
        assert!(!sphere.intersect_test(&ray, true));
    }

    #[test]
    fn t_max_limits_hits() {
        let t = Transform::identity();
        let t_inv = t.inverse();
        let sphere = Sphere::full(&t, &t_inv, false, 1.0);

        let mut ray = Ray::new(point3f!(0, 0, -5), vec3f!(0, 0, 1));
        ray.t_max = 3.0;
        assert!(sphere.intersect(&ray, true).is_none());
        assert!(!sphere.intersect_test(&ray, true));
    }

    #[test]
    fn area_of_full_and_partial_spheres() {
        let t = Transform::identity();
        let t_inv = t.inverse();

        let full = Sphere::full(&t, &t_inv, false, 2.0);
        assert_relative_eq!(full.area(), 4.0 * PI * 4.0, epsilon = 1e-3);

        let hemisphere = Sphere::new(&t, &t_inv, false, 1.0, 0.0, 1.0, 360.0);
        assert_relative_eq!(hemisphere.area(), 2.0 * PI, epsilon = 1e-4);
    }

    #[test]
    fn solid_angle_matches_small_angle_approximation() {
        let t = Transform::translate(vec3f!(0, 0, 100));
        let t_inv = t.inverse();
        let sphere = Sphere::full(&t, &t_inv, false, 1.0);

        // far away the sphere subtends ~ pi r^2 / d^2
        let omega = sphere.solid_angle(point3f!(0, 0, 0), 1);
        assert_relative_eq!(omega, PI / (100.0 * 100.0), max_relative = 5e-3);

        // from inside it is the full sphere of directions
        let inside = Sphere::full(&t, &t_inv, false, 1.0);
        assert_relative_eq!(inside.solid_angle(point3f!(0, 0, 100), 1), 4.0 * PI);
    }

    #[test]
    fn handedness_flag_tracks_transform() {
        let mirror = Transform::scale(-1.0, 1.0, 1.0);
        let mirror_inv = mirror.inverse();
        let sphere = Sphere::full(&mirror, &mirror_inv, false, 1.0);
        assert!(sphere.transform_swaps_handedness());
        assert!(sphere.flips_normal_orientation());

        let t = Transform::identity();
        let t_inv = t.inverse();
        let plain = Sphere::full(&t, &t_inv, false, 1.0);
        assert!(!plain.transform_swaps_handedness());
        assert!(!plain.flips_normal_orientation());
    }
}
