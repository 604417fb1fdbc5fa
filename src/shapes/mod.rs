use crate::fast_rand;
use crate::geometry::bounds::Bounds3f;
use crate::geometry::{distance_squared, Ray, Transform, Transformable};
use crate::interaction::{Interaction, SurfaceInteraction};
use crate::{Float, Point2f, Point3f, Vec3f};
use cgmath::{InnerSpace, Zero};

pub mod disk;
pub mod sphere;
pub mod triangle;

pub use disk::Disk;
pub use sphere::Sphere;
pub use triangle::{Triangle, TriangleMesh};

pub const DEFAULT_SOLID_ANGLE_SAMPLES: u32 = 512;

/// The capability set every geometric primitive provides: bounding,
/// intersection, area, and sampling queries. Rays come in and interactions
/// go out in world space; each shape converts through its object-to-world
/// transform pair internally.
///
/// Shapes are immutable after construction, so every method is a pure query
/// and unsynchronized concurrent access from render workers is safe.
pub trait Shape {
    /// Bounding box in the shape's own coordinate system.
    fn object_bound(&self) -> Bounds3f;

    /// Bounding box in world space. Transforming the object bound is always
    /// correct; shapes that can bound themselves more tightly in world space
    /// should override.
    fn world_bound(&self) -> Bounds3f {
        self.object_bound().transform(*self.object_to_world())
    }

    fn object_to_world(&self) -> &Transform;

    fn world_to_object(&self) -> &Transform;

    fn reverse_orientation(&self) -> bool;

    /// Whether `object_to_world` mirrors space, fixed at construction from
    /// the sign of its determinant.
    fn transform_swaps_handedness(&self) -> bool;

    /// The geometric normal is negated when exactly one of
    /// `reverse_orientation` and `transform_swaps_handedness` holds.
    fn flips_normal_orientation(&self) -> bool {
        self.reverse_orientation() ^ self.transform_swaps_handedness()
    }

    /// Finds the nearest intersection along `ray` within `[0, ray.t_max]`,
    /// returning the hit distance and the surface interaction in world
    /// space. `None` is the ordinary miss outcome, not an error.
    ///
    /// When `test_alpha_texture` is set, hits landing on transparent parts
    /// of an alpha-masked surface are discarded; occlusion queries that
    /// handle masking elsewhere pass false.
    fn intersect(&self, ray: &Ray, test_alpha_texture: bool) -> Option<(Float, SurfaceInteraction)>;

    /// Existence-only intersection test. Shapes override this with a test
    /// that skips the interaction bookkeeping; computing none of the surface
    /// derivatives is the entire point of having a separate method.
    fn intersect_test(&self, ray: &Ray, test_alpha_texture: bool) -> bool {
        self.intersect(ray, test_alpha_texture).is_some()
    }

    /// Surface area in object space.
    fn area(&self) -> Float;

    /// Samples a point on the surface uniformly with respect to area, given
    /// a variate `u` in `[0,1)^2`. Returns the sampled point and its density
    /// with respect to surface area.
    fn sample(&self, u: Point2f) -> (Interaction, Float);

    /// Density (w.r.t. area) with which `sample` produces points.
    fn pdf(&self, _it: &Interaction) -> Float {
        1.0 / self.area()
    }

    /// Samples a point on the surface as seen from `reference`, returning
    /// the density with respect to solid angle at the reference point.
    /// Shapes with a closed-form directional distribution override this for
    /// lower variance.
    fn sample_from(&self, reference: &Interaction, u: Point2f) -> (Interaction, Float) {
        sample_by_area(self, reference, u)
    }

    /// Solid-angle density of `sample_from` producing the direction `wi`
    /// from `reference`. Zero when the direction misses the shape.
    fn pdf_from(&self, reference: &Interaction, wi: Vec3f) -> Float {
        pdf_by_ray_cast(self, reference, wi)
    }

    /// Solid angle the shape subtends at the world-space point `p`.
    /// The default is a Monte Carlo estimate over `n_samples` draws of the
    /// `sample_from` scheme; shapes with closed forms override it.
    fn solid_angle(&self, p: Point3f, n_samples: u32) -> Float {
        estimate_solid_angle(self, p, n_samples)
    }
}

/// Area-uniform sampling seen from a reference point: draw by area, then
/// reweight the density by `r^2 / |cos theta|` to measure it per solid
/// angle. Degenerate draws (coincident points, grazing normals) come back
/// with a zero pdf and must be discarded by the caller.
pub fn sample_by_area<S: Shape + ?Sized>(
    shape: &S,
    reference: &Interaction,
    u: Point2f,
) -> (Interaction, Float) {
    let (intr, mut pdf) = shape.sample(u);
    let wi = intr.p - reference.p;
    if wi.magnitude2() == 0.0 {
        pdf = 0.0;
    } else {
        let wi = wi.normalize();
        pdf *= distance_squared(reference.p, intr.p) / intr.n.dot(-wi).abs();
        if !pdf.is_finite() {
            pdf = 0.0;
        }
    }
    (intr, pdf)
}

/// Solid-angle pdf of the area-uniform scheme for an arbitrary direction:
/// intersect the shape and apply the same change-of-variables factor at the
/// hit point.
pub fn pdf_by_ray_cast<S: Shape + ?Sized>(shape: &S, reference: &Interaction, wi: Vec3f) -> Float {
    let ray = reference.spawn_ray(wi);
    match shape.intersect(&ray, false) {
        None => 0.0,
        Some((_t_hit, isect)) => {
            let pdf = distance_squared(reference.p, isect.hit.p)
                / (isect.n.dot(-wi).abs() * shape.area());
            if pdf.is_finite() { pdf } else { 0.0 }
        }
    }
}

/// Monte Carlo solid-angle estimate: average the reciprocal pdf of
/// `sample_from` draws, counting draws whose sampled point is occluded by
/// the shape itself as zero.
pub fn estimate_solid_angle<S: Shape + ?Sized>(shape: &S, p: Point3f, n_samples: u32) -> Float {
    let reference = Interaction {
        p,
        p_err: Vec3f::zero(),
        time: 0.0,
        wo: Vec3f::new(0.0, 0.0, 1.0),
        n: crate::Normal3(Vec3f::zero()),
    };
    let mut solid_angle = 0.0f64;
    for _ in 0..n_samples {
        let u = Point2f::new(fast_rand::rand(), fast_rand::rand());
        let (p_shape, pdf) = shape.sample_from(&reference, u);
        if pdf > 0.0 {
            let ray = Ray {
                origin: p,
                dir: p_shape.p - p,
                t_max: 0.999,
                time: reference.time,
            };
            if !shape.intersect_test(&ray, true) {
                solid_angle += 1.0 / f64::from(pdf);
            }
        }
    }
    (solid_angle / f64::from(n_samples)) as Float
}
