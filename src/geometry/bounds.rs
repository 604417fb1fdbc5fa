use crate::err_float::gamma;
use crate::{Float, Ray, Scalar};
use cgmath::{Point3, Vector3};

/// Axis-aligned box, kept as the component-wise min and max of its corners.
/// An empty box has min > max in every dimension so that unioning into it
/// works without a special case.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds3<S: Scalar> {
    pub min: Point3<S>,
    pub max: Point3<S>
}

pub type Bounds3f = Bounds3<Float>;

impl<S: Scalar> Bounds3<S> {

    pub fn empty() -> Self {
        Self {
            min: Point3::new(S::max_value(), S::max_value(), S::max_value()),
            max: Point3::new(S::min_value(), S::min_value(), S::min_value()),
        }
    }

    pub fn with_bounds(min: Point3<S>, max: Point3<S>) -> Self {
        Self { min, max }
    }

    pub fn union_point(self, p: Point3<S>) -> Self {
        Self {
            min: Point3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z)),
            max: Point3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z)),
        }
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: Point3::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y), self.min.z.min(other.min.z)),
            max: Point3::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y), self.max.z.max(other.max.z)),
        }
    }

    /// Corner `i` of the box, with bit k of `i` selecting min (0) or max (1)
    /// along dimension k.
    pub fn corner(&self, i: usize) -> Point3<S> {
        debug_assert!(i < 8);
        Point3::new(
            if i & 1 == 0 { self.min.x } else { self.max.x },
            if i & 2 == 0 { self.min.y } else { self.max.y },
            if i & 4 == 0 { self.min.z } else { self.max.z },
        )
    }

    pub fn diagonal(&self) -> Vector3<S> {
        self.max - self.min
    }

    pub fn surface_area(&self) -> S {
        let d = self.diagonal();
        let half = d.x * d.y + d.y * d.z + d.z * d.x;
        half + half
    }

    pub fn contains(&self, p: Point3<S>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x
            && p.y >= self.min.y && p.y <= self.max.y
            && p.z >= self.min.z && p.z <= self.max.z
    }
}

impl Bounds3f {
    pub fn center(&self) -> crate::Point3f {
        self.min + self.diagonal() / 2.0
    }

    pub fn expand(self, delta: Float) -> Self {
        let d = Vector3::new(delta, delta, delta);
        Self {
            min: self.min - d,
            max: self.max + d,
        }
    }

    /// Slab test against the ray's `[0, t_max]` range. The far intersection
    /// is padded by 2*gamma(3) so that rays grazing a slab exactly are kept
    /// rather than dropped.
    pub fn intersect_p(&self, ray: &Ray) -> Option<(Float, Float)> {
        let mut t0: Float = 0.0;
        let mut t1 = ray.t_max;
        for i in 0..3 {
            let inv_dir = 1.0 / ray.dir[i];
            let mut t_near = (self.min[i] - ray.origin[i]) * inv_dir;
            let mut t_far = (self.max[i] - ray.origin[i]) * inv_dir;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            t_far *= 1.0 + 2.0 * gamma(3);

            if t_near > t0 { t0 = t_near }
            if t_far < t1 { t1 = t_far }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point3f, Ray};
    use pretty_assertions::assert_eq;

    #[test]
    fn union_and_corners() {
        let b = Bounds3f::empty()
            .union_point(point3f!(1, 2, 3))
            .union_point(point3f!(-1, 0, 5));
        assert_eq!(b, bounds3f!((-1, 0, 3), (1, 2, 5)));

        let corners: Vec<Point3f> = (0..8).map(|i| b.corner(i)).collect();
        assert!(corners.contains(&point3f!(-1, 0, 3)));
        assert!(corners.contains(&point3f!(1, 2, 5)));
        for i in 0..8 {
            assert!(b.contains(b.corner(i)));
        }
    }

    #[test]
    fn union_of_boxes() {
        let a = bounds3f!((0, 0, 0), (1, 1, 1));
        let b = bounds3f!((2, -1, 0), (3, 0, 1));
        assert_eq!(a.union(b), bounds3f!((0, -1, 0), (3, 1, 1)));
    }

    #[test]
    fn surface_area_and_diagonal() {
        let b = bounds3f!((0, 0, 0), (1, 2, 3));
        assert_eq!(b.diagonal(), vec3f!(1, 2, 3));
        assert_eq!(b.surface_area(), 2.0 * (2.0 + 6.0 + 3.0));
        assert_eq!(b.center(), point3f!(0.5, 1.0, 1.5));
    }

    #[test]
    fn ray_slab_test() {
        let b = bounds3f!((-1, -1, -1), (1, 1, 1));

        let hit = b.intersect_p(&Ray::new(point3f!(0, 0, -5), vec3f!(0, 0, 1)));
        let (t0, t1) = hit.unwrap();
        assert!((t0 - 4.0).abs() < 1e-4);
        assert!((t1 - 6.0).abs() < 1e-3);

        // parallel to a slab, outside it
        assert!(b.intersect_p(&Ray::new(point3f!(0, 5, -5), vec3f!(0, 0, 1))).is_none());
        // pointing away
        assert!(b.intersect_p(&Ray::new(point3f!(0, 0, -5), vec3f!(0, 0, -1))).is_none());
        // origin inside
        assert!(b.intersect_p(&Ray::new(point3f!(0, 0, 0), vec3f!(1, 0, 0))).is_some());
    }

    #[test]
    fn expand_grows_symmetrically() {
        let b = bounds3f!((0, 0, 0), (1, 1, 1)).expand(0.5);
        assert_eq!(b, bounds3f!((-0.5, -0.5, -0.5), (1.5, 1.5, 1.5)));
    }
}
