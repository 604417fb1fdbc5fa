#[macro_use] pub mod macros; // must stay at the top
pub mod err_float;
pub mod fast_rand;
pub mod geometry;
pub mod interaction;
pub mod math;
pub mod sampling;
pub mod shapes;
pub mod texture;

pub use err_float::EFloat;
pub use geometry::*;
pub use math::*;

use cgmath::{BaseNum, Point2, Point3, Vector2, Vector3};
use num::Bounded;

pub type Float = f32;

pub type Point2f = Point2<Float>;
pub type Point3f = Point3<Float>;
pub type Vec2f = Vector2<Float>;
pub type Vec3f = Vector3<Float>;

pub trait Scalar: BaseNum + Bounded {
    fn min(self, other: Self) -> Self;
    fn max(self, other: Self) -> Self;
}

impl Scalar for f32 {
    fn min(self, other: Self) -> Self {
        self.min(other)
    }

    fn max(self, other: Self) -> Self {
        self.max(other)
    }
}

impl Scalar for f64 {
    fn min(self, other: Self) -> Self {
        self.min(other)
    }

    fn max(self, other: Self) -> Self {
        self.max(other)
    }
}

pub trait ComponentWiseExt {
    fn abs(self) -> Self;
}

impl ComponentWiseExt for Vec3f {
    fn abs(self) -> Self {
        self.map(Float::abs)
    }
}

pub fn max_dimension(v: Vec3f) -> usize {
    if v.x > v.y {
        if v.x > v.z { 0 } else { 2 }
    } else if v.y > v.z {
        1
    } else {
        2
    }
}

pub fn permute_vec(v: Vec3f, x: usize, y: usize, z: usize) -> Vec3f {
    Vec3f::new(v[x], v[y], v[z])
}

pub fn permute_point(p: Point3f, x: usize, y: usize, z: usize) -> Point3f {
    Point3f::new(p[x], p[y], p[z])
}
