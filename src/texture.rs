use crate::Point2f;

/// Alpha cutout lookup supplied by the texturing system. Intersection
/// routines consult it (when asked to) to discard hits that land on fully
/// transparent parts of a surface, keyed by the surface parametrization.
pub trait AlphaMask: Send + Sync {
    fn is_transparent(&self, uv: Point2f) -> bool;
}

impl<F> AlphaMask for F
where
    F: Fn(Point2f) -> bool + Send + Sync,
{
    fn is_transparent(&self, uv: Point2f) -> bool {
        self(uv)
    }
}
