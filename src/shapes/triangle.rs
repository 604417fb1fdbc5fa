use crate::err_float::gamma;
use crate::geometry::bounds::Bounds3f;
use crate::geometry::{coordinate_system, Normal3, Ray, Transform, Transformable};
use crate::interaction::{DiffGeom, Interaction, SurfaceInteraction};
use crate::sampling::uniform_sample_triangle;
use crate::shapes::Shape;
use crate::texture::AlphaMask;
use crate::{max_dimension, permute_point, permute_vec, ComponentWiseExt, Float, Point2f, Point3f, Vec3f};
use cgmath::{EuclideanSpace, InnerSpace, Zero};
use std::convert::TryInto;
use std::sync::Arc;

/// Shared vertex data for a whole mesh. Vertices and normals are transformed
/// to world space once at construction, so per-ray triangle tests skip the
/// object-space round trip entirely.
pub struct TriangleMesh<'t> {
    object_to_world: &'t Transform,
    world_to_object: &'t Transform,
    reverse_orientation: bool,
    transform_swaps_handedness: bool,

    pub n_triangles: u32,

    vertex_indices: Vec<u32>,

    vertices: Vec<Point3f>,

    normals: Option<Vec<Normal3>>,

    tex_coords: Option<Vec<Point2f>>,

    alpha_mask: Option<Arc<dyn AlphaMask>>,
}

impl<'t> TriangleMesh<'t> {
    pub fn new(
        object_to_world: &'t Transform,
        world_to_object: &'t Transform,
        reverse_orientation: bool,
        vertex_indices: Vec<u32>,
        mut vertices: Vec<Point3f>,
        mut normals: Option<Vec<Normal3>>,
        tex_coords: Option<Vec<Point2f>>,
        alpha_mask: Option<Arc<dyn AlphaMask>>,
    ) -> Self {
        assert_eq!(vertex_indices.len() % 3, 0);
        let n_triangles = vertex_indices.len() as u32 / 3;
        let n_vertices = vertices.len();

        for v in &mut vertices {
            let vt: Point3f = v.transform(*object_to_world);
            *v = vt;
        }

        if let Some(ref mut normals) = normals {
            assert_eq!(normals.len(), n_vertices);
            for n in normals.iter_mut() {
                *n = n.transform(*object_to_world);
            }
        }

        if let Some(ref tex_coords) = tex_coords {
            assert_eq!(tex_coords.len(), n_vertices);
        }

        Self {
            object_to_world,
            world_to_object,
            reverse_orientation,
            transform_swaps_handedness: object_to_world.swaps_handedness(),
            n_triangles,
            vertex_indices,
            vertices,
            normals,
            tex_coords,
            alpha_mask,
        }
    }

    pub fn triangle(&self, tri_id: u32) -> Triangle<'_> {
        Triangle::new(self, tri_id)
    }

    pub fn iter_triangles(&self) -> impl Iterator<Item = Triangle<'_>> {
        (0..self.n_triangles).map(move |id| Triangle::new(self, id))
    }
}

pub struct Triangle<'m> {
    mesh: &'m TriangleMesh<'m>,
    vertex_indices: &'m [u32; 3],
}

impl<'m> Triangle<'m> {
    pub fn new(mesh: &'m TriangleMesh<'m>, tri_id: u32) -> Self {
        assert!(tri_id < mesh.n_triangles);
        let idx = tri_id as usize * 3;
        let vertex_indices: &[u32; 3] = mesh.vertex_indices[idx..idx + 3].try_into().unwrap();

        Self {
            mesh,
            vertex_indices,
        }
    }

    fn vertices(&self) -> (Point3f, Point3f, Point3f) {
        let v = self.vertex_indices;
        (
            self.mesh.vertices[v[0] as usize],
            self.mesh.vertices[v[1] as usize],
            self.mesh.vertices[v[2] as usize],
        )
    }

    fn get_uvs(&self) -> [Point2f; 3] {
        self.mesh.tex_coords.as_ref().map_or_else(
            || [(0.0, 0.0).into(), (1.0, 0.0).into(), (1.0, 1.0).into()],
            |uvs| {
                let v = self.vertex_indices;
                [
                    uvs[v[0] as usize],
                    uvs[v[1] as usize],
                    uvs[v[2] as usize]
                ]
            }
        )
    }

    /// Watertight ray/triangle test. The ray is transformed so that it
    /// starts at the origin pointing along +z; the triangle follows, and the
    /// test reduces to 2D edge functions around (0, 0). Returns the hit
    /// parameter and barycentric coordinates.
    fn intersect_coords(&self, ray: &Ray) -> Option<(Float, Float, Float, Float)> {
        let (p0, p1, p2) = self.vertices();

        // translate vertices based on ray origin
        let mut p0t = p0 - ray.origin.to_vec();
        let mut p1t = p1 - ray.origin.to_vec();
        let mut p2t = p2 - ray.origin.to_vec();

        // permute components of triangle vertices and ray dir so z is the
        // dominant direction
        let kz = max_dimension(ray.dir.abs());
        let kx = (kz + 1) % 3;
        let ky = (kx + 1) % 3;
        let dir = permute_vec(ray.dir, kx, ky, kz);
        p0t = permute_point(p0t, kx, ky, kz);
        p1t = permute_point(p1t, kx, ky, kz);
        p2t = permute_point(p2t, kx, ky, kz);

        // Apply a shear transformation to align the ray with the +z axis.
        // Only shear the x and y dimensions at first; the z shear can wait
        // until a hit is confirmed.
        let shear_x = -dir.x / dir.z;
        let shear_y = -dir.y / dir.z;
        let shear_z = 1.0 / dir.z;
        p0t.x += shear_x * p0t.z;
        p0t.y += shear_y * p0t.z;
        p1t.x += shear_x * p1t.z;
        p1t.y += shear_y * p1t.z;
        p2t.x += shear_x * p2t.z;
        p2t.y += shear_y * p2t.z;

        // compute edge function coefficients
        let mut e0 = p1t.x * p2t.y - p1t.y * p2t.x; // p1 to p2
        let mut e1 = p2t.x * p0t.y - p2t.y * p0t.x; // p2 to p0
        let mut e2 = p0t.x * p1t.y - p0t.y * p1t.x; // p0 to p1

        // an exactly-zero edge function means the ray grazes an edge;
        // recompute in double precision to decide the side consistently
        if e0 == 0.0 || e1 == 0.0 || e2 == 0.0 {
            e0 = (f64::from(p1t.x) * f64::from(p2t.y) - f64::from(p1t.y) * f64::from(p2t.x)) as Float;
            e1 = (f64::from(p2t.x) * f64::from(p0t.y) - f64::from(p2t.y) * f64::from(p0t.x)) as Float;
            e2 = (f64::from(p0t.x) * f64::from(p1t.y) - f64::from(p0t.y) * f64::from(p1t.x)) as Float;
        }

        // if the edge function signs differ, the point (0, 0) is not on the
        // same side of all three edges and therefore lies outside
        if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
            return None;
        }
        let det = e0 + e1 + e2;
        if det == 0.0 {
            return None;
        }

        // Compute scaled hit distance to triangle and test against ray t range
        p0t.z *= shear_z;
        p1t.z *= shear_z;
        p2t.z *= shear_z;
        let t_scaled = e0 * p0t.z + e1 * p1t.z + e2 * p2t.z;
        if det < 0.0 && (t_scaled >= 0.0 || t_scaled < ray.t_max * det) {
            return None;
        } else if det > 0.0 && (t_scaled <= 0.0 || t_scaled > ray.t_max * det) {
            return None;
        }

        // a valid hit; compute barycentric coordinates and the actual t
        let inv_det = 1.0 / det;
        let b0 = e0 * inv_det;
        let b1 = e1 * inv_det;
        let b2 = e2 * inv_det;
        let t = t_scaled * inv_det;

        Some((t, b0, b1, b2))
    }

    fn interpolated_uv(&self, b0: Float, b1: Float, b2: Float) -> Point2f {
        let uv = self.get_uvs();
        Point2f::from_vec(uv[0].to_vec() * b0 + uv[1].to_vec() * b1 + uv[2].to_vec() * b2)
    }

    fn alpha_masked(&self, uv_hit: Point2f) -> bool {
        self.mesh
            .alpha_mask
            .as_ref()
            .map_or(false, |mask| mask.is_transparent(uv_hit))
    }
}

impl<'m> Shape for Triangle<'m> {
    fn object_bound(&self) -> Bounds3f {
        let (p0, p1, p2) = self.vertices();
        let p0o: Point3f = p0.transform(*self.mesh.world_to_object);
        let p1o: Point3f = p1.transform(*self.mesh.world_to_object);
        let p2o: Point3f = p2.transform(*self.mesh.world_to_object);
        Bounds3f::with_bounds(p0o, p0o).union_point(p1o).union_point(p2o)
    }

    fn world_bound(&self) -> Bounds3f {
        let (p0, p1, p2) = self.vertices();
        Bounds3f::with_bounds(p0, p0).union_point(p1).union_point(p2)
    }

    fn object_to_world(&self) -> &Transform {
        self.mesh.object_to_world
    }

    fn world_to_object(&self) -> &Transform {
        self.mesh.world_to_object
    }

    fn reverse_orientation(&self) -> bool {
        self.mesh.reverse_orientation
    }

    fn transform_swaps_handedness(&self) -> bool {
        self.mesh.transform_swaps_handedness
    }

    fn intersect(&self, ray: &Ray, test_alpha_texture: bool) -> Option<(Float, SurfaceInteraction)> {
        let (t, b0, b1, b2) = self.intersect_coords(ray)?;

        let uv_hit = self.interpolated_uv(b0, b1, b2);
        if test_alpha_texture && self.alpha_masked(uv_hit) {
            return None;
        }

        let (p0, p1, p2) = self.vertices();

        // triangle partial derivatives from the uv parametrization
        let uv = self.get_uvs();
        let duv02 = uv[0] - uv[2];
        let duv12 = uv[1] - uv[2];
        let dp02 = p0 - p2;
        let dp12 = p1 - p2;

        let determinant = duv02[0] * duv12[1] - duv02[1] * duv12[0];

        let (dpdu, dpdv) = if determinant == 0.0 {
            // degenerate parametrization; any tangent frame around the
            // geometric normal will do
            coordinate_system(dp02.cross(dp12).normalize())
        } else {
            let inv_det = 1.0 / determinant;
            let dpdu = (dp02 * duv12[1] - dp12 * duv02[1]) * inv_det;
            let dpdv = (dp02 * -duv12[0] + dp12 * duv02[0]) * inv_det;
            (dpdu, dpdv)
        };

        // interpolate the hit point with the barycentrics; the rounding
        // error of that interpolation is bounded by gamma(7)
        let p_hit = Point3f::from_vec(p0.to_vec() * b0 + p1.to_vec() * b1 + p2.to_vec() * b2);
        let p_err = ((p0.to_vec() * b0).abs() + (p1.to_vec() * b1).abs() + (p2.to_vec() * b2).abs())
            * gamma(7);

        let mut n = Normal3(dp02.cross(dp12).normalize());
        if self.flips_normal_orientation() {
            n = -n;
        }

        let mut isect = SurfaceInteraction::new(
            p_hit,
            p_err,
            ray.time,
            uv_hit,
            -ray.dir,
            n,
            DiffGeom {
                dpdu,
                dpdv,
                dndu: Normal3::new(0.0, 0.0, 0.0),
                dndv: Normal3::new(0.0, 0.0, 0.0),
            },
        );

        if let Some(normals) = &self.mesh.normals {
            let v = self.vertex_indices;
            let n0 = normals[v[0] as usize];
            let n1 = normals[v[1] as usize];
            let n2 = normals[v[2] as usize];

            let mut ns = n0.0 * b0 + n1.0 * b1 + n2.0 * b2;
            if ns.magnitude2() > 0.0 {
                ns = ns.normalize();
            } else {
                ns = isect.n.0;
            }
            if self.flips_normal_orientation() {
                ns = -ns;
            }

            // shading normal derivatives from the same uv deltas
            let (dndu, dndv) = if determinant == 0.0 {
                (Normal3::new(0.0, 0.0, 0.0), Normal3::new(0.0, 0.0, 0.0))
            } else {
                let inv_det = 1.0 / determinant;
                let dn02 = n0.0 - n2.0;
                let dn12 = n1.0 - n2.0;
                (
                    Normal3((dn02 * duv12[1] - dn12 * duv02[1]) * inv_det),
                    Normal3((dn02 * -duv12[0] + dn12 * duv02[0]) * inv_det),
                )
            };

            // rebuild the tangent frame around the shading normal
            let mut ss = isect.geom.dpdu.normalize();
            let mut ts = ss.cross(ns);
            if ts.magnitude2() > 0.0 {
                ts = ts.normalize();
                ss = ts.cross(ns);
            } else {
                let (s, t_vec) = coordinate_system(ns);
                ss = s;
                ts = t_vec;
            }

            isect.set_shading_geometry(
                Normal3(ns),
                DiffGeom { dpdu: ss, dpdv: ts, dndu, dndv },
                true,
            );
        }

        Some((t, isect))
    }

    fn intersect_test(&self, ray: &Ray, test_alpha_texture: bool) -> bool {
        match self.intersect_coords(ray) {
            None => false,
            Some((_t, b0, b1, b2)) => {
                if test_alpha_texture && self.mesh.alpha_mask.is_some() {
                    !self.alpha_masked(self.interpolated_uv(b0, b1, b2))
                } else {
                    true
                }
            }
        }
    }

    fn area(&self) -> Float {
        let (p0, p1, p2) = self.vertices();
        0.5 * (p1 - p0).cross(p2 - p0).magnitude()
    }

    fn sample(&self, u: Point2f) -> (Interaction, Float) {
        let b = uniform_sample_triangle(u);
        let (p0, p1, p2) = self.vertices();
        let b2 = 1.0 - b.x - b.y;

        let p = Point3f::from_vec(p0.to_vec() * b.x + p1.to_vec() * b.y + p2.to_vec() * b2);

        let mut n = Normal3((p1 - p0).cross(p2 - p0).normalize());
        if let Some(normals) = &self.mesh.normals {
            let v = self.vertex_indices;
            let ns = normals[v[0] as usize].0 * b.x
                + normals[v[1] as usize].0 * b.y
                + normals[v[2] as usize].0 * b2;
            n = n.faceforward(ns);
        } else if self.flips_normal_orientation() {
            n = -n;
        }

        let p_err = ((p0.to_vec() * b.x).abs() + (p1.to_vec() * b.y).abs() + (p2.to_vec() * b2).abs())
            * gamma(6);

        let it = Interaction { p, p_err, time: 0.0, wo: Vec3f::zero(), n };
        (it, 1.0 / self.area())
    }
}
