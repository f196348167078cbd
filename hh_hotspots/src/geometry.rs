//! Ray, bounding box, and triangle-soup types shared by the BVH and the
//! intersection engine.

use glam::{Mat4, Vec3};

use crate::primitives::MeshPrimitive;

const PARALLEL_EPSILON: f32 = 1e-8;
/// Barycentric slack so rays through a shared edge or vertex hit at least
/// one of the adjacent triangles.
const EDGE_EPSILON: f32 = 1e-5;
/// Relative padding on slab bounds; keeps flat boxes from rejecting rays
/// that graze them.
const SLAB_EPSILON: f32 = 1e-5;

/// A ray in some coordinate space.
///
/// Rays built from a camera carry a unit direction, so `t` is a world
/// distance. [`Ray::transformed`] keeps the direction unnormalized so that a
/// hit parameter found in mesh-local space is still the world distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Build a ray with a unit direction from `origin` towards `through`.
    pub fn between(origin: Vec3, through: Vec3) -> Option<Self> {
        let direction = (through - origin).try_normalize()?;
        Some(Self { origin, direction })
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inverted box that any `include_point` call will snap to.
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut bounds = Self::empty();
        for point in points {
            bounds.include_point(point);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.min.min(other.min), self.max.max(other.max))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// Deterministic tie-break: prefer X, then Y, then Z.
    pub fn widest_axis(&self) -> usize {
        let size = self.size();
        if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        }
    }

    /// Bounds of the eight corners after applying `matrix`.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let corners = (0..8).map(|i| {
            Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            )
        });
        Aabb::from_points(corners.map(|corner| matrix.transform_point3(corner)))
    }

    /// Slab test. Returns the parameter where the ray enters the box, clamped
    /// to `t_min`, or `None` when the ray misses within `[t_min, t_max]`.
    pub fn ray_entry(&self, ray: &Ray, mut t_min: f32, mut t_max: f32) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            let pad = SLAB_EPSILON * (1.0 + (self.max[axis] - self.min[axis]).abs());
            let min = self.min[axis] - pad;
            let max = self.max[axis] + pad;

            if dir.abs() < 1e-12 {
                if origin < min || origin > max {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t1 = (min - origin) * inv;
            let mut t2 = (max - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }

            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_max < t_min {
                return None;
            }
        }

        Some(t_min)
    }
}

/// Indexed triangle soup in mesh-local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    pub positions: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            triangles,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn corners(&self, triangle: usize) -> [Vec3; 3] {
        let [a, b, c] = self.triangles[triangle];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(self.positions.iter().copied())
    }

    /// Unit face normal following the counter-clockwise winding, or zero for
    /// sliver triangles.
    pub fn face_normal(&self, triangle: usize) -> Vec3 {
        let [a, b, c] = self.corners(triangle);
        (b - a).cross(c - a).normalize_or_zero()
    }
}

impl From<&MeshPrimitive> for TriangleMesh {
    fn from(primitive: &MeshPrimitive) -> Self {
        let positions = primitive
            .vertices
            .iter()
            .map(|vertex| Vec3::from_array(vertex.position))
            .collect();
        let triangles = primitive
            .indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect();
        TriangleMesh::new(positions, triangles)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

/// Möller–Trumbore ray/triangle test, double-sided.
pub fn intersect_triangle(
    ray: &Ray,
    [a, b, c]: [Vec3; 3],
    t_min: f32,
    t_max: f32,
) -> Option<TriangleHit> {
    let edge1 = b - a;
    let edge2 = c - a;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = ray.origin - a;
    let u = s.dot(p) * inv_det;
    if !(-EDGE_EPSILON..=1.0 + EDGE_EPSILON).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < -EDGE_EPSILON || u + v > 1.0 + EDGE_EPSILON {
        return None;
    }

    let t = edge2.dot(q) * inv_det;
    if t < t_min || t > t_max {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> [Vec3; 3] {
        [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn triangle_hit_reports_distance_and_barycentrics() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, 2.0), Vec3::NEG_Z);
        let hit = intersect_triangle(&ray, unit_triangle(), 0.0, f32::MAX).expect("hit");
        assert!((hit.t - 2.0).abs() < 1e-6);
        assert!((hit.u - 0.25).abs() < 1e-6);
        assert!((hit.v - 0.25).abs() < 1e-6);
    }

    #[test]
    fn triangle_hit_is_double_sided() {
        let ray = Ray::new(Vec3::new(0.25, 0.25, -2.0), Vec3::Z);
        assert!(intersect_triangle(&ray, unit_triangle(), 0.0, f32::MAX).is_some());
    }

    #[test]
    fn triangle_miss_outside_edges_and_range() {
        let outside = Ray::new(Vec3::new(0.9, 0.9, 2.0), Vec3::NEG_Z);
        assert!(intersect_triangle(&outside, unit_triangle(), 0.0, f32::MAX).is_none());

        let short = Ray::new(Vec3::new(0.25, 0.25, 2.0), Vec3::NEG_Z);
        assert!(intersect_triangle(&short, unit_triangle(), 0.0, 1.0).is_none());
    }

    #[test]
    fn ray_along_shared_edge_hits_a_neighbour() {
        let lower = [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0)];
        let upper = [Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)];
        for i in 1..10 {
            let along = i as f32 * 0.1;
            let ray = Ray::new(Vec3::new(along, along, 3.0), Vec3::NEG_Z);
            let hits = [lower, upper]
                .into_iter()
                .filter(|tri| intersect_triangle(&ray, *tri, 0.0, f32::MAX).is_some())
                .count();
            assert!(hits >= 1, "ray at {along} fell between the triangles");
        }
    }

    #[test]
    fn slab_test_accepts_grazing_ray_on_flat_box() {
        let flat = Aabb::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0));
        let ray = Ray::new(Vec3::new(-5.0, 1e-7, 0.0), Vec3::X);
        assert!(flat.ray_entry(&ray, 0.0, f32::MAX).is_some());
    }

    #[test]
    fn slab_test_reports_entry_parameter() {
        let bounds = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let entry = bounds.ray_entry(&ray, 0.0, f32::MAX).expect("entry");
        assert!((entry - 4.0).abs() < 1e-4);

        let away = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert!(bounds.ray_entry(&away, 0.0, f32::MAX).is_none());
    }

    #[test]
    fn transformed_ray_keeps_world_distance() {
        let world = Mat4::from_scale(Vec3::splat(4.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let local = ray.transformed(&world.inverse());
        let hit = intersect_triangle(
            &local,
            [
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            0.0,
            f32::MAX,
        )
        .expect("hit");
        assert!((hit.t - 10.0).abs() < 1e-5);
    }

    #[test]
    fn transformed_bounds_cover_rotated_box() {
        let bounds = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let rotated = bounds.transformed(&Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2));
        assert!((rotated.size() - Vec3::new(1.0, 2.0, 1.0)).abs().max_element() < 1e-5);
    }
}
