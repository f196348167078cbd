//! Spatial intersection engine.
//!
//! Each mesh is paired with its BVH once at load time ([`AcceleratedMesh`]);
//! a [`Raycaster`] then walks a set of layer-tagged targets and keeps only
//! the nearest hit. The same engine serves placement (content layer) and
//! hover (marker layer).

use glam::{Mat3, Mat4, Vec3};

use crate::bvh::MeshBvh;
use crate::camera::PerspectiveCamera;
use crate::geometry::{Aabb, Ray, TriangleMesh};
use crate::scene::{Layer, LayerMask, NodeId};

/// A mesh together with the acceleration structure built for it.
#[derive(Debug, Clone)]
pub struct AcceleratedMesh {
    mesh: TriangleMesh,
    bvh: MeshBvh,
}

impl AcceleratedMesh {
    pub fn build(mesh: TriangleMesh, max_leaf_triangles: usize) -> Self {
        let bvh = MeshBvh::build(&mesh, max_leaf_triangles);
        Self { mesh, bvh }
    }

    pub fn mesh(&self) -> &TriangleMesh {
        &self.mesh
    }

    pub fn bvh(&self) -> &MeshBvh {
        &self.bvh
    }

    pub fn local_bounds(&self) -> Aabb {
        self.bvh.bounds().unwrap_or_else(Aabb::empty)
    }
}

/// One mesh instance a raycaster may test.
#[derive(Debug, Clone, Copy)]
pub struct RaycastTarget<'a> {
    pub object: NodeId,
    pub layer: Layer,
    pub mesh: &'a AcceleratedMesh,
    pub world: Mat4,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHit {
    pub object: NodeId,
    pub triangle: usize,
    pub distance: f32,
    pub point: Vec3,
    /// Unit face normal in world space, facing back towards the ray origin.
    pub normal: Vec3,
}

/// Where a marker should sit for a given hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceAnchor {
    pub position: Vec3,
    pub normal: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Raycaster {
    pub layers: LayerMask,
    pub near: f32,
    pub far: f32,
}

impl Raycaster {
    pub fn new(layers: LayerMask) -> Self {
        Self {
            layers,
            near: 0.0,
            far: f32::INFINITY,
        }
    }

    /// Raycaster limited to `layer` and the camera's clip range.
    pub fn for_camera(camera: &PerspectiveCamera, layer: Layer) -> Self {
        Self {
            layers: LayerMask::only(layer),
            near: camera.near.max(0.0),
            far: camera.far,
        }
    }

    /// Nearest hit across `targets`; targets outside the layer mask are
    /// skipped without touching their BVH.
    pub fn intersect<'a, I>(&self, ray: &Ray, targets: I) -> Option<SurfaceHit>
    where
        I: IntoIterator<Item = RaycastTarget<'a>>,
    {
        let mut best: Option<SurfaceHit> = None;

        for target in targets {
            if !self.layers.is_enabled(target.layer) {
                continue;
            }
            let limit = best.map_or(self.far, |hit| hit.distance);
            if let Some(hit) = intersect_target(ray, &target, self.near, limit) {
                if best.is_none_or(|current| hit.distance < current.distance) {
                    best = Some(hit);
                }
            }
        }

        best
    }
}

fn intersect_target(
    ray: &Ray,
    target: &RaycastTarget<'_>,
    near: f32,
    far: f32,
) -> Option<SurfaceHit> {
    if target.world.determinant().abs() <= f32::EPSILON {
        return None;
    }
    let local_ray = ray.transformed(&target.world.inverse());
    let mesh = target.mesh;
    let hit = mesh.bvh.closest_hit(&mesh.mesh, &local_ray, near, far)?;

    let normal_matrix = Mat3::from_mat4(target.world).inverse().transpose();
    let mut normal = (normal_matrix * mesh.mesh.face_normal(hit.triangle)).try_normalize()?;
    if normal.dot(ray.direction) > 0.0 {
        normal = -normal;
    }

    Some(SurfaceHit {
        object: target.object,
        triangle: hit.triangle,
        distance: hit.t,
        point: ray.at(hit.t),
        normal,
    })
}

/// Lift the hit point off the surface by `offset_factor * model_scale` so the
/// marker does not z-fight the face it sits on.
pub fn surface_anchor(hit: &SurfaceHit, model_scale: f32, offset_factor: f32) -> SurfaceAnchor {
    SurfaceAnchor {
        position: hit.point + hit.normal * (offset_factor * model_scale),
        normal: hit.normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::DEFAULT_MAX_LEAF_TRIANGLES;
    use crate::primitives::{PrimitiveKind, primitive};
    use crate::resources::{GpuResources, ResourceKind};
    use crate::scene::{NodeKind, SceneGraph, SceneNode, Transform};

    fn accelerated(kind: PrimitiveKind) -> AcceleratedMesh {
        AcceleratedMesh::build(TriangleMesh::from(&primitive(kind)), DEFAULT_MAX_LEAF_TRIANGLES)
    }

    fn node_ids(count: usize) -> Vec<NodeId> {
        let mut graph = SceneGraph::new();
        let mut gpu = GpuResources::new();
        (0..count)
            .map(|i| {
                graph.add(SceneNode {
                    name: format!("mesh{i}"),
                    layer: Layer::Content,
                    transform: Transform::IDENTITY,
                    kind: NodeKind::Mesh {
                        geometry: gpu.allocate(ResourceKind::Geometry, "mesh", 0),
                    },
                })
            })
            .collect()
    }

    fn point_on_triangle(point: Vec3, [a, b, c]: [Vec3; 3]) -> bool {
        let normal = (b - a).cross(c - a).normalize();
        if normal.dot(point - a).abs() > 1e-4 {
            return false;
        }
        let edges = [(a, b), (b, c), (c, a)];
        edges
            .iter()
            .all(|(p, q)| (*q - *p).cross(point - *p).dot(normal) >= -1e-4)
    }

    #[test]
    fn hits_lie_on_triangles_with_unit_world_normals() {
        let sphere = accelerated(PrimitiveKind::Sphere);
        let ids = node_ids(1);
        let world = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 3.0, 2.0),
            glam::Quat::from_rotation_y(0.3),
            Vec3::new(0.5, 1.0, 0.0),
        );
        let target = RaycastTarget {
            object: ids[0],
            layer: Layer::Content,
            mesh: &sphere,
            world,
        };
        let raycaster = Raycaster::new(LayerMask::only(Layer::Content));

        for i in 0..16 {
            let angle = i as f32 * 0.39;
            let origin = Vec3::new(angle.cos() * 8.0, 1.0 + angle.sin(), angle.sin() * 8.0);
            let ray = Ray::between(origin, Vec3::new(0.5, 1.0, 0.0)).expect("ray");
            let hit = raycaster.intersect(&ray, [target]).expect("hit");

            assert!((hit.normal.length() - 1.0).abs() < 1e-5);
            assert!(hit.normal.dot(ray.direction) < 0.0);

            let corners = sphere.mesh().corners(hit.triangle).map(|c| world.transform_point3(c));
            assert!(point_on_triangle(hit.point, corners), "hit {hit:?} off triangle");
        }
    }

    #[test]
    fn rays_through_equator_vertices_do_not_leak() {
        let sphere = accelerated(PrimitiveKind::Sphere);
        let ids = node_ids(1);
        let target = RaycastTarget {
            object: ids[0],
            layer: Layer::Content,
            mesh: &sphere,
            world: Mat4::from_translation(Vec3::new(0.5, 1.0, 0.0)),
        };
        let raycaster = Raycaster::new(LayerMask::only(Layer::Content));

        // Longitude steps of the unit sphere land exactly on shared ring
        // vertices and edges.
        for lon in 0..18 {
            let phi = lon as f32 / 18.0 * std::f32::consts::TAU;
            let outward = Vec3::new(phi.cos(), 0.0, phi.sin());
            let origin = Vec3::new(0.5, 1.0, 0.0) + outward * 8.0;
            let ray = Ray::between(origin, Vec3::new(0.5, 1.0, 0.0)).expect("ray");
            let hit = raycaster
                .intersect(&ray, [target])
                .unwrap_or_else(|| panic!("ray at longitude {lon} fell through the sphere"));
            assert!((hit.distance - 7.5).abs() < 0.05, "distance {}", hit.distance);
        }
    }

    #[test]
    fn nearest_target_wins_and_layers_filter() {
        let cube = accelerated(PrimitiveKind::Cube);
        let ids = node_ids(2);
        let near_box = RaycastTarget {
            object: ids[0],
            layer: Layer::Markers,
            mesh: &cube,
            world: Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0)),
        };
        let far_box = RaycastTarget {
            object: ids[1],
            layer: Layer::Content,
            mesh: &cube,
            world: Mat4::IDENTITY,
        };
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);

        let all = Raycaster::new(LayerMask::ALL);
        assert_eq!(all.intersect(&ray, [far_box, near_box]).expect("hit").object, ids[0]);

        let content = Raycaster::new(LayerMask::only(Layer::Content));
        let hit = content.intersect(&ray, [far_box, near_box]).expect("hit");
        assert_eq!(hit.object, ids[1]);
        assert!((hit.point - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-5);
        assert!((hit.normal - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn clip_range_limits_hits() {
        let cube = accelerated(PrimitiveKind::Cube);
        let ids = node_ids(1);
        let target = RaycastTarget {
            object: ids[0],
            layer: Layer::Content,
            mesh: &cube,
            world: Mat4::IDENTITY,
        };
        let ray = Ray::new(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let mut raycaster = Raycaster::new(LayerMask::only(Layer::Content));
        raycaster.far = 5.0;
        assert!(raycaster.intersect(&ray, [target]).is_none());
    }

    #[test]
    fn anchor_is_lifted_along_normal_by_scaled_offset() {
        let hit = SurfaceHit {
            object: node_ids(1)[0],
            triangle: 0,
            distance: 1.0,
            point: Vec3::new(1.0, 2.0, 3.0),
            normal: Vec3::Y,
        };
        let anchor = surface_anchor(&hit, 4.0, 0.01);
        assert!((anchor.position - Vec3::new(1.0, 2.04, 3.0)).length() < 1e-6);
        assert_eq!(anchor.normal, Vec3::Y);
    }
}
