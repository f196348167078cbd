//! Procedural primitive meshes. The marker disc is built here, and the unit
//! sphere/cube double as stand-in models for headless sessions. Unit shapes
//! live in a unit-ish cube so callers can apply one uniform scale.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

const DEFAULT_SPHERE_RINGS: u32 = 12;
const DEFAULT_SPHERE_SEGMENTS: u32 = 18;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshPrimitive {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshPrimitive {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Size of the vertex and index buffers once uploaded.
    pub fn byte_len(&self) -> usize {
        bytemuck::cast_slice::<MeshVertex, u8>(&self.vertices).len()
            + bytemuck::cast_slice::<u32, u8>(&self.indices).len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveKind {
    Sphere,
    Cube,
}

pub fn primitive(kind: PrimitiveKind) -> MeshPrimitive {
    match kind {
        PrimitiveKind::Sphere => build_sphere(DEFAULT_SPHERE_RINGS, DEFAULT_SPHERE_SEGMENTS),
        PrimitiveKind::Cube => build_cube(),
    }
}

pub fn instance_transform(position: Vec3, scale: f32, rotation: Quat) -> Mat4 {
    Mat4::from_scale_rotation_translation(Vec3::splat(scale), rotation, position)
}

/// Closed UV sphere of radius 0.5. Each pole is a single vertex and every
/// ring wraps back onto its first vertex, so no edge is left unshared.
fn build_sphere(rings: u32, segments: u32) -> MeshPrimitive {
    let rings = rings.max(3);
    let segments = segments.max(6);
    let interior_rings = rings - 1;
    let south = 1 + interior_rings * segments;

    let surface_point = |unit: Vec3| MeshVertex {
        position: (unit * 0.5).to_array(),
        normal: unit.to_array(),
    };

    let mut vertices = Vec::with_capacity(south as usize + 1);
    vertices.push(surface_point(Vec3::Y));
    for ring in 1..rings {
        let (sin_theta, cos_theta) = (ring as f32 * PI / rings as f32).sin_cos();
        vertices.extend((0..segments).map(|segment| {
            let (sin_phi, cos_phi) = (segment as f32 * 2.0 * PI / segments as f32).sin_cos();
            surface_point(Vec3::new(sin_theta * cos_phi, cos_theta, sin_theta * sin_phi))
        }));
    }
    vertices.push(surface_point(Vec3::NEG_Y));

    let at = |ring: u32, segment: u32| 1 + ring * segments + segment % segments;
    let mut indices = Vec::with_capacity((segments * interior_rings * 6) as usize);
    for segment in 0..segments {
        indices.extend_from_slice(&[0, at(0, segment + 1), at(0, segment)]);
    }
    for ring in 0..interior_rings - 1 {
        for segment in 0..segments {
            let (a, b) = (at(ring, segment), at(ring, segment + 1));
            let (c, d) = (at(ring + 1, segment), at(ring + 1, segment + 1));
            indices.extend_from_slice(&[a, b, c, b, d, c]);
        }
    }
    for segment in 0..segments {
        let last = interior_rings - 1;
        indices.extend_from_slice(&[at(last, segment), at(last, segment + 1), south]);
    }

    MeshPrimitive::new(vertices, indices)
}

fn build_cube() -> MeshPrimitive {
    #[rustfmt::skip]
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        // +X
        ([1.0, 0.0, 0.0], [[0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [0.5, 0.5, 0.5], [0.5, -0.5, 0.5]]),
        // -X
        ([-1.0, 0.0, 0.0], [[-0.5, -0.5, 0.5], [-0.5, 0.5, 0.5], [-0.5, 0.5, -0.5], [-0.5, -0.5, -0.5]]),
        // +Y
        ([0.0, 1.0, 0.0], [[-0.5, 0.5, -0.5], [-0.5, 0.5, 0.5], [0.5, 0.5, 0.5], [0.5, 0.5, -0.5]]),
        // -Y
        ([0.0, -1.0, 0.0], [[-0.5, -0.5, 0.5], [-0.5, -0.5, -0.5], [0.5, -0.5, -0.5], [0.5, -0.5, 0.5]]),
        // +Z
        ([0.0, 0.0, 1.0], [[-0.5, -0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5]]),
        // -Z
        ([0.0, 0.0, -1.0], [[0.5, -0.5, -0.5], [-0.5, -0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, 0.5, -0.5]]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (face_index, (normal, corners)) in faces.iter().enumerate() {
        let base = (face_index * 4) as u32;
        for corner in corners {
            vertices.push(MeshVertex {
                position: *corner,
                normal: *normal,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshPrimitive::new(vertices, indices)
}

/// Flat cylinder standing on the local Y axis: the hotspot marker shape.
pub fn build_disc(radius: f32, thickness: f32, segments: u32) -> MeshPrimitive {
    let ring = segments.max(3);
    let half = thickness * 0.5;
    let mut vertices = Vec::with_capacity((ring * 4 + 2) as usize);
    let mut indices = Vec::with_capacity((ring * 12) as usize);

    let rim = |i: u32| {
        let angle = (i as f32 / ring as f32) * PI * 2.0;
        (angle.cos() * radius, angle.sin() * radius)
    };

    // Caps: centre vertex followed by the rim.
    for (y, normal) in [(half, [0.0, 1.0, 0.0]), (-half, [0.0, -1.0, 0.0])] {
        let center = vertices.len() as u32;
        vertices.push(MeshVertex {
            position: [0.0, y, 0.0],
            normal,
        });
        for i in 0..ring {
            let (x, z) = rim(i);
            vertices.push(MeshVertex {
                position: [x, y, z],
                normal,
            });
        }
        for i in 0..ring {
            let current = center + 1 + i;
            let next = center + 1 + (i + 1) % ring;
            if y > 0.0 {
                indices.extend_from_slice(&[center, next, current]);
            } else {
                indices.extend_from_slice(&[center, current, next]);
            }
        }
    }

    // Side wall with radial normals.
    let side = vertices.len() as u32;
    for i in 0..ring {
        let (x, z) = rim(i);
        let normal = Vec3::new(x, 0.0, z).normalize_or_zero().to_array();
        vertices.push(MeshVertex {
            position: [x, half, z],
            normal,
        });
        vertices.push(MeshVertex {
            position: [x, -half, z],
            normal,
        });
    }
    for i in 0..ring {
        let top = side + i * 2;
        let bottom = top + 1;
        let next_top = side + ((i + 1) % ring) * 2;
        let next_bottom = next_top + 1;
        indices.extend_from_slice(&[top, next_top, bottom]);
        indices.extend_from_slice(&[bottom, next_top, next_bottom]);
    }

    MeshPrimitive::new(vertices, indices)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::geometry::TriangleMesh;

    #[test]
    fn cube_faces_wind_outwards() {
        let cube = TriangleMesh::from(&primitive(PrimitiveKind::Cube));
        assert_eq!(cube.triangle_count(), 12);
        for triangle in 0..cube.triangle_count() {
            let [a, b, c] = cube.corners(triangle);
            let centroid = (a + b + c) / 3.0;
            assert!(cube.face_normal(triangle).dot(centroid) > 0.0);
        }
    }

    #[test]
    fn disc_caps_face_along_y() {
        let disc = build_disc(0.025, 0.005, 32);
        let mesh = TriangleMesh::from(&disc);
        assert_eq!(mesh.triangle_count(), 32 * 4);
        assert!((mesh.face_normal(0) - Vec3::Y).length() < 1e-5);
        assert!((mesh.face_normal(32) - Vec3::NEG_Y).length() < 1e-5);

        let bounds = mesh.bounds();
        assert!((bounds.size().y - 0.005).abs() < 1e-6);
        assert!((bounds.size().x - 0.05).abs() < 1e-6);
    }

    #[test]
    fn sphere_stays_inside_unit_cube() {
        let sphere = TriangleMesh::from(&primitive(PrimitiveKind::Sphere));
        let bounds = sphere.bounds();
        assert!(bounds.max.max_element() <= 0.5 + 1e-6);
        assert!(bounds.min.min_element() >= -0.5 - 1e-6);
    }

    #[test]
    fn sphere_is_closed_with_shared_poles() {
        let sphere = primitive(PrimitiveKind::Sphere);
        let expected_vertices = (DEFAULT_SPHERE_RINGS - 1) * DEFAULT_SPHERE_SEGMENTS + 2;
        assert_eq!(sphere.vertices.len(), expected_vertices as usize);

        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for triangle in sphere.indices.chunks_exact(3) {
            for (p, q) in [(0, 1), (1, 2), (2, 0)] {
                let (a, b) = (triangle[p], triangle[q]);
                *edges.entry((a.min(b), a.max(b))).or_default() += 1;
            }
        }
        assert!(edges.values().all(|&count| count == 2), "open edge in sphere");

        let mesh = TriangleMesh::from(&sphere);
        for triangle in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.corners(triangle);
            assert!(mesh.face_normal(triangle).dot((a + b + c) / 3.0) > 0.0);
        }
    }

    #[test]
    fn byte_len_counts_vertices_and_indices() {
        let cube = primitive(PrimitiveKind::Cube);
        assert_eq!(cube.byte_len(), 24 * 24 + 36 * 4);
    }
}
