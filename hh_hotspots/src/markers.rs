//! Hotspot marker proxies and the pool of resources they share.
//!
//! Every marker draws the same disc geometry with one of two materials;
//! only the per-instance buffer and the [`MarkerVisual`] tag belong to the
//! marker itself. The pool is owned by one viewer and disposed exactly once,
//! after every marker it produced has left the scene.

use std::collections::BTreeSet;

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

use crate::HotspotId;
use crate::config::MarkerStyle;
use crate::error::HotspotError;
use crate::geometry::TriangleMesh;
use crate::intersect::{AcceleratedMesh, RaycastTarget};
use crate::primitives::{build_disc, instance_transform};
use crate::resources::{GpuResources, ResourceId, ResourceKind};
use crate::scene::{Layer, NodeId, NodeKind, SceneGraph, SceneNode, Stage, Transform};

pub const MARKER_NAME_PREFIX: &str = "HH_Hotspot_";

const ICON_TEXTURE_SIDE: usize = 64;

/// Scene node name for a marker; provisional markers have no id yet.
pub fn marker_name(id: Option<HotspotId>) -> String {
    match id {
        Some(id) => format!("{MARKER_NAME_PREFIX}{id}"),
        None => format!("{MARKER_NAME_PREFIX}draft"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerVisual {
    #[default]
    Default,
    Highlighted,
}

impl MarkerVisual {
    fn slot(self) -> usize {
        match self {
            MarkerVisual::Default => 0,
            MarkerVisual::Highlighted => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialDescriptor {
    pub color: [f32; 3],
    pub opacity: f32,
    pub transparent: bool,
    pub depth_test: bool,
    pub depth_write: bool,
}

/// A shared material and the icon texture it samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialHandle {
    pub material: ResourceId,
    pub texture: ResourceId,
    pub descriptor: MaterialDescriptor,
}

/// Per-marker data uploaded alongside the shared disc.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MarkerInstance {
    pub model: [[f32; 4]; 4],
}

impl MarkerInstance {
    pub fn new(transform: &Transform) -> Self {
        Self {
            model: transform.matrix().to_cols_array_2d(),
        }
    }
}

#[derive(Debug)]
pub struct MarkerPool {
    geometry: ResourceId,
    disc: AcceleratedMesh,
    materials: [MaterialHandle; 2],
    live: BTreeSet<NodeId>,
}

impl MarkerPool {
    pub fn new(style: &MarkerStyle, max_leaf_triangles: usize, gpu: &mut GpuResources) -> Self {
        let disc = build_disc(style.radius, style.thickness, style.segments);
        let geometry = gpu.allocate(ResourceKind::Geometry, "hotspot disc", disc.byte_len());
        let disc = AcceleratedMesh::build(TriangleMesh::from(&disc), max_leaf_triangles);

        let mut material = |label: &str, color: [f32; 3]| {
            let texture_bytes = ICON_TEXTURE_SIDE * ICON_TEXTURE_SIDE * 4;
            MaterialHandle {
                material: gpu.allocate(ResourceKind::Material, format!("hotspot {label}"), 0),
                texture: gpu.allocate(
                    ResourceKind::Texture,
                    format!("hotspot {label} icon"),
                    texture_bytes,
                ),
                descriptor: MaterialDescriptor {
                    color,
                    opacity: style.opacity,
                    transparent: true,
                    depth_test: true,
                    depth_write: false,
                },
            }
        };
        let materials = [
            material("default", style.default_color),
            material("highlight", style.highlight_color),
        ];

        log::debug!(
            "marker pool ready: {} disc triangles, geometry {geometry}",
            disc.mesh().triangle_count()
        );
        Self {
            geometry,
            disc,
            materials,
            live: BTreeSet::new(),
        }
    }

    pub fn geometry(&self) -> ResourceId {
        self.geometry
    }

    pub fn disc(&self) -> &AcceleratedMesh {
        &self.disc
    }

    pub fn material_for(&self, visual: MarkerVisual) -> &MaterialHandle {
        &self.materials[visual.slot()]
    }

    /// Number of markers created from this pool that are not yet disposed.
    pub fn live_markers(&self) -> usize {
        self.live.len()
    }

    pub fn is_marker(&self, node: NodeId) -> bool {
        self.live.contains(&node)
    }

    /// Adds a marker to the marker layer of `stage` and returns its node.
    pub fn create_marker(
        &mut self,
        stage: &mut Stage,
        id: Option<HotspotId>,
        position: Vec3,
        orientation: Quat,
        scale: f32,
    ) -> NodeId {
        let transform = Transform::from_matrix(instance_transform(position, scale, orientation));
        let name = marker_name(id);
        let instance = stage.gpu.allocate(
            ResourceKind::InstanceBuffer,
            name.clone(),
            bytemuck::bytes_of(&MarkerInstance::new(&transform)).len(),
        );
        let node = stage.graph.add(SceneNode {
            name,
            layer: Layer::Markers,
            transform,
            kind: NodeKind::Marker {
                visual: MarkerVisual::Default,
                instance,
            },
        });
        self.live.insert(node);
        node
    }

    /// Re-tags a marker with its committed hotspot id.
    pub fn rename_marker(&self, graph: &mut SceneGraph, node: NodeId, id: HotspotId) -> bool {
        if !self.is_marker(node) {
            return false;
        }
        match graph.get_mut(node) {
            Some(scene_node) => {
                scene_node.name = marker_name(Some(id));
                true
            }
            None => false,
        }
    }

    /// Detaches a marker and releases its instance buffer. Calling this for
    /// an already disposed (or foreign) node does nothing.
    pub fn dispose_marker(&mut self, stage: &mut Stage, node: NodeId) -> bool {
        if !self.live.remove(&node) {
            return false;
        }
        let Some(scene_node) = stage.graph.remove(node) else {
            log::warn!("marker {node} was already detached from the scene");
            return false;
        };
        if let NodeKind::Marker { instance, .. } = scene_node.kind {
            stage.gpu.release(instance);
        }
        true
    }

    pub fn set_visual(&self, graph: &mut SceneGraph, node: NodeId, visual: MarkerVisual) -> bool {
        if !self.is_marker(node) {
            return false;
        }
        match graph.get_mut(node).map(|scene_node| &mut scene_node.kind) {
            Some(NodeKind::Marker { visual: current, .. }) => {
                *current = visual;
                true
            }
            _ => false,
        }
    }

    pub fn visual(&self, graph: &SceneGraph, node: NodeId) -> Option<MarkerVisual> {
        match graph.get(node).map(|scene_node| &scene_node.kind) {
            Some(NodeKind::Marker { visual, .. }) if self.is_marker(node) => Some(*visual),
            _ => None,
        }
    }

    /// Hover targets: the shared disc placed at every live marker.
    pub fn raycast_targets<'a>(
        &'a self,
        graph: &'a SceneGraph,
    ) -> impl Iterator<Item = RaycastTarget<'a>> + 'a {
        self.live.iter().filter_map(move |node| {
            let scene_node = graph.get(*node)?;
            Some(RaycastTarget {
                object: *node,
                layer: scene_node.layer,
                mesh: &self.disc,
                world: scene_node.transform.matrix(),
            })
        })
    }

    /// Releases the shared geometry, materials and textures.
    ///
    /// Fails, handing the pool back, while markers it created are still
    /// attached.
    pub fn dispose(self, gpu: &mut GpuResources) -> Result<(), (MarkerPool, HotspotError)> {
        if !self.live.is_empty() {
            let attached = self.live.len();
            return Err((self, HotspotError::PoolInUse(attached)));
        }
        gpu.release(self.geometry);
        for handle in &self.materials {
            gpu.release(handle.material);
            gpu.release(handle.texture);
        }
        log::debug!("marker pool disposed");
        Ok(())
    }
}

/// Everything the hotspot store needs to materialize markers for one model.
pub struct MarkerFactory<'a> {
    pub pool: &'a mut MarkerPool,
    pub stage: &'a mut Stage,
    /// Model scale applied to every marker.
    pub scale: f32,
}

impl MarkerFactory<'_> {
    pub fn create_marker(
        &mut self,
        id: Option<HotspotId>,
        position: Vec3,
        orientation: Quat,
    ) -> NodeId {
        self.pool
            .create_marker(self.stage, id, position, orientation, self.scale)
    }

    pub fn promote_marker(&mut self, node: NodeId, id: HotspotId) -> bool {
        self.pool.rename_marker(&mut self.stage.graph, node, id)
    }

    pub fn dispose_marker(&mut self, node: NodeId) -> bool {
        self.pool.dispose_marker(self.stage, node)
    }
}
