//! Scene graph nodes and render layers.
//!
//! Nodes are keyed by identity ([`NodeId`]); other components hold ids, never
//! copies of nodes. Layers partition the graph so the camera and raycasters
//! can include or skip hotspot markers independently of model content.

use std::collections::BTreeMap;
use std::fmt;

use glam::{Mat4, Quat, Vec3};

use crate::markers::MarkerVisual;
use crate::resources::{GpuResources, ResourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Content = 0,
    Markers = 1,
}

impl Layer {
    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerMask(u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    pub fn only(layer: Layer) -> Self {
        LayerMask(layer.bit())
    }

    pub fn enable(&mut self, layer: Layer) {
        self.0 |= layer.bit();
    }

    pub fn disable(&mut self, layer: Layer) {
        self.0 &= !layer.bit();
    }

    /// Flips `layer` and returns whether it is now enabled.
    pub fn toggle(&mut self, layer: Layer) -> bool {
        self.0 ^= layer.bit();
        self.is_enabled(layer)
    }

    pub fn is_enabled(&self, layer: Layer) -> bool {
        self.0 & layer.bit() != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::only(Layer::Content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Model geometry; `geometry` is the uploaded vertex/index buffer.
    Mesh { geometry: ResourceId },
    Light { intensity: f32 },
    /// Hotspot proxy. Geometry and materials come from the marker pool;
    /// only the per-instance buffer belongs to the node.
    Marker {
        visual: MarkerVisual,
        instance: ResourceId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub layer: Layer,
    pub transform: Transform,
    pub kind: NodeKind,
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, SceneNode>,
    next: u32,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Detaches `id`. Returns `None` when it is not (or no longer) attached.
    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        self.nodes.remove(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    pub fn count_in_layer(&self, layer: Layer) -> usize {
        self.nodes.values().filter(|node| node.layer == layer).count()
    }
}

/// The scene graph together with the GPU allocations its nodes refer to.
#[derive(Debug, Default)]
pub struct Stage {
    pub graph: SceneGraph,
    pub gpu: GpuResources,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light(name: &str) -> SceneNode {
        SceneNode {
            name: name.to_string(),
            layer: Layer::Content,
            transform: Transform::IDENTITY,
            kind: NodeKind::Light { intensity: 1.0 },
        }
    }

    #[test]
    fn default_mask_sees_content_only() {
        let mask = LayerMask::default();
        assert!(mask.is_enabled(Layer::Content));
        assert!(!mask.is_enabled(Layer::Markers));
    }

    #[test]
    fn toggle_reports_new_state() {
        let mut mask = LayerMask::ALL;
        assert!(!mask.toggle(Layer::Markers));
        assert!(mask.is_enabled(Layer::Content));
        assert!(mask.toggle(Layer::Markers));
    }

    #[test]
    fn removing_twice_is_harmless() {
        let mut graph = SceneGraph::new();
        let id = graph.add(light("ambient"));
        assert_eq!(graph.find_by_name("ambient"), Some(id));
        assert!(graph.remove(id).is_some());
        assert!(graph.remove(id).is_none());
        assert!(graph.is_empty());
    }

    #[test]
    fn transform_matrix_round_trips() {
        let transform = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.5),
            scale: Vec3::splat(2.0),
        };
        let back = Transform::from_matrix(transform.matrix());
        assert!((back.translation - transform.translation).length() < 1e-5);
        assert!((back.scale - transform.scale).length() < 1e-5);
    }
}
