//! Pointer-hover feedback on hotspot markers.

use crate::geometry::Ray;
use crate::intersect::Raycaster;
use crate::markers::{MarkerPool, MarkerVisual};
use crate::scene::{NodeId, SceneGraph};

#[derive(Debug, Default)]
pub struct HoverHighlighter {
    hovered: Option<NodeId>,
}

impl HoverHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Casts `ray` against the marker layer and moves the highlight to
    /// whatever it hits. Returns the hovered marker afterwards.
    pub fn pointer_move(
        &mut self,
        ray: &Ray,
        raycaster: &Raycaster,
        pool: &MarkerPool,
        graph: &mut SceneGraph,
    ) -> Option<NodeId> {
        let hit = raycaster
            .intersect(ray, pool.raycast_targets(graph))
            .map(|hit| hit.object);
        self.update(hit, pool, graph);
        self.hovered
    }

    /// Applies a hover result. Returns `true` when the highlight moved.
    pub fn update(
        &mut self,
        hit: Option<NodeId>,
        pool: &MarkerPool,
        graph: &mut SceneGraph,
    ) -> bool {
        if let Some(previous) = self.hovered {
            if !pool.is_marker(previous) {
                log::trace!("hovered marker {previous} is gone");
                self.hovered = None;
            }
        }
        if hit == self.hovered {
            return false;
        }

        if let Some(previous) = self.hovered.take() {
            pool.set_visual(graph, previous, MarkerVisual::Default);
        }
        if let Some(node) = hit {
            if pool.set_visual(graph, node, MarkerVisual::Highlighted) {
                self.hovered = Some(node);
            }
        }
        true
    }

    pub fn clear(&mut self, pool: &MarkerPool, graph: &mut SceneGraph) {
        self.update(None, pool, graph);
    }
}
