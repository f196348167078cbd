use glam::Vec3;

use crate::geometry::{Aabb, Ray, TriangleMesh, intersect_triangle};

/// Leaf size used for model meshes unless the config overrides it.
pub const DEFAULT_MAX_LEAF_TRIANGLES: usize = 10;

/// A deterministic bounding volume hierarchy over the triangles of one mesh.
///
/// Built once when a mesh is loaded and queried with first-hit semantics:
/// traversal visits the nearer child first and prunes any node whose entry
/// distance is beyond the best hit found so far.
#[derive(Debug, Clone)]
pub struct MeshBvh {
    nodes: Vec<Node>,
    /// Triangle indices, grouped so every leaf owns a contiguous range.
    order: Vec<u32>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        bounds: Aabb,
        start: u32,
        count: u32,
    },
    Internal {
        bounds: Aabb,
        left: usize,
        right: usize,
    },
}

impl Node {
    fn bounds(&self) -> &Aabb {
        match self {
            Node::Leaf { bounds, .. } | Node::Internal { bounds, .. } => bounds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    pub triangle: usize,
    pub t: f32,
    pub point: Vec3,
}

/// Work done by one query; used to confirm the index actually prunes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub nodes_visited: usize,
    pub triangles_tested: usize,
}

struct BuildItem {
    triangle: u32,
    bounds: Aabb,
    centroid: Vec3,
}

impl MeshBvh {
    pub fn build(mesh: &TriangleMesh, max_leaf_triangles: usize) -> Self {
        let max_leaf = max_leaf_triangles.max(1);
        let mut items: Vec<BuildItem> = (0..mesh.triangle_count())
            .map(|triangle| {
                let bounds = Aabb::from_points(mesh.corners(triangle));
                BuildItem {
                    triangle: triangle as u32,
                    centroid: bounds.center(),
                    bounds,
                }
            })
            .collect();

        let mut bvh = Self {
            nodes: Vec::new(),
            order: Vec::with_capacity(items.len()),
        };
        if !items.is_empty() {
            bvh.build_node(&mut items, max_leaf);
        }
        bvh
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn bounds(&self) -> Option<Aabb> {
        self.nodes.first().map(|node| *node.bounds())
    }

    /// Nearest triangle hit along `ray` within `[t_min, t_max]`.
    pub fn closest_hit(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        t_min: f32,
        t_max: f32,
    ) -> Option<MeshHit> {
        self.closest_hit_with_stats(mesh, ray, t_min, t_max).0
    }

    pub fn closest_hit_with_stats(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        t_min: f32,
        t_max: f32,
    ) -> (Option<MeshHit>, QueryStats) {
        let mut stats = QueryStats::default();
        let Some(root) = self.nodes.first() else {
            return (None, stats);
        };
        let Some(root_entry) = root.bounds().ray_entry(ray, t_min, t_max) else {
            return (None, stats);
        };

        let mut best: Option<(u32, f32)> = None;
        let mut stack: Vec<(usize, f32)> = vec![(0, root_entry)];

        while let Some((idx, entry)) = stack.pop() {
            let limit = best.map_or(t_max, |(_, t)| t);
            if entry > limit {
                continue;
            }
            stats.nodes_visited += 1;

            match &self.nodes[idx] {
                Node::Leaf { start, count, .. } => {
                    let range = *start as usize..(*start + *count) as usize;
                    for &triangle in &self.order[range] {
                        stats.triangles_tested += 1;
                        let limit = best.map_or(t_max, |(_, t)| t);
                        let Some(hit) =
                            intersect_triangle(ray, mesh.corners(triangle as usize), t_min, limit)
                        else {
                            continue;
                        };
                        // Equal distances resolve to the lower triangle index.
                        let closer = match best {
                            None => true,
                            Some((best_tri, best_t)) => {
                                hit.t < best_t || (hit.t == best_t && triangle < best_tri)
                            }
                        };
                        if closer {
                            best = Some((triangle, hit.t));
                        }
                    }
                }
                Node::Internal { left, right, .. } => {
                    let limit = best.map_or(t_max, |(_, t)| t);
                    let left_entry = self.nodes[*left].bounds().ray_entry(ray, t_min, limit);
                    let right_entry = self.nodes[*right].bounds().ray_entry(ray, t_min, limit);
                    match (left_entry, right_entry) {
                        (Some(l), Some(r)) => {
                            // Push the farther child first so the nearer pops next.
                            if l <= r {
                                stack.push((*right, r));
                                stack.push((*left, l));
                            } else {
                                stack.push((*left, l));
                                stack.push((*right, r));
                            }
                        }
                        (Some(l), None) => stack.push((*left, l)),
                        (None, Some(r)) => stack.push((*right, r)),
                        (None, None) => {}
                    }
                }
            }
        }

        let hit = best.map(|(triangle, t)| MeshHit {
            triangle: triangle as usize,
            t,
            point: ray.at(t),
        });
        (hit, stats)
    }

    fn build_node(&mut self, items: &mut [BuildItem], max_leaf: usize) -> usize {
        let bounds = items
            .iter()
            .skip(1)
            .fold(items[0].bounds, |acc, item| acc.union(&item.bounds));

        if items.len() <= max_leaf {
            let start = self.order.len() as u32;
            self.order.extend(items.iter().map(|item| item.triangle));
            let idx = self.nodes.len();
            self.nodes.push(Node::Leaf {
                bounds,
                start,
                count: items.len() as u32,
            });
            return idx;
        }

        // Split on centroid extent rather than box extent so thin slivers
        // spanning the whole mesh do not stall the partition.
        let centroid_bounds = Aabb::from_points(items.iter().map(|item| item.centroid));
        let axis = centroid_bounds.widest_axis();
        items.sort_by(|a, b| {
            a.centroid[axis]
                .total_cmp(&b.centroid[axis])
                .then_with(|| a.triangle.cmp(&b.triangle))
        });

        let mid = items.len() / 2;
        let (left_items, right_items) = items.split_at_mut(mid);

        let idx = self.nodes.len();
        // Placeholder; patched after children are built.
        self.nodes.push(Node::Leaf {
            bounds,
            start: 0,
            count: 0,
        });

        let left = self.build_node(left_items, max_leaf);
        let right = self.build_node(right_items, max_leaf);

        self.nodes[idx] = Node::Internal {
            bounds,
            left,
            right,
        };
        idx
    }
}
