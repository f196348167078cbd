//! One viewer session: camera, scene, marker pool and hotspot store wired
//! to pointer and frame events.

use glam::{Mat4, Vec2, Vec3};

use crate::HotspotId;
use crate::camera::{OrbitControls, PerspectiveCamera, ViewportRect, normalize_pointer};
use crate::choreographer::{CameraChoreographer, FlightStatus};
use crate::config::HotspotConfig;
use crate::error::{HotspotError, Result};
use crate::geometry::{Aabb, Ray, TriangleMesh};
use crate::hover::HoverHighlighter;
use crate::intersect::{AcceleratedMesh, RaycastTarget, Raycaster, surface_anchor};
use crate::markers::{MarkerFactory, MarkerPool};
use crate::persist::StoredHotspot;
use crate::primitives::{PrimitiveKind, primitive};
use crate::resources::ResourceKind;
use crate::scene::{Layer, LayerMask, NodeId, NodeKind, SceneNode, Stage, Transform};
use crate::store::{EditBuffer, HotspotRecord, HotspotStore, Phase};

/// A mesh handed over by the model loader, already in model space.
#[derive(Debug, Clone)]
pub struct MeshSource {
    pub name: String,
    pub mesh: TriangleMesh,
    pub world: Mat4,
}

impl MeshSource {
    /// Unit primitive scaled uniformly to `size`, centred on the origin.
    pub fn primitive(kind: PrimitiveKind, size: f32) -> Self {
        let name = match kind {
            PrimitiveKind::Sphere => "sphere",
            PrimitiveKind::Cube => "cube",
        };
        Self {
            name: name.to_string(),
            mesh: TriangleMesh::from(&primitive(kind)),
            world: Mat4::from_scale(Vec3::splat(size)),
        }
    }
}

#[derive(Debug)]
struct LoadedMesh {
    node: NodeId,
    mesh: AcceleratedMesh,
}

#[derive(Debug)]
struct LoadedModel {
    meshes: Vec<LoadedMesh>,
    bounds: Aabb,
    scale: f32,
}

#[derive(Debug)]
pub struct HotspotViewer {
    config: HotspotConfig,
    viewport: ViewportRect,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    stage: Stage,
    pool: MarkerPool,
    store: HotspotStore,
    choreographer: CameraChoreographer,
    hover: HoverHighlighter,
    lights: Vec<NodeId>,
    model: Option<LoadedModel>,
    selected: Option<HotspotId>,
}

impl HotspotViewer {
    pub fn new(config: HotspotConfig, viewport: ViewportRect) -> Self {
        let mut camera = PerspectiveCamera::new(
            config.camera.fov_degrees,
            viewport.aspect_ratio().unwrap_or(1.0),
            config.camera.near,
            config.camera.far,
        );
        camera.layers = LayerMask::ALL;
        let controls = OrbitControls::new(Vec3::ZERO);
        controls.update(&mut camera);

        let mut stage = Stage::new();
        let pool = MarkerPool::new(&config.marker, config.bvh_leaf_size, &mut stage.gpu);
        let lights = [("ambient light", 0.6), ("key light", 1.0)]
            .into_iter()
            .map(|(name, intensity)| {
                stage.graph.add(SceneNode {
                    name: name.to_string(),
                    layer: Layer::Content,
                    transform: Transform::IDENTITY,
                    kind: NodeKind::Light { intensity },
                })
            })
            .collect();

        Self {
            choreographer: CameraChoreographer::new(&config.choreography),
            config,
            viewport,
            camera,
            controls,
            stage,
            pool,
            store: HotspotStore::new(),
            hover: HoverHighlighter::new(),
            lights,
            model: None,
            selected: None,
        }
    }

    pub fn config(&self) -> &HotspotConfig {
        &self.config
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn pool(&self) -> &MarkerPool {
        &self.pool
    }

    pub fn store(&self) -> &HotspotStore {
        &self.store
    }

    pub fn phase(&self) -> Phase {
        self.store.phase()
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hover.hovered()
    }

    pub fn is_flying(&self) -> bool {
        self.choreographer.is_active()
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Largest dimension of the model bounds; 1 before any model is loaded.
    pub fn model_scale(&self) -> f32 {
        self.model.as_ref().map_or(1.0, |model| model.scale)
    }

    pub fn model_bounds(&self) -> Option<Aabb> {
        self.model.as_ref().map(|model| model.bounds)
    }

    pub fn resize(&mut self, viewport: ViewportRect) {
        if let Some(aspect) = viewport.aspect_ratio() {
            self.camera.aspect = aspect;
        }
        self.viewport = viewport;
    }

    /// Swings the camera around the orbit pivot by `yaw`/`pitch` radians.
    /// Ignored (returns `false`) while a camera flight owns the controls.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) -> bool {
        self.controls.rotate(&mut self.camera, yaw, pitch)
    }

    pub fn zoom(&mut self, factor: f32) -> bool {
        self.controls.dolly(&mut self.camera, factor)
    }

    /// Replaces the current model. Hotspots of the previous model are
    /// cleared, a BVH is built per mesh, and the camera is framed on the new
    /// bounds.
    pub fn load_model(&mut self, sources: Vec<MeshSource>) -> Result<()> {
        let bounds = sources
            .iter()
            .filter(|source| !source.mesh.is_empty())
            .map(|source| source.mesh.bounds().transformed(&source.world))
            .fold(Aabb::empty(), |acc, aabb| acc.union(&aabb));
        if bounds.is_empty() {
            return Err(HotspotError::NoModel);
        }

        self.hover.clear(&self.pool, &mut self.stage.graph);
        self.choreographer.cancel(&mut self.controls);
        self.selected = None;
        let mut factory = MarkerFactory {
            pool: &mut self.pool,
            stage: &mut self.stage,
            scale: 1.0,
        };
        self.store.clear_all(&mut factory);
        self.unload_model();

        let mut meshes = Vec::with_capacity(sources.len());
        for source in sources {
            if source.mesh.is_empty() {
                log::warn!("skipping empty mesh '{}'", source.name);
                continue;
            }
            let bytes = source.mesh.positions.len() * std::mem::size_of::<Vec3>()
                + source.mesh.triangle_count() * std::mem::size_of::<[u32; 3]>();
            let geometry = self
                .stage
                .gpu
                .allocate(ResourceKind::Geometry, source.name.clone(), bytes);
            let node = self.stage.graph.add(SceneNode {
                name: source.name,
                layer: Layer::Content,
                transform: Transform::from_matrix(source.world),
                kind: NodeKind::Mesh { geometry },
            });
            let mesh = AcceleratedMesh::build(source.mesh, self.config.bvh_leaf_size);
            log::debug!(
                "built BVH for {node}: {} triangles, {} nodes",
                mesh.mesh().triangle_count(),
                mesh.bvh().node_count()
            );
            meshes.push(LoadedMesh { node, mesh });
        }

        let scale = bounds.max_dimension();
        let scale = if scale > f32::EPSILON { scale } else { 1.0 };
        self.frame_bounds(&bounds, scale);
        log::info!(
            "model loaded: {} meshes, scale {scale:.3}, centre {:?}",
            meshes.len(),
            bounds.center().to_array()
        );
        self.model = Some(LoadedModel {
            meshes,
            bounds,
            scale,
        });
        Ok(())
    }

    fn frame_bounds(&mut self, bounds: &Aabb, scale: f32) {
        let half_fov = (self.camera.fov_degrees.to_radians() * 0.5).max(1e-3);
        let distance = (scale * 0.5) / half_fov.tan() * self.config.camera.framing_margin;
        let centre = bounds.center();

        self.camera.near = distance / 100.0;
        self.camera.far = distance * 100.0;
        self.camera.position = centre + Vec3::Z * distance;
        self.controls.target = centre;
        self.controls.max_distance = distance * 10.0;
        self.controls.update(&mut self.camera);
    }

    fn unload_model(&mut self) {
        let Some(model) = self.model.take() else {
            return;
        };
        for loaded in model.meshes {
            if let Some(SceneNode {
                kind: NodeKind::Mesh { geometry },
                ..
            }) = self.stage.graph.remove(loaded.node)
            {
                self.stage.gpu.release(geometry);
            }
        }
    }

    /// Inserts persisted hotspots for the current model.
    pub fn load_hotspots(&mut self, stored: &[StoredHotspot]) -> Result<usize> {
        let Some(model) = self.model.as_ref() else {
            return Err(HotspotError::NoModel);
        };
        let mut factory = MarkerFactory {
            pool: &mut self.pool,
            stage: &mut self.stage,
            scale: model.scale,
        };
        self.store.load_hotspots(stored, &mut factory)
    }

    pub fn stored_hotspots(&self, model_id: Option<&str>) -> Vec<StoredHotspot> {
        self.store.to_stored(model_id)
    }

    pub fn enter_placement_mode(&mut self) -> Result<()> {
        if self.model.is_none() {
            return Err(HotspotError::NoModel);
        }
        self.store.enter_placement_mode()
    }

    pub fn exit_placement_mode(&mut self) -> Result<()> {
        let mut factory = MarkerFactory {
            pool: &mut self.pool,
            stage: &mut self.stage,
            scale: self.model.as_ref().map_or(1.0, |model| model.scale),
        };
        self.store.exit_placement_mode(&mut factory)
    }

    fn pointer_ray(&self, pointer: Vec2) -> Option<Ray> {
        let ndc = normalize_pointer(pointer, &self.viewport)?;
        self.camera.ray_from_ndc(ndc)
    }

    /// Places (or moves) the draft where the pointer meets the model.
    /// Returns the draft marker, or `None` when the click was ignored.
    pub fn pointer_click(&mut self, pointer: Vec2) -> Result<Option<NodeId>> {
        if !self.store.phase().is_placing() {
            return Ok(None);
        }
        let Some(model) = self.model.as_ref() else {
            return Err(HotspotError::NoModel);
        };
        let Some(ray) = self.pointer_ray(pointer) else {
            log::warn!("pointer {pointer:?} is outside the viewport");
            return Ok(None);
        };

        let graph = &self.stage.graph;
        let targets = model.meshes.iter().filter_map(|loaded| {
            let node = graph.get(loaded.node)?;
            Some(RaycastTarget {
                object: loaded.node,
                layer: node.layer,
                mesh: &loaded.mesh,
                world: node.transform.matrix(),
            })
        });
        let raycaster = Raycaster::for_camera(&self.camera, Layer::Content);
        let Some(hit) = raycaster.intersect(&ray, targets) else {
            log::debug!("no surface under pointer {pointer:?}");
            return Ok(None);
        };

        let scale = model.scale;
        let anchor = surface_anchor(&hit, scale, self.config.surface_offset_factor);
        let mut factory = MarkerFactory {
            pool: &mut self.pool,
            stage: &mut self.stage,
            scale,
        };
        let node = self.store.place_draft(anchor, &mut factory)?;
        self.choreographer
            .focus(anchor.position, anchor.normal, &self.camera, &mut self.controls);
        Ok(Some(node))
    }

    /// Hover pass over the marker layer.
    pub fn pointer_move(&mut self, pointer: Vec2) -> Option<NodeId> {
        if !self.camera.layers.is_enabled(Layer::Markers) {
            self.hover.clear(&self.pool, &mut self.stage.graph);
            return None;
        }
        let Some(ray) = self.pointer_ray(pointer) else {
            self.hover.clear(&self.pool, &mut self.stage.graph);
            return None;
        };
        let raycaster = Raycaster::for_camera(&self.camera, Layer::Markers);
        self.hover
            .pointer_move(&ray, &raycaster, &self.pool, &mut self.stage.graph)
    }

    pub fn commit_draft(&mut self, label: &str, content: &str) -> Result<HotspotId> {
        let mut factory = MarkerFactory {
            pool: &mut self.pool,
            stage: &mut self.stage,
            scale: self.model.as_ref().map_or(1.0, |model| model.scale),
        };
        self.store.commit_draft(label, content, &mut factory)
    }

    pub fn cancel_draft(&mut self) -> Result<()> {
        let mut factory = MarkerFactory {
            pool: &mut self.pool,
            stage: &mut self.stage,
            scale: self.model.as_ref().map_or(1.0, |model| model.scale),
        };
        self.store.cancel_draft(&mut factory)
    }

    pub fn begin_edit(&mut self, id: HotspotId) -> Result<&EditBuffer> {
        self.store.begin_edit(id)
    }

    pub fn save_edit(&mut self, id: HotspotId, label: &str, content: &str) -> Result<()> {
        self.store.save_edit(id, label, content)
    }

    pub fn cancel_edit(&mut self) -> Result<()> {
        self.store.cancel_edit()
    }

    pub fn delete_hotspot(&mut self, id: HotspotId) -> Result<bool> {
        let mut factory = MarkerFactory {
            pool: &mut self.pool,
            stage: &mut self.stage,
            scale: self.model.as_ref().map_or(1.0, |model| model.scale),
        };
        let deleted = self.store.delete_hotspot(id, &mut factory)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(deleted)
    }

    /// Selects a hotspot and flies the camera to it.
    pub fn open_hotspot(&mut self, id: HotspotId) -> Result<&HotspotRecord> {
        let record = self.store.get_hotspot(id)?;
        self.choreographer
            .focus(record.position, record.normal, &self.camera, &mut self.controls);
        self.selected = Some(id);
        log::debug!("opened hotspot {id}");
        Ok(record)
    }

    pub fn close_hotspot(&mut self) {
        self.selected = None;
    }

    pub fn selected_hotspot(&self) -> Option<&HotspotRecord> {
        self.selected
            .and_then(|id| self.store.get_hotspot(id).ok())
    }

    /// Shows or hides the marker layer. Returns whether markers are visible.
    pub fn toggle_marker_visibility(&mut self) -> bool {
        let visible = self.camera.layers.toggle(Layer::Markers);
        if !visible {
            self.hover.clear(&self.pool, &mut self.stage.graph);
        }
        log::debug!("markers {}", if visible { "shown" } else { "hidden" });
        visible
    }

    /// Per-frame update.
    pub fn tick(&mut self, dt: f32) -> FlightStatus {
        self.choreographer
            .advance(dt, &mut self.camera, &mut self.controls)
    }

    /// Releases everything the session owns: markers first, then the marker
    /// pool, then lights and model content. Fails if any GPU allocation
    /// outlives the session.
    pub fn teardown(mut self) -> Result<()> {
        self.hover.clear(&self.pool, &mut self.stage.graph);
        let mut factory = MarkerFactory {
            pool: &mut self.pool,
            stage: &mut self.stage,
            scale: 1.0,
        };
        self.store.clear_all(&mut factory);
        self.unload_model();

        let Self {
            pool,
            mut stage,
            lights,
            ..
        } = self;
        pool.dispose(&mut stage.gpu).map_err(|(_, err)| err)?;
        for light in lights {
            stage.graph.remove(light);
        }

        if !stage.graph.is_empty() {
            log::warn!("{} scene nodes left after teardown", stage.graph.len());
        }
        let live = stage.gpu.live_count();
        if live > 0 {
            return Err(HotspotError::ResourceLeak(live));
        }
        log::debug!(
            "viewer torn down, {} GPU resources released",
            stage.gpu.released_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::MarkerVisual;
    use crate::orientation::DISC_AXIS;

    const EPSILON: f32 = 1e-4;

    fn viewer_with_cube() -> HotspotViewer {
        let mut viewer =
            HotspotViewer::new(HotspotConfig::default(), ViewportRect::from_size(800.0, 600.0));
        viewer
            .load_model(vec![MeshSource::primitive(PrimitiveKind::Cube, 1.0)])
            .expect("model");
        viewer
    }

    fn centre() -> Vec2 {
        Vec2::new(400.0, 300.0)
    }

    fn fly(viewer: &mut HotspotViewer) {
        while viewer.tick(1.0 / 30.0) == FlightStatus::InFlight {}
    }

    #[test]
    fn model_load_frames_camera() {
        let viewer = viewer_with_cube();
        assert!((viewer.model_scale() - 1.0).abs() < EPSILON);
        assert_eq!(viewer.controls().target, Vec3::ZERO);

        let distance = 0.5 / (37.5f32).to_radians().tan() * 1.5;
        assert!((viewer.camera().position - Vec3::Z * distance).length() < EPSILON);
        assert!((viewer.camera().near - distance / 100.0).abs() < EPSILON);
        assert!(viewer.camera().layers.is_enabled(Layer::Markers));

        let bounds = viewer.model_bounds().expect("bounds");
        assert!((bounds.min - Vec3::splat(-0.5)).length() < EPSILON);
        assert!((bounds.max - Vec3::splat(0.5)).length() < EPSILON);
    }

    #[test]
    fn manual_orbit_waits_for_camera_flight() {
        let mut viewer = viewer_with_cube();
        let distance = viewer.camera().position.length();

        assert!(viewer.orbit(std::f32::consts::FRAC_PI_2, 0.0));
        assert!((viewer.camera().position - Vec3::X * distance).length() < 1e-3);
        assert!(viewer.zoom(2.0));
        assert!((viewer.camera().position - Vec3::X * distance * 2.0).length() < 1e-3);
        assert!(!viewer.zoom(0.0));

        viewer.enter_placement_mode().expect("placement");
        viewer.pointer_click(centre()).expect("click").expect("hit");
        assert!(viewer.is_flying());
        let before = viewer.camera().position;
        assert!(!viewer.orbit(0.5, 0.0));
        assert!(!viewer.zoom(0.5));
        assert_eq!(viewer.camera().position, before);

        fly(&mut viewer);
        assert!(viewer.zoom(0.5));
    }

    #[test]
    fn resize_remaps_pointer_to_new_viewport() {
        let mut viewer = viewer_with_cube();
        viewer.resize(ViewportRect::from_size(400.0, 400.0));
        assert!((viewer.camera().aspect - 1.0).abs() < EPSILON);

        viewer.enter_placement_mode().expect("placement");
        viewer.pointer_click(Vec2::new(200.0, 200.0)).expect("click").expect("hit");
        let position = viewer.store().draft().and_then(|draft| draft.position).expect("position");
        assert!((position - Vec3::new(0.0, 0.0, 0.51)).length() < EPSILON);
    }

    #[test]
    fn closing_a_hotspot_clears_the_selection() {
        let mut viewer = viewer_with_cube();
        viewer.enter_placement_mode().expect("placement");
        viewer.pointer_click(centre()).expect("click");
        let id = viewer.commit_draft("Crack", "Hairline fracture").expect("commit");

        assert_eq!(viewer.open_hotspot(id).expect("open").label, "Crack");
        assert_eq!(viewer.selected_hotspot().map(|record| record.id), Some(id));
        viewer.close_hotspot();
        assert!(viewer.selected_hotspot().is_none());
        assert!(viewer.store().get_hotspot(id).is_ok());
    }

    #[test]
    fn click_places_draft_offset_from_surface() {
        let mut viewer = viewer_with_cube();
        viewer.enter_placement_mode().expect("placement");
        let node = viewer.pointer_click(centre()).expect("click").expect("hit");

        let draft = viewer.store().draft().expect("draft");
        assert_eq!(draft.marker(), Some(node));
        let normal = draft.normal.expect("normal");
        assert!((normal - Vec3::Z).length() < EPSILON);
        let position = draft.position.expect("position");
        assert!((position - Vec3::new(0.0, 0.0, 0.51)).length() < EPSILON);
        assert!(viewer.is_flying());
        assert!(!viewer.controls().is_enabled());

        fly(&mut viewer);
        assert!((viewer.camera().position - Vec3::new(0.0, 0.0, 36.51)).length() < 1e-3);
        assert!(viewer.controls().is_enabled());
    }

    #[test]
    fn click_outside_model_keeps_placing() {
        let mut viewer =
            HotspotViewer::new(HotspotConfig::default(), ViewportRect::from_size(800.0, 600.0));
        viewer
            .load_model(vec![MeshSource::primitive(PrimitiveKind::Sphere, 0.2)])
            .expect("model");
        viewer.enter_placement_mode().expect("placement");

        // The framed sphere leaves the viewport corners empty.
        assert_eq!(viewer.pointer_click(Vec2::new(2.0, 2.0)).expect("click"), None);
        assert_eq!(viewer.phase(), Phase::Placing);
        assert!(viewer.store().draft().is_none());
        assert!(!viewer.is_flying());

        assert!(viewer.pointer_click(centre()).expect("click").is_some());
        assert_eq!(viewer.phase(), Phase::ReviewingDraft);
    }

    #[test]
    fn idle_clicks_are_ignored() {
        let mut viewer = viewer_with_cube();
        assert_eq!(viewer.pointer_click(centre()).expect("click"), None);
        assert!(viewer.store().draft().is_none());
    }

    #[test]
    fn committed_marker_matches_record() {
        let mut viewer = viewer_with_cube();
        viewer.enter_placement_mode().expect("placement");
        viewer.pointer_click(centre()).expect("click");
        let id = viewer.commit_draft("Crack", "Hairline fracture").expect("commit");
        assert_eq!(id, 1);

        let marker = *viewer.store().marker_for_id(id).expect("marker");
        let node = viewer.stage().graph.get(marker.node).expect("node");
        assert_eq!(node.name, "HH_Hotspot_1");
        assert_eq!(node.layer, Layer::Markers);
        assert!((node.transform.rotation * DISC_AXIS - Vec3::Z).length() < EPSILON);
    }

    #[test]
    fn hover_highlights_marker_under_pointer() {
        let mut viewer = viewer_with_cube();
        viewer.enter_placement_mode().expect("placement");
        viewer.pointer_click(centre()).expect("click");
        viewer.commit_draft("Crack", "Hairline fracture").expect("commit");
        fly(&mut viewer);

        let marker = viewer.store().markers()[0].node;
        let screen = viewer
            .camera()
            .project(viewer.store().markers()[0].position)
            .expect("visible");
        let pointer = Vec2::new((screen.x + 1.0) * 400.0, (1.0 - screen.y) * 300.0);
        assert_eq!(viewer.pointer_move(pointer), Some(marker));
        assert_eq!(
            viewer.pool().visual(&viewer.stage().graph, marker),
            Some(MarkerVisual::Highlighted)
        );

        assert!(!viewer.toggle_marker_visibility());
        assert_eq!(viewer.pointer_move(pointer), None);
        assert_eq!(
            viewer.pool().visual(&viewer.stage().graph, marker),
            Some(MarkerVisual::Default)
        );
        assert!(viewer.toggle_marker_visibility());
    }

    #[test]
    fn open_unknown_hotspot_is_not_found() {
        let mut viewer = viewer_with_cube();
        let err = viewer.open_hotspot(42).expect_err("missing");
        assert_eq!(err.user_message(), "Could not find hotspot information");
        assert!(viewer.selected_hotspot().is_none());
    }

    #[test]
    fn placement_requires_a_model() {
        let mut viewer =
            HotspotViewer::new(HotspotConfig::default(), ViewportRect::from_size(800.0, 600.0));
        assert!(matches!(viewer.enter_placement_mode(), Err(HotspotError::NoModel)));
        assert!(matches!(viewer.load_hotspots(&[]), Err(HotspotError::NoModel)));
        assert!(matches!(viewer.load_model(Vec::new()), Err(HotspotError::NoModel)));
    }

    #[test]
    fn repeated_model_loads_leave_no_leaks() {
        let mut viewer = viewer_with_cube();
        for round in 0..3 {
            viewer.enter_placement_mode().expect("placement");
            viewer.pointer_click(centre()).expect("click");
            viewer.commit_draft("Crack", "Hairline fracture").expect("commit");
            viewer.enter_placement_mode().expect("placement");
            viewer.pointer_click(centre()).expect("click");

            let kind = if round % 2 == 0 { PrimitiveKind::Sphere } else { PrimitiveKind::Cube };
            viewer
                .load_model(vec![MeshSource::primitive(kind, 2.0)])
                .expect("reload");
            assert!(viewer.store().is_empty());
            assert_eq!(viewer.pool().live_markers(), 0);
            assert_eq!(viewer.stage().gpu.live_of(ResourceKind::Geometry), 2);
        }
        viewer.teardown().expect("clean teardown");
    }

    #[test]
    fn teardown_with_open_draft_is_clean() {
        let mut viewer = viewer_with_cube();
        viewer.enter_placement_mode().expect("placement");
        viewer.pointer_click(centre()).expect("click");
        viewer.teardown().expect("clean teardown");
    }
}
