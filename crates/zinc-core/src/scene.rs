//! Scene graph: root region, camera and scene-wide defaults

use std::collections::BTreeMap;

use uuid::Uuid;

use crate::bounds::BoundingBox;
use crate::camera::{Camera, Viewport};
use crate::config::SceneConfig;
use crate::loader::IsoDuration;
use crate::marker::MarkerCluster;
use crate::primitive::ZincObject;
use crate::region::{Pickable, RegionTree, RenderOptions, SceneListener};

/// A renderable scene
///
/// Owns the region tree; everything else refers to regions and objects by id.
#[derive(Debug)]
pub struct Scene {
    tree: RegionTree,
    camera: Camera,
    viewports: BTreeMap<String, Viewport>,
    duration: f32,
    original_duration: Option<f64>,
    metadata_time_stamps: BTreeMap<String, f64>,
    display_markers: bool,
    marker_cluster: MarkerCluster,
    play_rate: f32,
    config: SceneConfig,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl Scene {
    pub fn new(config: SceneConfig) -> Self {
        Self {
            tree: RegionTree::new(),
            camera: Camera::default(),
            viewports: BTreeMap::new(),
            duration: config.default_duration,
            original_duration: None,
            metadata_time_stamps: BTreeMap::new(),
            display_markers: config.display_markers,
            marker_cluster: MarkerCluster::new(),
            play_rate: config.play_rate,
            config,
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn tree(&self) -> &RegionTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut RegionTree {
        &mut self.tree
    }

    pub fn root(&self) -> Uuid {
        self.tree.root()
    }

    pub fn add_listener(&mut self, listener: SceneListener) {
        self.tree.add_listener(listener);
    }

    // ============== Objects ==============

    /// Attach an object to the root region with the scene duration
    pub fn add_zinc_object(&mut self, object: ZincObject) -> Option<Uuid> {
        self.add_zinc_object_to(self.tree.root(), object)
    }

    /// Attach an object to `region` with the scene duration
    pub fn add_zinc_object_to(&mut self, region: Uuid, mut object: ZincObject) -> Option<Uuid> {
        object.set_duration(self.duration);
        self.tree.add_zinc_object(region, object)
    }

    pub fn object(&self, id: Uuid) -> Option<&ZincObject> {
        self.tree.object(id)
    }

    pub fn object_mut(&mut self, id: Uuid) -> Option<&mut ZincObject> {
        self.tree.object_mut(id)
    }

    pub fn bounding_box(&mut self) -> Option<BoundingBox> {
        let root = self.tree.root();
        self.tree.bounding_box(root, true)
    }

    pub fn pickable_objects(&mut self) -> Vec<Pickable> {
        let root = self.tree.root();
        self.tree.pickable_objects(root, true)
    }

    // ============== Camera and views ==============

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Apply a viewport to the camera, returns false if it is unusable
    pub fn load_view(&mut self, viewport: &Viewport) -> bool {
        self.camera.apply_viewport(viewport)
    }

    pub fn add_viewport(&mut self, name: &str, viewport: Viewport) {
        self.viewports.insert(name.to_string(), viewport);
    }

    pub fn viewport(&self, name: &str) -> Option<&Viewport> {
        self.viewports.get(name)
    }

    pub fn viewport_names(&self) -> impl Iterator<Item = &str> {
        self.viewports.keys().map(String::as_str)
    }

    /// Switch the camera to a named viewport
    pub fn set_viewport(&mut self, name: &str) -> bool {
        match self.viewports.get(name) {
            Some(viewport) => self.camera.apply_viewport(viewport),
            None => false,
        }
    }

    /// Fit the camera to everything visible; no-op for an empty scene
    pub fn view_all(&mut self) {
        if let Some(bbox) = self.bounding_box() {
            self.camera.fit_all(bbox.center(), bbox.radius());
        }
    }

    // ============== Time ==============

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Set the duration of the scene and every object in it
    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration;
        let root = self.tree.root();
        self.tree.set_duration(root, duration);
    }

    pub fn reset_duration(&mut self) {
        self.set_duration(self.config.default_duration);
    }

    /// Returns false and leaves the duration alone when nothing was parsed
    pub fn set_duration_from_iso(&mut self, duration: &IsoDuration) -> bool {
        match duration.to_millis() {
            Some(millis) => {
                self.set_duration(millis as f32);
                true
            }
            None => false,
        }
    }

    /// Duration of the recording the scene was derived from, in milliseconds
    pub fn original_duration(&self) -> Option<f64> {
        self.original_duration
    }

    pub fn set_original_duration_from_iso(&mut self, duration: &IsoDuration) -> bool {
        match duration.to_millis() {
            Some(millis) => {
                self.original_duration = Some(millis);
                true
            }
            None => false,
        }
    }

    pub fn add_metadata_time_stamp(&mut self, label: &str, time: &IsoDuration) -> bool {
        match time.to_millis() {
            Some(millis) => {
                self.metadata_time_stamps.insert(label.to_string(), millis);
                true
            }
            None => false,
        }
    }

    pub fn metadata_time_stamps(&self) -> &BTreeMap<String, f64> {
        &self.metadata_time_stamps
    }

    /// Forget settings read from a previous metadata document
    pub fn reset_metadata(&mut self) {
        self.original_duration = None;
        self.metadata_time_stamps.clear();
    }

    pub fn set_morph_time(&mut self, time: f32) {
        let root = self.tree.root();
        self.tree.set_morph_time(root, time, true);
    }

    pub fn current_time(&self) -> Option<f32> {
        self.tree.current_time(self.tree.root())
    }

    pub fn is_time_varying(&self) -> bool {
        self.tree.is_time_varying(self.tree.root())
    }

    pub fn play_rate(&self) -> f32 {
        self.play_rate
    }

    pub fn set_play_rate(&mut self, play_rate: f32) {
        self.play_rate = play_rate;
    }

    // ============== Markers ==============

    pub fn display_markers(&self) -> bool {
        self.display_markers
    }

    pub fn set_display_markers(&mut self, display: bool) {
        if self.display_markers != display {
            self.display_markers = display;
            self.marker_cluster.marker_update_required = true;
        }
    }

    pub fn marker_cluster(&self) -> &MarkerCluster {
        &self.marker_cluster
    }

    // ============== Per-frame ==============

    /// Advance the scene by `delta` seconds of wall time
    pub fn render(&mut self, delta: f32, play_animation: bool) {
        let root = self.tree.root();
        let mut options = RenderOptions {
            display_markers: self.display_markers,
            marker_cluster: Some(&mut self.marker_cluster),
        };
        self.tree.render_geometries(
            root,
            self.play_rate,
            delta,
            play_animation,
            Some(&self.camera),
            &mut options,
            true,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use approx::assert_relative_eq;
    use glam::Vec3;

    use super::*;
    use crate::geometry::{Material, MeshGeometry};
    use crate::region::SceneEvent;

    fn cube(offset: f32) -> ZincObject {
        let mut object = ZincObject::surface();
        object.set_mesh(
            MeshGeometry::from_positions(vec![
                [offset - 1.0, -1.0, -1.0],
                [offset + 1.0, 1.0, 1.0],
            ]),
            Material::default(),
            false,
            false,
        );
        object
    }

    #[test]
    fn test_objects_take_scene_duration() {
        let mut scene = Scene::default();
        scene.set_duration_from_iso(&IsoDuration::parse("PT2S"));
        let id = scene.add_zinc_object(cube(0.0)).unwrap();
        assert_eq!(scene.duration(), 2000.0);
        assert_eq!(scene.object(id).unwrap().duration(), 2000.0);

        scene.reset_duration();
        assert_eq!(scene.object(id).unwrap().duration(), 3000.0);
    }

    #[test]
    fn test_unset_duration_ignored() {
        let mut scene = Scene::default();
        assert!(!scene.set_duration_from_iso(&IsoDuration::parse("two seconds")));
        assert_eq!(scene.duration(), 3000.0);
    }

    #[test]
    fn test_metadata_reset() {
        let mut scene = Scene::default();
        scene.set_original_duration_from_iso(&IsoDuration::parse("PT1M"));
        scene.add_metadata_time_stamp("start", &IsoDuration::parse("PT0S"));
        scene.add_metadata_time_stamp("end", &IsoDuration::parse("PT30S"));
        assert_eq!(scene.original_duration(), Some(60_000.0));
        assert_eq!(scene.metadata_time_stamps().get("end"), Some(&30_000.0));

        scene.reset_metadata();
        assert_eq!(scene.original_duration(), None);
        assert!(scene.metadata_time_stamps().is_empty());
    }

    #[test]
    fn test_view_all_fits_scene() {
        let mut scene = Scene::default();
        scene.add_zinc_object(cube(10.0));
        scene.view_all();
        assert_relative_eq!(scene.camera().target.x, 10.0);
        assert!(scene.camera().distance() >= 1.0);
    }

    #[test]
    fn test_named_viewports() {
        let mut scene = Scene::default();
        let side = Viewport {
            near_plane: 0.5,
            far_plane: 500.0,
            eye_position: [50.0, 0.0, 0.0],
            target_position: [0.0, 0.0, 0.0],
            up_vector: [0.0, 0.0, 1.0],
            view_angle: 30.0,
        };
        scene.add_viewport("side", side);
        assert!(!scene.set_viewport("top"));
        assert!(scene.set_viewport("side"));
        assert_eq!(scene.camera().position, Vec3::new(50.0, 0.0, 0.0));
        assert_eq!(scene.viewport_names().collect::<Vec<_>>(), vec!["side"]);
    }

    #[test]
    fn test_listener_sees_added_objects() {
        let mut scene = Scene::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        scene.add_listener(Box::new(move |event| {
            if let SceneEvent::ObjectAdded { object, .. } = event {
                sink.borrow_mut().push(*object);
            }
        }));
        let id = scene.add_zinc_object(cube(0.0)).unwrap();
        assert_eq!(*seen.borrow(), vec![id]);
    }

    #[test]
    fn test_render_plays_time() {
        let mut scene = Scene::default();
        let id = scene.add_zinc_object(cube(0.0)).unwrap();
        scene.set_play_rate(1000.0);
        scene.render(0.5, true);
        assert_relative_eq!(scene.object(id).unwrap().current_time(), 500.0);
        assert_eq!(scene.current_time(), Some(500.0));
    }
}
