//! Time propagation and the per-frame tick

use std::collections::HashSet;

use uuid::Uuid;

use crate::camera::Camera;
use crate::marker::MarkerCluster;
use crate::primitive::RenderOutcome;

use super::RegionTree;

/// Scene-level options for one render tick
#[derive(Debug, Default)]
pub struct RenderOptions<'a> {
    /// Scene-wide marker display flag
    pub display_markers: bool,
    pub marker_cluster: Option<&'a mut MarkerCluster>,
}

impl RegionTree {
    /// Set the time of every object in the region (and descendants)
    pub fn set_morph_time(&mut self, region: Uuid, time: f32, recurse: bool) {
        for id in self.all_object_ids(region, recurse) {
            if let Some(object) = self.objects.get_mut(&id) {
                object.set_morph_time(time);
            }
        }
    }

    /// Time of the first object found, depth-first; `None` when the
    /// subtree holds no objects
    pub fn current_time(&self, region: Uuid) -> Option<f32> {
        let r = self.regions.get(&region)?;
        if let Some(first) = r.objects.first() {
            return self.objects.get(first).map(|o| o.current_time());
        }
        r.children
            .iter()
            .find_map(|child| self.current_time(*child))
    }

    pub fn is_time_varying(&self, region: Uuid) -> bool {
        self.all_objects(region, true)
            .iter()
            .any(|object| object.is_time_varying())
    }

    /// Set the default duration of the region, its objects and descendants
    pub fn set_duration(&mut self, region: Uuid, duration: f32) {
        let mut regions = vec![region];
        regions.extend(self.child_regions(region, true));
        for id in regions {
            if let Some(r) = self.regions.get_mut(&id) {
                r.duration = duration;
            }
        }
        for id in self.all_object_ids(region, true) {
            if let Some(object) = self.objects.get_mut(&id) {
                object.set_duration(duration);
            }
        }
    }

    /// Per-frame tick
    ///
    /// Advances every object by `play_rate * delta`, then recomputes marker
    /// banding when not playing and the cluster is dirty.
    #[allow(clippy::too_many_arguments)]
    pub fn render_geometries(
        &mut self,
        region: Uuid,
        play_rate: f32,
        delta: f32,
        play_animation: bool,
        camera: Option<&Camera>,
        options: &mut RenderOptions<'_>,
        recurse: bool,
    ) {
        let ids = self.all_object_ids(region, recurse);
        let mut marker_changed = false;
        for id in &ids {
            let Some(object) = self.objects.get_mut(id) else {
                continue;
            };
            let outcome: RenderOutcome = object.render(
                play_rate * delta,
                play_animation,
                camera,
                options.display_markers,
            );
            marker_changed |= outcome.marker_changed;
            if outcome.pickable_update_required
                && let Some(r) = object.region.and_then(|r| self.regions.get_mut(&r))
            {
                r.pickable_update_required = true;
            }
        }

        let Some(cluster) = options.marker_cluster.as_deref_mut() else {
            return;
        };
        if marker_changed {
            cluster.marker_update_required = true;
        }
        if !play_animation && cluster.marker_update_required {
            let members: HashSet<Uuid> = ids.into_iter().collect();
            let markers = self
                .objects
                .iter_mut()
                .filter(|(id, object)| members.contains(*id) && object.visible())
                .filter_map(|(_, object)| object.marker_mut());
            cluster.calculate(markers);
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec3;

    use super::*;
    use crate::geometry::{Material, MeshGeometry};
    use crate::primitive::ZincObject;

    fn object_at(z: f32, duration: f32) -> ZincObject {
        let mut object = ZincObject::surface();
        object.set_mesh(
            MeshGeometry::from_positions(vec![[0.0, 0.0, z], [1.0, 0.0, z]]),
            Material::default(),
            false,
            false,
        );
        object.set_duration(duration);
        object.set_name(Some("named"));
        object
    }

    #[test]
    fn test_current_time_none_when_empty() {
        let mut tree = RegionTree::new();
        let root = tree.root();
        let child = tree.create_child(root, "child").unwrap();
        assert_eq!(tree.current_time(root), None);

        let id = tree.add_zinc_object(child, object_at(0.0, 100.0)).unwrap();
        tree.object_mut(id).unwrap().set_morph_time(40.0);
        assert_eq!(tree.current_time(root), Some(40.0));
    }

    #[test]
    fn test_set_morph_time_recurses() {
        let mut tree = RegionTree::new();
        let root = tree.root();
        let a = tree.create_child_from_path(root, "a").unwrap();
        let b = tree.create_child_from_path(root, "a/b").unwrap();
        let top = tree.add_zinc_object(a, object_at(0.0, 100.0)).unwrap();
        let deep = tree.add_zinc_object(b, object_at(0.0, 100.0)).unwrap();

        tree.set_morph_time(root, 25.0, true);
        assert_eq!(tree.object(top).unwrap().current_time(), 25.0);
        assert_eq!(tree.object(deep).unwrap().current_time(), 25.0);

        tree.set_morph_time(a, 50.0, false);
        assert_eq!(tree.object(top).unwrap().current_time(), 50.0);
        assert_eq!(tree.object(deep).unwrap().current_time(), 25.0);
    }

    #[test]
    fn test_set_duration_propagates() {
        let mut tree = RegionTree::new();
        let root = tree.root();
        let child = tree.create_child(root, "child").unwrap();
        let id = tree.add_zinc_object(child, object_at(0.0, 100.0)).unwrap();
        tree.set_duration(root, 2000.0);
        assert_eq!(tree.region(child).unwrap().duration(), 2000.0);
        assert_eq!(tree.object(id).unwrap().duration(), 2000.0);
    }

    #[test]
    fn test_render_advances_by_play_rate() {
        let mut tree = RegionTree::new();
        let root = tree.root();
        let id = tree.add_zinc_object(root, object_at(0.0, 1000.0)).unwrap();
        let mut options = RenderOptions::default();
        tree.render_geometries(root, 500.0, 0.5, true, None, &mut options, true);
        assert_relative_eq!(tree.object(id).unwrap().current_time(), 250.0);
    }

    #[test]
    fn test_render_recomputes_marker_cluster() {
        let mut tree = RegionTree::new();
        let root = tree.root();
        tree.add_zinc_object(root, object_at(0.0, 1000.0));
        tree.add_zinc_object(root, object_at(0.0, 1000.0));
        let far = tree.add_zinc_object(root, object_at(-50.0, 1000.0)).unwrap();

        let mut camera = Camera::default();
        camera.position = Vec3::new(0.0, 0.0, 20.0);
        let mut cluster = MarkerCluster::new();
        let mut options = RenderOptions {
            display_markers: true,
            marker_cluster: Some(&mut cluster),
        };
        tree.render_geometries(root, 1.0, 0.0, false, Some(&camera), &mut options, true);

        assert!(tree.region(root).unwrap().pickable_update_required);
        assert!(!cluster.marker_update_required);
        assert!(cluster.range().is_some());
        let marker = tree.object(far).unwrap().marker().unwrap();
        assert!(marker.is_enabled());
        assert!(marker.scale() < 1.0);
    }

    #[test]
    fn test_marker_cluster_skips_hidden_objects() {
        let mut tree = RegionTree::new();
        let root = tree.root();
        let near = tree.add_zinc_object(root, object_at(0.0, 1000.0)).unwrap();
        let mid = tree.add_zinc_object(root, object_at(-10.0, 1000.0)).unwrap();
        let hidden = tree.add_zinc_object(root, object_at(-50.0, 1000.0)).unwrap();
        tree.object_mut(hidden).unwrap().set_visibility(false);

        let mut camera = Camera::default();
        camera.position = Vec3::new(0.0, 0.0, 20.0);
        let mut cluster = MarkerCluster::new();
        let mut options = RenderOptions {
            display_markers: true,
            marker_cluster: Some(&mut cluster),
        };
        tree.render_geometries(root, 1.0, 0.0, false, Some(&camera), &mut options, true);

        let depth = |id: Uuid| tree.object(id).unwrap().marker().unwrap().ndc_depth();
        let (min, max) = cluster.range().unwrap();
        assert_relative_eq!(min, depth(near).min(depth(mid)));
        assert_relative_eq!(max, depth(near).max(depth(mid)));
        assert!(
            tree.object(hidden)
                .unwrap()
                .marker()
                .is_none_or(|marker| !marker.is_enabled())
        );
    }
}
