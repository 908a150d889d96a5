//! Traversal and query methods for RegionTree

use uuid::Uuid;

use crate::bounds::{BoundingBox, union_option};
use crate::primitive::{PrimitiveType, ZincObject};

use super::RegionTree;

/// Something a picking collaborator can hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pickable {
    Object(Uuid),
    /// The marker of the given object
    Marker(Uuid),
}

impl RegionTree {
    // ============== Traversal ==============

    /// Object ids of the region, then of each descendant (depth-first)
    pub fn all_object_ids(&self, region: Uuid, recurse: bool) -> Vec<Uuid> {
        let mut result = Vec::new();
        self.collect_objects(region, recurse, &mut result);
        result
    }

    fn collect_objects(&self, region: Uuid, recurse: bool, result: &mut Vec<Uuid>) {
        let Some(r) = self.regions.get(&region) else {
            return;
        };
        result.extend_from_slice(&r.objects);
        if recurse {
            for child in &r.children {
                self.collect_objects(*child, recurse, result);
            }
        }
    }

    pub fn all_objects(&self, region: Uuid, recurse: bool) -> Vec<&ZincObject> {
        self.all_object_ids(region, recurse)
            .into_iter()
            .filter_map(|id| self.objects.get(&id))
            .collect()
    }

    /// Direct children, followed by their descendants when `recurse` is set
    pub fn child_regions(&self, region: Uuid, recurse: bool) -> Vec<Uuid> {
        let Some(r) = self.regions.get(&region) else {
            return Vec::new();
        };
        let mut result = r.children.clone();
        if recurse {
            for child in &r.children {
                result.extend(self.child_regions(*child, recurse));
            }
        }
        result
    }

    /// Call `f` on every object of the given type
    pub fn for_each_of_type(
        &mut self,
        region: Uuid,
        primitive_type: PrimitiveType,
        recurse: bool,
        mut f: impl FnMut(&mut ZincObject),
    ) {
        for id in self.all_object_ids(region, recurse) {
            if let Some(object) = self.objects.get_mut(&id)
                && object.primitive_type() == primitive_type
            {
                f(object);
            }
        }
    }

    pub fn for_each_geometry(&mut self, region: Uuid, recurse: bool, f: impl FnMut(&mut ZincObject)) {
        self.for_each_of_type(region, PrimitiveType::Surface, recurse, f);
    }

    pub fn for_each_glyphset(&mut self, region: Uuid, recurse: bool, f: impl FnMut(&mut ZincObject)) {
        self.for_each_of_type(region, PrimitiveType::Glyphset, recurse, f);
    }

    pub fn for_each_pointset(&mut self, region: Uuid, recurse: bool, f: impl FnMut(&mut ZincObject)) {
        self.for_each_of_type(region, PrimitiveType::Points, recurse, f);
    }

    pub fn for_each_line(&mut self, region: Uuid, recurse: bool, f: impl FnMut(&mut ZincObject)) {
        self.for_each_of_type(region, PrimitiveType::Lines, recurse, f);
    }

    // ============== Lookup ==============

    /// Objects whose group name matches case-insensitively
    pub fn find_objects_with_group_name(
        &self,
        region: Uuid,
        group_name: Option<&str>,
        recurse: bool,
    ) -> Vec<Uuid> {
        self.all_object_ids(region, recurse)
            .into_iter()
            .filter(|id| {
                self.objects
                    .get(id)
                    .is_some_and(|o| o.has_group_name(group_name))
            })
            .collect()
    }

    pub fn find_objects_with_anatomical_id(
        &self,
        region: Uuid,
        anatomical_id: &str,
        recurse: bool,
    ) -> Vec<Uuid> {
        self.all_object_ids(region, recurse)
            .into_iter()
            .filter(|id| {
                self.objects
                    .get(id)
                    .is_some_and(|o| o.anatomical_id.as_deref() == Some(anatomical_id))
            })
            .collect()
    }

    fn find_typed_with_group_name(
        &self,
        region: Uuid,
        group_name: &str,
        primitive_type: PrimitiveType,
        recurse: bool,
    ) -> Vec<Uuid> {
        self.find_objects_with_group_name(region, Some(group_name), recurse)
            .into_iter()
            .filter(|id| {
                self.objects
                    .get(id)
                    .is_some_and(|o| o.primitive_type() == primitive_type)
            })
            .collect()
    }

    pub fn find_geometries_with_group_name(&self, region: Uuid, group_name: &str, recurse: bool) -> Vec<Uuid> {
        self.find_typed_with_group_name(region, group_name, PrimitiveType::Surface, recurse)
    }

    pub fn find_pointsets_with_group_name(&self, region: Uuid, group_name: &str, recurse: bool) -> Vec<Uuid> {
        self.find_typed_with_group_name(region, group_name, PrimitiveType::Points, recurse)
    }

    pub fn find_glyphsets_with_group_name(&self, region: Uuid, group_name: &str, recurse: bool) -> Vec<Uuid> {
        self.find_typed_with_group_name(region, group_name, PrimitiveType::Glyphset, recurse)
    }

    pub fn find_lines_with_group_name(&self, region: Uuid, group_name: &str, recurse: bool) -> Vec<Uuid> {
        self.find_typed_with_group_name(region, group_name, PrimitiveType::Lines, recurse)
    }

    pub fn object_is_in_region(&self, region: Uuid, object: Uuid, recurse: bool) -> bool {
        let Some(r) = self.regions.get(&region) else {
            return false;
        };
        if r.objects.contains(&object) {
            return true;
        }
        recurse
            && r
                .children
                .iter()
                .any(|child| self.object_is_in_region(*child, object, recurse))
    }

    // ============== Bounds ==============

    /// Union of the boxes of the region's objects (and descendants')
    ///
    /// Object boxes are already in world space; `None` when no object
    /// contributes a box.
    pub fn bounding_box(&mut self, region: Uuid, recurse: bool) -> Option<BoundingBox> {
        let mut result = None;
        for id in self.all_object_ids(region, recurse) {
            if let Some(object) = self.objects.get_mut(&id) {
                result = union_option(result, object.bounding_box());
            }
        }
        result
    }

    // ============== Picking ==============

    pub fn check_pickable_update_required(&self, region: Uuid, recurse: bool) -> bool {
        let Some(r) = self.regions.get(&region) else {
            return false;
        };
        r.pickable_update_required
            || (recurse
                && r
                    .children
                    .iter()
                    .any(|child| self.check_pickable_update_required(*child, recurse)))
    }

    /// Visible objects and their enabled markers
    ///
    /// Hidden regions are skipped along with their subtree. Visited regions
    /// have their pickable-update flag cleared.
    pub fn pickable_objects(&mut self, region: Uuid, recurse: bool) -> Vec<Pickable> {
        let mut result = Vec::new();
        self.collect_pickables(region, recurse, &mut result);
        result
    }

    fn collect_pickables(&mut self, region: Uuid, recurse: bool, result: &mut Vec<Pickable>) {
        let Some(r) = self.regions.get(&region) else {
            return;
        };
        if !r.visible {
            return;
        }
        let objects = r.objects.clone();
        let children = r.children.clone();
        for id in objects {
            let Some(object) = self.objects.get(&id) else {
                continue;
            };
            if !object.visible() {
                continue;
            }
            if object.marker().is_some_and(|m| m.is_enabled()) {
                result.push(Pickable::Marker(id));
            }
            result.push(Pickable::Object(id));
        }
        if recurse {
            for child in children {
                self.collect_pickables(child, recurse, result);
            }
        }
        if let Some(r) = self.regions.get_mut(&region) {
            r.pickable_update_required = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Material, MeshGeometry};
    use glam::Vec3;

    fn object(kind: PrimitiveType, name: &str, positions: Vec<[f32; 3]>) -> ZincObject {
        let mut object = match kind {
            PrimitiveType::Surface => ZincObject::surface(),
            PrimitiveType::Lines => ZincObject::lines(),
            PrimitiveType::Points => ZincObject::points(),
            PrimitiveType::Glyphset => {
                ZincObject::glyphset(crate::primitive::GlyphsetData::default(), false)
            }
        };
        object.set_mesh(
            MeshGeometry::from_positions(positions),
            Material::default(),
            false,
            false,
        );
        object.set_name(Some(name));
        object
    }

    fn populated() -> (RegionTree, Uuid, Uuid) {
        let mut tree = RegionTree::new();
        let root = tree.root();
        let child = tree.create_child(root, "child").unwrap();
        tree.add_zinc_object(root, object(PrimitiveType::Surface, "Skin", vec![[0.0; 3]]));
        tree.add_zinc_object(root, object(PrimitiveType::Lines, "nerve", vec![[1.0; 3]]));
        tree.add_zinc_object(child, object(PrimitiveType::Surface, "skin", vec![[5.0; 3]]));
        tree.add_zinc_object(child, object(PrimitiveType::Points, "dots", vec![[-5.0; 3]]));
        (tree, root, child)
    }

    #[test]
    fn test_depth_first_order() {
        let (tree, root, child) = populated();
        let all = tree.all_object_ids(root, true);
        assert_eq!(all.len(), 4);
        assert_eq!(&all[2..], tree.region(child).unwrap().objects());
        assert_eq!(tree.all_object_ids(root, false).len(), 2);
    }

    #[test]
    fn test_find_with_group_name_case_insensitive() {
        let (tree, root, _) = populated();
        assert_eq!(tree.find_objects_with_group_name(root, Some("SKIN"), true).len(), 2);
        assert_eq!(tree.find_objects_with_group_name(root, Some("skin"), false).len(), 1);
        assert_eq!(tree.find_geometries_with_group_name(root, "nerve", true).len(), 0);
        assert_eq!(tree.find_lines_with_group_name(root, "nerve", true).len(), 1);
        assert_eq!(tree.find_pointsets_with_group_name(root, "dots", true).len(), 1);
        assert!(tree.find_glyphsets_with_group_name(root, "dots", true).is_empty());
    }

    #[test]
    fn test_find_with_anatomical_id() {
        let (mut tree, root, child) = populated();
        let id = tree.region(child).unwrap().objects()[0];
        tree.object_mut(id).unwrap().anatomical_id = Some("UBERON:0002107".to_string());
        assert_eq!(tree.find_objects_with_anatomical_id(root, "UBERON:0002107", true), vec![id]);
        assert!(tree.find_objects_with_anatomical_id(root, "UBERON:0002107", false).is_empty());
    }

    #[test]
    fn test_for_each_geometry() {
        let (mut tree, root, _) = populated();
        let mut count = 0;
        tree.for_each_geometry(root, true, |object| {
            object.set_colour([1.0, 0.0, 0.0]);
            count += 1;
        });
        assert_eq!(count, 2);
        let mut lines = 0;
        tree.for_each_line(root, true, |_| lines += 1);
        assert_eq!(lines, 1);
    }

    #[test]
    fn test_region_bounding_box() {
        let (mut tree, root, child) = populated();
        let bbox = tree.bounding_box(root, true).unwrap();
        assert_eq!(bbox.min, Vec3::splat(-5.0));
        assert_eq!(bbox.max, Vec3::splat(5.0));

        let local = tree.bounding_box(root, false).unwrap();
        assert_eq!(local.max, Vec3::splat(1.0));

        let empty = tree.create_child(child, "empty").unwrap();
        assert!(tree.bounding_box(empty, true).is_none());
    }

    #[test]
    fn test_object_is_in_region() {
        let (tree, root, child) = populated();
        let id = tree.region(child).unwrap().objects()[0];
        assert!(tree.object_is_in_region(root, id, true));
        assert!(!tree.object_is_in_region(root, id, false));
    }

    #[test]
    fn test_child_regions() {
        let (mut tree, root, child) = populated();
        let grandchild = tree.create_child(child, "grand").unwrap();
        assert_eq!(tree.child_regions(root, false), vec![child]);
        assert_eq!(tree.child_regions(root, true), vec![child, grandchild]);
    }

    #[test]
    fn test_pickables_skip_hidden_and_clear_flags() {
        let (mut tree, root, child) = populated();
        assert!(tree.check_pickable_update_required(root, true));

        tree.set_visibility(child, false);
        let hidden = tree.region(root).unwrap().objects()[1];
        tree.object_mut(hidden).unwrap().set_visibility(false);

        let pickables = tree.pickable_objects(root, true);
        assert_eq!(pickables.len(), 1);
        assert!(!tree.region(root).unwrap().pickable_update_required);
        // hidden regions are not visited
        assert!(tree.check_pickable_update_required(root, true));
        assert!(!tree.check_pickable_update_required(root, false));
    }
}
