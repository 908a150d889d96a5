//! Convenience constructors that attach new primitives to a region

use uuid::Uuid;

use crate::geometry::{Material, MaterialSide, MeshGeometry};
use crate::primitive::{PrimitiveType, ZincObject};

use super::RegionTree;

impl RegionTree {
    /// First direct object of `kind` named `group_name`
    fn object_of_type_named(&self, region: Uuid, kind: PrimitiveType, group_name: &str) -> Option<Uuid> {
        self.find_objects_with_group_name(region, Some(group_name), false)
            .into_iter()
            .find(|id| {
                self.objects
                    .get(id)
                    .is_some_and(|o| o.primitive_type() == kind)
            })
    }

    /// Append to an existing object or attach a freshly built one
    ///
    /// Returns the object id and whether it was created.
    fn append_or_create(
        &mut self,
        region: Uuid,
        kind: PrimitiveType,
        group_name: &str,
        create: impl FnOnce() -> ZincObject,
        append: impl FnOnce(&mut ZincObject),
    ) -> Option<(Uuid, bool)> {
        if let Some(id) = self.object_of_type_named(region, kind, group_name) {
            if let Some(object) = self.objects.get_mut(&id) {
                append(object);
            }
            if let Some(r) = self.regions.get_mut(&region) {
                r.pickable_update_required = true;
            }
            return Some((id, false));
        }
        let mut object = create();
        append(&mut object);
        object.set_name(Some(group_name));
        let id = self.add_zinc_object(region, object)?;
        Some((id, true))
    }

    /// Add labelled points to the region's point set named `group_name`
    pub fn create_points(
        &mut self,
        region: Uuid,
        group_name: &str,
        coords: &[[f32; 3]],
        labels: &[String],
        colour: [f32; 3],
    ) -> Option<(Uuid, bool)> {
        self.append_or_create(
            region,
            PrimitiveType::Points,
            group_name,
            ZincObject::points,
            |object| {
                object.add_points(coords, labels, colour);
            },
        )
    }

    /// Add line segments to the region's line set named `group_name`
    pub fn create_lines(
        &mut self,
        region: Uuid,
        group_name: &str,
        coords: &[[f32; 3]],
        colour: [f32; 3],
    ) -> Option<(Uuid, bool)> {
        self.append_or_create(
            region,
            PrimitiveType::Lines,
            group_name,
            ZincObject::lines,
            |object| {
                object.add_lines(coords, colour);
            },
        )
    }

    /// Wrap a plain mesh into a transparent, double sided surface
    ///
    /// Returns `None` for an empty mesh.
    #[allow(clippy::too_many_arguments)]
    pub fn create_geometry_from_mesh(
        &mut self,
        region: Uuid,
        group_name: &str,
        geometry: MeshGeometry,
        colour: [f32; 3],
        opacity: f32,
        visible: bool,
        render_order: i32,
    ) -> Option<Uuid> {
        if geometry.is_empty() {
            return None;
        }
        let material = Material {
            colour,
            opacity,
            transparent: true,
            side: MaterialSide::Double,
            ..Default::default()
        };
        let mut object = ZincObject::surface();
        object.set_name(Some(group_name));
        object.set_mesh(geometry, material, false, false);
        object.set_visibility(visible);
        object.set_render_order(render_order);
        self.add_zinc_object(region, object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_points_merges_by_group() {
        let mut tree = RegionTree::new();
        let root = tree.root();
        let labels = vec!["a".to_string()];
        let (first, is_new) = tree
            .create_points(root, "landmarks", &[[0.0; 3]], &labels, [1.0, 0.0, 0.0])
            .unwrap();
        assert!(is_new);
        tree.region_mut(root).unwrap().pickable_update_required = false;

        let (second, is_new) = tree
            .create_points(root, "Landmarks", &[[1.0; 3], [2.0; 3]], &[], [0.0, 1.0, 0.0])
            .unwrap();
        assert!(!is_new);
        assert_eq!(first, second);
        assert!(tree.region(root).unwrap().pickable_update_required);

        let points = tree.object(first).unwrap();
        assert_eq!(points.geometry().unwrap().vertex_count(), 3);
        assert_eq!(points.point_labels().len(), 3);
        assert_eq!(points.point_labels()[0].as_deref(), Some("a"));
        assert_eq!(points.group_name(), Some("landmarks"));
        assert_eq!(tree.object_count(), 1);
    }

    #[test]
    fn test_create_lines_separate_from_points() {
        let mut tree = RegionTree::new();
        let root = tree.root();
        tree.create_points(root, "shared", &[[0.0; 3]], &[], [1.0; 3]);
        let (lines, is_new) = tree
            .create_lines(root, "shared", &[[0.0; 3], [1.0; 3]], [1.0; 3])
            .unwrap();
        assert!(is_new);
        assert_eq!(tree.object(lines).unwrap().segment_count(), 1);
        assert_eq!(tree.object_count(), 2);
    }

    #[test]
    fn test_create_geometry_from_mesh() {
        let mut tree = RegionTree::new();
        let root = tree.root();
        let mesh = MeshGeometry::from_positions(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let id = tree
            .create_geometry_from_mesh(root, "outline", mesh, [0.5; 3], 0.4, false, 7)
            .unwrap();
        let object = tree.object(id).unwrap();
        assert!(!object.visible());
        assert_eq!(object.render_order(), 7);
        assert!(object.material().transparent);
        assert_eq!(object.material().side, MaterialSide::Double);

        let empty = MeshGeometry::default();
        assert!(tree
            .create_geometry_from_mesh(root, "none", empty, [0.5; 3], 1.0, true, 0)
            .is_none());
    }
}
