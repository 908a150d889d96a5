//! Point sets

use crate::geometry::{Material, MeshGeometry};

use super::{PrimitiveKind, ZincObject};

/// Point-set specific state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointSet {
    /// One optional label per point
    pub labels: Vec<Option<String>>,
}

impl ZincObject {
    /// Append points, creating the mesh on first use
    ///
    /// Returns false when there was nothing to add. Labels are matched to
    /// coordinates by position.
    pub fn add_points(&mut self, coords: &[[f32; 3]], labels: &[String], colour: [f32; 3]) -> bool {
        if coords.is_empty() {
            return false;
        }
        if let PrimitiveKind::Points(set) = &mut self.kind {
            set.labels
                .extend((0..coords.len()).map(|i| labels.get(i).cloned()));
        }
        if let Some(base) = self.lod.base_mut() {
            base.geometry.append_vertices(coords);
            self.bbox_stale = true;
        } else {
            let material = Material {
                colour,
                ..Default::default()
            };
            self.set_mesh(MeshGeometry::from_positions(coords.to_vec()), material, false, false);
        }
        true
    }

    /// Labels of a point set, empty for other kinds
    pub fn point_labels(&self) -> &[Option<String>] {
        match &self.kind {
            PrimitiveKind::Points(set) => &set.labels,
            _ => &[],
        }
    }

    pub fn point_size(&self) -> f32 {
        self.lod.material().point_size
    }

    pub fn set_point_size(&mut self, size: f32) {
        let mut material = self.lod.material().clone();
        material.point_size = size;
        self.lod.set_material(material);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_points_creates_then_appends() {
        let mut points = ZincObject::points();
        assert!(!points.add_points(&[], &[], [1.0, 0.0, 0.0]));
        assert!(!points.has_mesh());

        points.add_points(&[[0.0; 3], [1.0; 3]], &["a".to_string()], [1.0, 0.0, 0.0]);
        assert_eq!(points.colour(), [1.0, 0.0, 0.0]);
        points.add_points(&[[2.0; 3]], &["c".to_string()], [0.0, 1.0, 0.0]);

        assert_eq!(points.geometry().unwrap().vertex_count(), 3);
        assert_eq!(
            points.point_labels(),
            &[Some("a".to_string()), None, Some("c".to_string())]
        );
        // first colour wins
        assert_eq!(points.colour(), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_point_size() {
        let mut points = ZincObject::points();
        points.add_points(&[[0.0; 3]], &[], [1.0; 3]);
        points.set_point_size(2.0);
        assert_eq!(points.point_size(), 2.0);
        assert_eq!(points.lod().levels()[0].representation.material.point_size, 2.0);
    }
}
