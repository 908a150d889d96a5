//! Line sets

use crate::geometry::{Material, MeshGeometry};

use super::ZincObject;

impl ZincObject {
    /// Append line segments (consecutive coordinate pairs), creating the
    /// mesh on first use
    pub fn add_lines(&mut self, coords: &[[f32; 3]], colour: [f32; 3]) -> bool {
        if coords.is_empty() {
            return false;
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

    /// Number of complete segments in the base level
    pub fn segment_count(&self) -> usize {
        self.geometry().map(|g| g.vertex_count() / 2).unwrap_or(0)
    }

    pub fn line_width(&self) -> f32 {
        self.lod.material().line_width
    }

    pub fn set_width(&mut self, width: f32) {
        let mut material = self.lod.material().clone();
        material.line_width = width;
        self.lod.set_material(material);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_lines() {
        let mut lines = ZincObject::lines();
        lines.add_lines(&[[0.0; 3], [1.0; 3]], [0.0, 0.0, 1.0]);
        lines.add_lines(&[[2.0; 3], [3.0; 3]], [1.0, 0.0, 0.0]);
        assert_eq!(lines.segment_count(), 2);
        assert_eq!(lines.colour(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_line_width() {
        let mut lines = ZincObject::lines();
        lines.add_lines(&[[0.0; 3], [1.0; 3]], [1.0; 3]);
        lines.set_width(3.0);
        assert_eq!(lines.line_width(), 3.0);
    }
}
