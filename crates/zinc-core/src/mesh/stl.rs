//! STL payloads (binary or ASCII)

use std::collections::HashMap;
use std::io::Cursor;

use crate::geometry::MeshGeometry;

use super::{FileFormat, FormatLoader, LoadedMesh, MeshError};

// Precision for vertex comparison (multiply by this, then round to int)
const PRECISION: f32 = 10000.0;

/// Decoder for STL payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct StlMeshLoader;

impl FormatLoader for StlMeshLoader {
    fn format(&self) -> FileFormat {
        FileFormat::Stl
    }

    fn parse(&self, data: &[u8]) -> Result<LoadedMesh, MeshError> {
        let mut reader = Cursor::new(data);
        let mesh = stl_io::read_stl(&mut reader).map_err(|e| MeshError::Parse(e.to_string()))?;
        if mesh.faces.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        let (positions, indices) = index_mesh(&mesh);
        let mut geometry = MeshGeometry {
            positions,
            indices,
            ..Default::default()
        };
        geometry.compute_vertex_normals();
        Ok(LoadedMesh {
            geometry,
            materials: Vec::new(),
        })
    }
}

/// Merge coincident corners into shared vertices
fn index_mesh(mesh: &stl_io::IndexedMesh) -> (Vec<[f32; 3]>, Vec<u32>) {
    let mut unique_vertices: Vec<[f32; 3]> = Vec::new();
    let mut vertex_map: HashMap<[i32; 3], u32> = HashMap::new();
    let mut indices = Vec::with_capacity(mesh.faces.len() * 3);

    for face in &mesh.faces {
        for &vertex_idx in &face.vertices {
            let vertex = mesh.vertices[vertex_idx];
            let v = [vertex[0], vertex[1], vertex[2]];
            let key = [
                (v[0] * PRECISION).round() as i32,
                (v[1] * PRECISION).round() as i32,
                (v[2] * PRECISION).round() as i32,
            ];
            let index = *vertex_map.entry(key).or_insert_with(|| {
                unique_vertices.push(v);
                (unique_vertices.len() - 1) as u32
            });
            indices.push(index);
        }
    }

    (unique_vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(v0: [f32; 3], v1: [f32; 3], v2: [f32; 3]) -> stl_io::Triangle {
        stl_io::Triangle {
            normal: stl_io::Normal::new([0.0, 0.0, 1.0]),
            vertices: [
                stl_io::Vertex::new(v0),
                stl_io::Vertex::new(v1),
                stl_io::Vertex::new(v2),
            ],
        }
    }

    #[test]
    fn test_parse_binary_stl() {
        let triangles = vec![
            triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
            triangle([0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let mut data = Vec::new();
        stl_io::write_stl(&mut data, triangles.iter()).unwrap();

        let mesh = StlMeshLoader.parse(&data).unwrap();
        assert_eq!(mesh.geometry.vertex_count(), 4);
        assert_eq!(mesh.geometry.indices.len(), 6);
        assert_eq!(mesh.geometry.normals.len(), 4);
        assert!(mesh.materials.is_empty());
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(StlMeshLoader.parse(b"not an stl file").is_err());
    }
}
