//! Wavefront OBJ payloads

use std::io::Cursor;

use crate::geometry::MeshGeometry;

use super::{FileFormat, FormatLoader, LoadedMesh, MeshError};

/// Decoder for OBJ payloads
///
/// Every model in the file is merged into one geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjMeshLoader;

impl FormatLoader for ObjMeshLoader {
    fn format(&self) -> FileFormat {
        FileFormat::Obj
    }

    fn parse(&self, data: &[u8]) -> Result<LoadedMesh, MeshError> {
        let mut reader = Cursor::new(data);
        let (models, _materials) = tobj::load_obj_buf(
            &mut reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Ok(Default::default()),
        )
        .map_err(|e| MeshError::Parse(e.to_string()))?;

        let mut geometry = MeshGeometry::default();
        for model in &models {
            let mesh = &model.mesh;
            let part = MeshGeometry {
                positions: mesh
                    .positions
                    .chunks_exact(3)
                    .map(|c| [c[0], c[1], c[2]])
                    .collect(),
                normals: mesh
                    .normals
                    .chunks_exact(3)
                    .map(|c| [c[0], c[1], c[2]])
                    .collect(),
                indices: mesh.indices.clone(),
                ..Default::default()
            };
            geometry.append(&part);
        }
        if geometry.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        if geometry.normals.len() != geometry.vertex_count() {
            geometry.compute_vertex_normals();
        }

        Ok(LoadedMesh {
            geometry,
            materials: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_TRIANGLES: &str = "\
o first
v 0 0 0
v 1 0 0
v 0 1 0
f 1 2 3
o second
v 0 0 1
v 1 0 1
v 0 1 1
f 4 5 6
";

    #[test]
    fn test_models_merge() {
        let mesh = ObjMeshLoader.parse(TWO_TRIANGLES.as_bytes()).unwrap();
        assert_eq!(mesh.geometry.vertex_count(), 6);
        assert_eq!(mesh.geometry.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.geometry.normals.len(), 6);
    }

    #[test]
    fn test_empty_obj() {
        assert!(matches!(
            ObjMeshLoader.parse(b"# nothing here\n"),
            Err(MeshError::EmptyMesh)
        ));
    }
}
