//! three.js JSON model format (version 3)

use serde::Deserialize;
use serde_json::Value;

use crate::geometry::{MeshGeometry, hex_to_colour};

use super::{FileFormat, FormatLoader, LoadedMesh, MaterialSpec, MeshError};

const FACE_QUAD: u64 = 1;
const FACE_MATERIAL: u64 = 1 << 1;
const FACE_UV: u64 = 1 << 2;
const FACE_VERTEX_UV: u64 = 1 << 3;
const FACE_NORMAL: u64 = 1 << 4;
const FACE_VERTEX_NORMAL: u64 = 1 << 5;
const FACE_COLOR: u64 = 1 << 6;
const FACE_VERTEX_COLOR: u64 = 1 << 7;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelDocument {
    #[serde(default = "default_scale")]
    scale: f32,
    vertices: Vec<f32>,
    #[serde(default)]
    colors: Vec<u32>,
    #[serde(default)]
    faces: Vec<u64>,
    #[serde(default)]
    uvs: Vec<Value>,
    #[serde(default)]
    morph_targets: Vec<MorphTarget>,
    #[serde(default)]
    morph_colors: Vec<MorphColors>,
    #[serde(default)]
    materials: Vec<MaterialDocument>,
}

fn default_scale() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
struct MorphTarget {
    vertices: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct MorphColors {
    colors: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaterialDocument {
    color_diffuse: Option<[f32; 3]>,
    opacity: Option<f32>,
    #[serde(default)]
    vertex_colors: Value,
}

impl MaterialDocument {
    fn spec(&self) -> MaterialSpec {
        let vertex_colors = match &self.vertex_colors {
            Value::Bool(flag) => *flag,
            Value::String(mode) => !mode.is_empty(),
            _ => false,
        };
        MaterialSpec {
            colour: self.color_diffuse,
            opacity: self.opacity.unwrap_or(1.0),
            vertex_colors,
        }
    }
}

/// Decoder for the JSON model format
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMeshLoader;

impl FormatLoader for JsonMeshLoader {
    fn format(&self) -> FileFormat {
        FileFormat::Json
    }

    fn parse(&self, data: &[u8]) -> Result<LoadedMesh, MeshError> {
        let document: ModelDocument =
            serde_json::from_slice(data).map_err(|e| MeshError::Parse(e.to_string()))?;
        decode(document)
    }

    fn parse_value(&self, value: &Value) -> Result<LoadedMesh, MeshError> {
        let document = ModelDocument::deserialize(value).map_err(|e| MeshError::Parse(e.to_string()))?;
        decode(document)
    }
}

fn triples(values: &[f32], scale: f32) -> Vec<[f32; 3]> {
    values
        .chunks_exact(3)
        .map(|c| [c[0] * scale, c[1] * scale, c[2] * scale])
        .collect()
}

fn decode(document: ModelDocument) -> Result<LoadedMesh, MeshError> {
    let scale = if document.scale != 0.0 {
        1.0 / document.scale
    } else {
        1.0
    };
    let positions = triples(&document.vertices, scale);
    if positions.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    let vertex_count = positions.len();

    let faces = decode_faces(&document, vertex_count)?;

    let mut geometry = MeshGeometry {
        positions,
        indices: faces.indices,
        colours: faces.colours,
        ..Default::default()
    };
    geometry.morph_positions = document
        .morph_targets
        .iter()
        .map(|target| triples(&target.vertices, scale))
        .filter(|target| target.len() == vertex_count)
        .collect();
    geometry.morph_colours = document
        .morph_colors
        .iter()
        .map(|target| triples(&target.colors, 1.0))
        .filter(|target| target.len() == vertex_count)
        .collect();
    if !geometry.indices.is_empty() {
        geometry.compute_vertex_normals();
    }

    Ok(LoadedMesh {
        geometry,
        materials: document.materials.iter().map(MaterialDocument::spec).collect(),
    })
}

struct DecodedFaces {
    indices: Vec<u32>,
    colours: Vec<[f32; 3]>,
}

/// Walk the packed face array
///
/// Each face starts with a bitmask telling which optional fields follow its
/// vertex indices. Quads are split into two triangles.
fn decode_faces(document: &ModelDocument, vertex_count: usize) -> Result<DecodedFaces, MeshError> {
    let faces = &document.faces;
    let uv_layers = document.uvs.len();
    let mut indices = Vec::new();
    let mut colours: Vec<[f32; 3]> = Vec::new();
    let mut offset = 0;

    let take = |count: usize, offset: &mut usize| -> Result<Vec<u64>, MeshError> {
        let end = *offset + count;
        let values = faces
            .get(*offset..end)
            .ok_or_else(|| MeshError::Parse("truncated face array".to_string()))?;
        *offset = end;
        Ok(values.to_vec())
    };

    while offset < faces.len() {
        let kind = faces[offset];
        offset += 1;
        let corners = if kind & FACE_QUAD != 0 { 4 } else { 3 };

        let vertices = take(corners, &mut offset)?;
        if let Some(bad) = vertices.iter().find(|v| **v as usize >= vertex_count) {
            return Err(MeshError::Parse(format!("vertex index {bad} out of range")));
        }
        if kind & FACE_MATERIAL != 0 {
            take(1, &mut offset)?;
        }
        if kind & FACE_UV != 0 {
            take(uv_layers, &mut offset)?;
        }
        if kind & FACE_VERTEX_UV != 0 {
            take(uv_layers * corners, &mut offset)?;
        }
        if kind & FACE_NORMAL != 0 {
            take(1, &mut offset)?;
        }
        if kind & FACE_VERTEX_NORMAL != 0 {
            take(corners, &mut offset)?;
        }
        let face_colour = if kind & FACE_COLOR != 0 {
            take(1, &mut offset)?.first().copied()
        } else {
            None
        };
        let vertex_colours = if kind & FACE_VERTEX_COLOR != 0 {
            Some(take(corners, &mut offset)?)
        } else {
            None
        };

        if face_colour.is_some() || vertex_colours.is_some() {
            if colours.is_empty() {
                colours = vec![[1.0; 3]; vertex_count];
            }
            for (corner, vertex) in vertices.iter().enumerate() {
                let colour_index = vertex_colours
                    .as_ref()
                    .map(|c| c[corner])
                    .or(face_colour);
                if let Some(hex) = colour_index.and_then(|i| document.colors.get(i as usize)) {
                    colours[*vertex as usize] = hex_to_colour(*hex);
                }
            }
        }

        let v: Vec<u32> = vertices.iter().map(|i| *i as u32).collect();
        indices.extend_from_slice(&[v[0], v[1], v[corners - 1]]);
        if corners == 4 {
            indices.extend_from_slice(&[v[1], v[2], v[3]]);
        }
    }

    Ok(DecodedFaces { indices, colours })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_triangles() {
        let data = json!({
            "vertices": [0, 0, 0, 1, 0, 0, 0, 1, 0],
            "faces": [0, 0, 1, 2],
            "materials": [{ "colorDiffuse": [1.0, 0.0, 0.0], "opacity": 0.5 }]
        });
        let mesh = JsonMeshLoader.parse(data.to_string().as_bytes()).unwrap();
        assert_eq!(mesh.geometry.vertex_count(), 3);
        assert_eq!(mesh.geometry.indices, vec![0, 1, 2]);
        assert_eq!(mesh.geometry.normals.len(), 3);
        assert_eq!(mesh.materials[0].colour, Some([1.0, 0.0, 0.0]));
        assert_eq!(mesh.materials[0].opacity, 0.5);
    }

    #[test]
    fn test_quad_with_optional_fields() {
        // quad + material + face normal + vertex colours
        let kind = FACE_QUAD | FACE_MATERIAL | FACE_NORMAL | FACE_VERTEX_COLOR;
        let data = json!({
            "vertices": [0, 0, 0, 1, 0, 0, 1, 1, 0, 0, 1, 0],
            "colors": [0xff0000, 0x00ff00],
            "faces": [kind, 0, 1, 2, 3, 0, 0, 0, 1, 0, 1]
        });
        let mesh = JsonMeshLoader.parse_value(&data).unwrap();
        assert_eq!(mesh.geometry.indices, vec![0, 1, 3, 1, 2, 3]);
        assert_eq!(mesh.geometry.colours[0], [1.0, 0.0, 0.0]);
        assert_eq!(mesh.geometry.colours[1], [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_morph_targets() {
        let data = json!({
            "vertices": [0, 0, 0, 1, 0, 0],
            "morphTargets": [
                { "name": "t0", "vertices": [0, 0, 0, 1, 0, 0] },
                { "name": "t1", "vertices": [0, 1, 0, 1, 1, 0] },
                { "name": "bad", "vertices": [0, 1, 0] }
            ],
            "morphColors": [
                { "name": "c0", "colors": [1, 0, 0, 1, 0, 0] }
            ]
        });
        let mesh = JsonMeshLoader.parse_value(&data).unwrap();
        assert_eq!(mesh.geometry.morph_target_count(), 2);
        assert_eq!(mesh.geometry.morph_colours.len(), 1);
        assert!(mesh.geometry.indices.is_empty());
    }

    #[test]
    fn test_truncated_faces() {
        let data = json!({ "vertices": [0, 0, 0, 1, 0, 0, 0, 1, 0], "faces": [0, 0, 1] });
        assert!(matches!(
            JsonMeshLoader.parse_value(&data),
            Err(MeshError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_model() {
        let data = json!({ "vertices": [] });
        assert!(matches!(JsonMeshLoader.parse_value(&data), Err(MeshError::EmptyMesh)));
    }
}
