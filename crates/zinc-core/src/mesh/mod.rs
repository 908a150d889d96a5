//! Mesh payload decoding (JSON, STL, OBJ)
//!
//! Every format produces the same [`LoadedMesh`]: one geometry plus the
//! materials the payload declared, if any.

mod json;
mod obj;
mod stl;

use serde_json::Value;

use crate::geometry::{Material, MeshGeometry};

pub use json::JsonMeshLoader;
pub use obj::ObjMeshLoader;
pub use stl::StlMeshLoader;

/// Payload format named by an item's `FileFormat`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileFormat {
    #[default]
    Json,
    Stl,
    Obj,
}

impl FileFormat {
    /// `STL` and `OBJ` select those formats, anything else is JSON
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::to_ascii_uppercase).as_deref() {
            Some("STL") => FileFormat::Stl,
            Some("OBJ") => FileFormat::Obj,
            _ => FileFormat::Json,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Json => "JSON",
            FileFormat::Stl => "STL",
            FileFormat::Obj => "OBJ",
        }
    }

    /// Decoder for this format
    pub fn loader(&self) -> &'static dyn FormatLoader {
        match self {
            FileFormat::Json => &JsonMeshLoader,
            FileFormat::Stl => &StlMeshLoader,
            FileFormat::Obj => &ObjMeshLoader,
        }
    }
}

/// Material as declared by a payload
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialSpec {
    pub colour: Option<[f32; 3]>,
    pub opacity: f32,
    pub vertex_colors: bool,
}

impl Default for MaterialSpec {
    fn default() -> Self {
        Self {
            colour: None,
            opacity: 1.0,
            vertex_colors: false,
        }
    }
}

/// Decoded payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedMesh {
    pub geometry: MeshGeometry,
    pub materials: Vec<MaterialSpec>,
}

impl LoadedMesh {
    /// Material built from the first declared material, or from the given
    /// defaults when the payload declared none
    pub fn material(&self, default_colour: [f32; 3], default_opacity: f32) -> Material {
        match self.materials.first() {
            Some(spec) => Material {
                vertex_colors: spec.vertex_colors,
                ..Material::with_colour(spec.colour.unwrap_or(default_colour), spec.opacity)
            },
            None => Material::with_colour(default_colour, default_opacity),
        }
    }
}

/// Decoder for one payload format
pub trait FormatLoader: Sync {
    fn format(&self) -> FileFormat;

    /// Decode a fetched payload
    fn parse(&self, data: &[u8]) -> Result<LoadedMesh, MeshError>;

    /// Decode a payload embedded in the metadata document
    fn parse_value(&self, value: &Value) -> Result<LoadedMesh, MeshError> {
        match value {
            Value::String(text) => self.parse(text.as_bytes()),
            other => {
                let data = serde_json::to_vec(other).map_err(|e| MeshError::Parse(e.to_string()))?;
                self.parse(&data)
            }
        }
    }
}

/// Decode `data` in the given format
pub fn parse_mesh(format: FileFormat, data: &[u8]) -> Result<LoadedMesh, MeshError> {
    format.loader().parse(data)
}

/// Mesh-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty mesh: no geometry found")]
    EmptyMesh,
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_name() {
        assert_eq!(FileFormat::from_name(Some("STL")), FileFormat::Stl);
        assert_eq!(FileFormat::from_name(Some("obj")), FileFormat::Obj);
        assert_eq!(FileFormat::from_name(Some("VTK")), FileFormat::Json);
        assert_eq!(FileFormat::from_name(None), FileFormat::Json);
        assert_eq!(FileFormat::Stl.loader().format(), FileFormat::Stl);
    }

    #[test]
    fn test_material_defaults() {
        let mesh = LoadedMesh::default();
        let material = mesh.material([0.5, 0.5, 0.5], 0.3);
        assert_eq!(material.colour, [0.5, 0.5, 0.5]);
        assert!(material.transparent);

        let declared = LoadedMesh {
            materials: vec![MaterialSpec {
                colour: Some([1.0, 0.0, 0.0]),
                opacity: 1.0,
                vertex_colors: true,
            }],
            ..Default::default()
        };
        let material = declared.material([0.5, 0.5, 0.5], 0.3);
        assert_eq!(material.colour, [1.0, 0.0, 0.0]);
        assert!(!material.transparent);
        assert!(material.vertex_colors);
    }
}
