//! Vertex buffers, materials and morph-target blending

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COLOUR, DEFAULT_LINE_WIDTH, DEFAULT_OPACITY, DEFAULT_POINT_SIZE};

/// Position in a morph target sequence
///
/// `lower` and `upper` index morph targets; `blend` is the weight of
/// `upper` (0.0 = all `lower`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphFrame {
    pub lower: usize,
    pub upper: usize,
    pub blend: f32,
}

impl MorphFrame {
    /// Frame for a continuous position `frame` in a sequence of `count` targets
    pub fn at(frame: f32, count: usize) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let last = count - 1;
        let frame = frame.clamp(0.0, last as f32);
        let lower = (frame.floor() as usize).min(last);
        let upper = (lower + 1).min(last);
        let blend = if upper == lower { 0.0 } else { frame - lower as f32 };
        Some(Self {
            lower,
            upper,
            blend,
        })
    }

    /// Weight of each of the two targets as `(lower, upper)`
    pub fn weights(&self) -> (f32, f32) {
        (1.0 - self.blend, self.blend)
    }
}

/// Raw triangle/line/point data of one representation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshGeometry {
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub normals: Vec<[f32; 3]>,
    /// Per-vertex colours (RGB), empty when the geometry has none
    #[serde(default)]
    pub colours: Vec<[f32; 3]>,
    #[serde(default)]
    pub indices: Vec<u32>,
    /// Morph targets for positions, each the same length as `positions`
    #[serde(default)]
    pub morph_positions: Vec<Vec<[f32; 3]>>,
    /// Morph targets for vertex colours
    #[serde(default)]
    pub morph_colours: Vec<Vec<[f32; 3]>>,
}

impl MeshGeometry {
    /// Geometry made of bare vertices (points or line segments)
    pub fn from_positions(positions: Vec<[f32; 3]>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of frames of the morph sequence driving the animation clip
    ///
    /// Position targets take precedence, colour targets are used when the
    /// geometry only morphs its colours.
    pub fn morph_target_count(&self) -> usize {
        if !self.morph_positions.is_empty() {
            self.morph_positions.len()
        } else {
            self.morph_colours.len()
        }
    }

    /// Positions blended at the given morph frame
    ///
    /// Falls back to the base positions when there is no frame or no
    /// position targets.
    pub fn positions_at(&self, frame: Option<MorphFrame>) -> Vec<[f32; 3]> {
        match frame {
            Some(frame) if !self.morph_positions.is_empty() => {
                blend_targets(&self.morph_positions, &self.positions, frame)
            }
            _ => self.positions.clone(),
        }
    }

    /// Vertex colours blended at the given morph frame
    pub fn colours_at(&self, frame: Option<MorphFrame>) -> Vec<[f32; 3]> {
        match frame {
            Some(frame) if !self.morph_colours.is_empty() => {
                blend_targets(&self.morph_colours, &self.colours, frame)
            }
            _ => self.colours.clone(),
        }
    }

    /// Single vertex position blended at the given morph frame
    pub fn position_at(&self, index: usize, frame: Option<MorphFrame>) -> Option<Vec3> {
        let base = self.positions.get(index).copied()?;
        let Some(frame) = frame.filter(|_| !self.morph_positions.is_empty()) else {
            return Some(Vec3::from(base));
        };
        let (w0, w1) = frame.weights();
        let lower = target_value(&self.morph_positions, frame.lower, index, base);
        let upper = target_value(&self.morph_positions, frame.upper, index, base);
        Some(Vec3::from(lower) * w0 + Vec3::from(upper) * w1)
    }

    /// Append bare vertices, extending every morph target with the same
    /// coordinates so the targets stay the same length as the base.
    pub fn append_vertices(&mut self, coords: &[[f32; 3]]) {
        self.positions.extend_from_slice(coords);
        for target in &mut self.morph_positions {
            target.extend_from_slice(coords);
        }
        if !self.colours.is_empty() {
            let colour = self.colours.last().copied().unwrap_or(DEFAULT_COLOUR);
            self.colours.extend(std::iter::repeat_n(colour, coords.len()));
        }
    }

    /// Append another geometry, offsetting its indices
    ///
    /// Morph targets are merged per index; a target missing on one side
    /// is filled from that side's base positions.
    pub fn append(&mut self, other: &MeshGeometry) {
        let offset = self.positions.len() as u32;
        let targets = self.morph_positions.len().max(other.morph_positions.len());
        let mut merged = Vec::with_capacity(targets);
        for i in 0..targets {
            let mut target = self
                .morph_positions
                .get(i)
                .cloned()
                .unwrap_or_else(|| self.positions.clone());
            target.extend_from_slice(
                other
                    .morph_positions
                    .get(i)
                    .unwrap_or(&other.positions),
            );
            merged.push(target);
        }
        self.morph_positions = merged;

        if !self.colours.is_empty() || !other.colours.is_empty() {
            self.colours.resize(self.positions.len(), DEFAULT_COLOUR);
            if other.colours.len() == other.positions.len() {
                self.colours.extend_from_slice(&other.colours);
            } else {
                self.colours
                    .extend(std::iter::repeat_n(DEFAULT_COLOUR, other.positions.len()));
            }
        }
        if self.normals.len() == self.positions.len() && other.normals.len() == other.positions.len()
        {
            self.normals.extend_from_slice(&other.normals);
        } else {
            self.normals.clear();
        }

        self.positions.extend_from_slice(&other.positions);
        self.indices
            .extend(other.indices.iter().map(|index| index + offset));
    }

    /// Compute per-vertex normals from triangle indices
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= normals.len() || b >= normals.len() || c >= normals.len() {
                continue;
            }
            let v0 = Vec3::from(self.positions[a]);
            let v1 = Vec3::from(self.positions[b]);
            let v2 = Vec3::from(self.positions[c]);
            let face = (v1 - v0).cross(v2 - v0);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }
        self.normals = normals
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect();
    }
}

fn target_value(targets: &[Vec<[f32; 3]>], target: usize, index: usize, base: [f32; 3]) -> [f32; 3] {
    targets
        .get(target)
        .and_then(|t| t.get(index))
        .copied()
        .unwrap_or(base)
}

fn blend_targets(targets: &[Vec<[f32; 3]>], base: &[[f32; 3]], frame: MorphFrame) -> Vec<[f32; 3]> {
    let (w0, w1) = frame.weights();
    base.iter()
        .enumerate()
        .map(|(i, &b)| {
            let lower = Vec3::from(target_value(targets, frame.lower, i, b));
            let upper = Vec3::from(target_value(targets, frame.upper, i, b));
            (lower * w0 + upper * w1).to_array()
        })
        .collect()
}

/// Which faces a material is drawn for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialSide {
    #[default]
    Front,
    Back,
    Double,
}

/// Material shared by all levels of a primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub colour: [f32; 3],
    pub opacity: f32,
    pub transparent: bool,
    pub vertex_colors: bool,
    pub side: MaterialSide,
    /// Point size (point sets only)
    pub point_size: f32,
    /// Line width (line sets only)
    pub line_width: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            colour: DEFAULT_COLOUR,
            opacity: DEFAULT_OPACITY,
            transparent: false,
            vertex_colors: false,
            side: MaterialSide::Front,
            point_size: DEFAULT_POINT_SIZE,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

impl Material {
    pub fn with_colour(colour: [f32; 3], opacity: f32) -> Self {
        Self {
            colour,
            opacity,
            transparent: opacity < 1.0,
            ..Default::default()
        }
    }

    /// Colour as a 24-bit hex value
    pub fn colour_hex(&self) -> u32 {
        colour_to_hex(self.colour)
    }

    pub fn set_colour_hex(&mut self, hex: u32) {
        self.colour = hex_to_colour(hex);
    }
}

/// Convert a 24-bit `0xRRGGBB` value to RGB floats
pub fn hex_to_colour(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// Convert RGB floats to a 24-bit `0xRRGGBB` value
pub fn colour_to_hex(colour: [f32; 3]) -> u32 {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u32;
    (channel(colour[0]) << 16) | (channel(colour[1]) << 8) | channel(colour[2])
}

/// One renderable level of a primitive
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    pub geometry: MeshGeometry,
    pub material: Material,
    pub visible: bool,
    pub frustum_culled: bool,
    pub render_order: i32,
    pub name: Option<String>,
}

impl Representation {
    pub fn new(geometry: MeshGeometry, material: Material) -> Self {
        Self {
            geometry,
            material,
            visible: true,
            frustum_culled: true,
            render_order: 0,
            name: None,
        }
    }
}
