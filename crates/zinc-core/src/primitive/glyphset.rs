//! Glyph sets: one glyph geometry instanced per position and time step

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use serde::Deserialize;
use uuid::Uuid;

use crate::geometry::{Material, MeshGeometry, MorphFrame, hex_to_colour};

use super::{PrimitiveKind, ZincObject};

fn one() -> usize {
    1
}

fn unit_size() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// Glyph-set wide transform parameters
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GlyphMetadata {
    #[serde(default = "one")]
    pub number_of_time_steps: usize,
    #[serde(default = "unit_size")]
    pub base_size: [f32; 3],
    #[serde(default)]
    pub offset: [f32; 3],
    #[serde(default)]
    pub scale_factors: [f32; 3],
}

impl Default for GlyphMetadata {
    fn default() -> Self {
        Self {
            number_of_time_steps: 1,
            base_size: unit_size(),
            offset: [0.0; 3],
            scale_factors: [0.0; 3],
        }
    }
}

/// Glyph set description; per-glyph arrays are keyed by time step
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GlyphsetData {
    #[serde(default)]
    pub metadata: GlyphMetadata,
    #[serde(default)]
    pub positions: HashMap<String, Vec<[f32; 3]>>,
    #[serde(default)]
    pub axis1: HashMap<String, Vec<[f32; 3]>>,
    #[serde(default)]
    pub axis2: HashMap<String, Vec<[f32; 3]>>,
    #[serde(default)]
    pub axis3: HashMap<String, Vec<[f32; 3]>>,
    #[serde(default)]
    pub scale: HashMap<String, Vec<[f32; 3]>>,
    #[serde(default)]
    pub colors: HashMap<String, Vec<u32>>,
    #[serde(default)]
    pub label: Vec<String>,
}

impl GlyphsetData {
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    fn glyph_count(&self) -> usize {
        self.positions.get("0").map(Vec::len).unwrap_or(0)
    }

    fn value(map: &HashMap<String, Vec<[f32; 3]>>, step: usize, index: usize) -> Option<Vec3> {
        map.get(&step.to_string())
            .and_then(|v| v.get(index))
            .map(|v| Vec3::from(*v))
    }

    fn lerp(
        map: &HashMap<String, Vec<[f32; 3]>>,
        frame: MorphFrame,
        index: usize,
        fallback: Vec3,
    ) -> Vec3 {
        let lower = Self::value(map, frame.lower, index).unwrap_or(fallback);
        let upper = Self::value(map, frame.upper, index).unwrap_or(lower);
        lower.lerp(upper, frame.blend)
    }
}

/// One instance of the glyph geometry
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub id: usize,
    glyphset: Uuid,
    label: Option<String>,
    label_visible: bool,
    position: Vec3,
    axes: [Vec3; 3],
    colour: Option<[f32; 3]>,
}

impl Glyph {
    /// Id of the glyph set object this glyph belongs to
    pub fn glyphset(&self) -> Uuid {
        self.glyphset
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, text: &str) {
        self.label = Some(text.to_string());
    }

    pub fn label_visible(&self) -> bool {
        self.label_visible && self.label.is_some()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn colour(&self) -> Option<[f32; 3]> {
        self.colour
    }

    /// Instance transform built from the scaled axes and position
    pub fn transform(&self) -> Mat4 {
        Mat4::from_cols(
            self.axes[0].extend(0.0),
            self.axes[1].extend(0.0),
            self.axes[2].extend(0.0),
            self.position.extend(1.0),
        )
    }

    pub fn set_transformation(&mut self, position: Vec3, axis1: Vec3, axis2: Vec3, axis3: Vec3) {
        self.position = position;
        self.axes = [axis1, axis2, axis3];
    }
}

/// Glyph-set specific state
#[derive(Debug, Clone, PartialEq)]
pub struct Glyphset {
    data: GlyphsetData,
    glyphs: Vec<Glyph>,
    glyph_geometry: Option<MeshGeometry>,
    display_labels: bool,
}

impl Glyphset {
    pub fn new(data: GlyphsetData, owner: Uuid, display_labels: bool) -> Self {
        let glyphs = (0..data.glyph_count())
            .map(|id| Glyph {
                id,
                glyphset: owner,
                label: data.label.get(id).cloned(),
                label_visible: display_labels,
                position: Vec3::ZERO,
                axes: [Vec3::X, Vec3::Y, Vec3::Z],
                colour: None,
            })
            .collect();
        let mut glyphset = Self {
            data,
            glyphs,
            glyph_geometry: None,
            display_labels,
        };
        glyphset.update_for_time(0.0, 1.0);
        glyphset
    }

    pub fn metadata(&self) -> &GlyphMetadata {
        &self.data.metadata
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn glyph(&self, id: usize) -> Option<&Glyph> {
        self.glyphs.get(id)
    }

    pub fn glyph_mut(&mut self, id: usize) -> Option<&mut Glyph> {
        self.glyphs.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn glyph_geometry(&self) -> Option<&MeshGeometry> {
        self.glyph_geometry.as_ref()
    }

    pub fn set_glyph_geometry(&mut self, geometry: MeshGeometry) {
        self.glyph_geometry = Some(geometry);
    }

    pub fn labels_visible(&self) -> bool {
        self.display_labels
    }

    pub fn show_labels(&mut self) {
        self.display_labels = true;
        for glyph in &mut self.glyphs {
            glyph.label_visible = true;
        }
    }

    pub fn hide_labels(&mut self) {
        self.display_labels = false;
        for glyph in &mut self.glyphs {
            glyph.label_visible = false;
        }
    }

    /// Glyph positions, used as the set's own vertex positions
    pub fn positions(&self) -> Vec<[f32; 3]> {
        self.glyphs.iter().map(|g| g.position.to_array()).collect()
    }

    /// Recompute every glyph transform for `time` in `[0, duration]`
    ///
    /// Positions, axes and scales are interpolated between the two
    /// neighbouring time steps; colours come from the lower step.
    pub fn update_for_time(&mut self, time: f32, duration: f32) {
        let steps = self.data.metadata.number_of_time_steps.max(1);
        let progress = if duration > 0.0 {
            (time / duration).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let Some(frame) = MorphFrame::at(progress * (steps - 1) as f32, steps) else {
            return;
        };
        let metadata = &self.data.metadata;
        let base_size = Vec3::from(metadata.base_size);
        let scale_factors = Vec3::from(metadata.scale_factors);
        let offset = Vec3::from(metadata.offset);
        let colours = self.data.colors.get(&frame.lower.to_string());

        for glyph in &mut self.glyphs {
            let i = glyph.id;
            let position = GlyphsetData::lerp(&self.data.positions, frame, i, Vec3::ZERO);
            let axis1 = GlyphsetData::lerp(&self.data.axis1, frame, i, Vec3::X);
            let axis2 = GlyphsetData::lerp(&self.data.axis2, frame, i, Vec3::Y);
            let axis3 = GlyphsetData::lerp(&self.data.axis3, frame, i, Vec3::Z);
            let scale = GlyphsetData::lerp(&self.data.scale, frame, i, Vec3::ZERO);

            let final_scale = base_size + scale_factors * scale;
            let axis1 = axis1 * final_scale.x;
            let axis2 = axis2 * final_scale.y;
            let axis3 = axis3 * final_scale.z;
            let position = position + axis1 * offset.x + axis2 * offset.y + axis3 * offset.z;
            glyph.set_transformation(position, axis1, axis2, axis3);

            if let Some(hex) = colours.and_then(|c| c.get(i)) {
                glyph.colour = Some(hex_to_colour(*hex));
            }
        }
    }
}

impl ZincObject {
    /// Create a glyph set object from its description
    ///
    /// The object's own vertices are the glyph positions; it is time
    /// enabled when the description has more than one time step.
    pub fn glyphset(data: GlyphsetData, display_labels: bool) -> Self {
        let id = Uuid::new_v4();
        let steps = data.metadata.number_of_time_steps;
        let glyphset = Glyphset::new(data, id, display_labels);
        let positions = glyphset.positions();
        let mut object = ZincObject::with_id(id, PrimitiveKind::Glyphset(glyphset));
        object.set_mesh(
            MeshGeometry::from_positions(positions),
            Material::default(),
            steps > 1,
            false,
        );
        object.on_time_changed();
        object
    }

    pub fn as_glyphset(&self) -> Option<&Glyphset> {
        match &self.kind {
            PrimitiveKind::Glyphset(glyphset) => Some(glyphset),
            _ => None,
        }
    }

    pub fn as_glyphset_mut(&mut self) -> Option<&mut Glyphset> {
        match &mut self.kind {
            PrimitiveKind::Glyphset(glyphset) => Some(glyphset),
            _ => None,
        }
    }
}
